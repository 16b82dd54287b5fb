//! Simulated web search tool

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use loop_core::{JsonMap, ParameterProperty, ParameterSchema, Tool, ToolResult};

/// Tool returning canned search results, for demos without network access.
pub struct SearchWebTool;

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns result titles and snippets."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required("query", ParameterProperty::string("The search query"))
    }

    async fn execute(&self, args: &JsonMap) -> Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: query"))?;

        let results = vec![
            format!("Result 1: Information about '{}' from Wikipedia", query),
            format!("Result 2: '{}' - Latest news and updates", query),
            format!("Result 3: Understanding '{}' - A comprehensive guide", query),
        ];

        let mut data = JsonMap::new();
        data.insert("query".to_string(), json!(query));
        data.insert("results".to_string(), json!(results));

        Ok(ToolResult::success_with_data(
            format!("Found {} results for '{}'", results.len(), query),
            data,
        ))
    }
}
