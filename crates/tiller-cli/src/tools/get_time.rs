//! Current time tool

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use loop_core::{JsonMap, ParameterProperty, ParameterSchema, Tool, ToolResult};

/// Tool reporting the current time.
pub struct GetTimeTool;

#[async_trait]
impl Tool for GetTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new().with_property(
            "timezone",
            ParameterProperty::string("Timezone label to report (default: UTC)"),
        )
    }

    async fn execute(&self, args: &JsonMap) -> Result<ToolResult> {
        let timezone = args
            .get("timezone")
            .and_then(|v| v.as_str())
            .unwrap_or("UTC");

        let time = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut data = JsonMap::new();
        data.insert("time".to_string(), json!(time));
        data.insert("timezone".to_string(), json!(timezone));

        Ok(ToolResult::success_with_data(
            format!("Current time ({}): {}", timezone, time),
            data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loop_core::ToolStatus;

    #[tokio::test]
    async fn test_defaults_to_utc_label() {
        let result = GetTimeTool.execute(&JsonMap::new()).await.unwrap();
        assert_eq!(result.status, ToolStatus::Success);
        assert!(result.message.starts_with("Current time (UTC):"));
    }
}
