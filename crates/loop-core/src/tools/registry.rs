//! Tool registry with error-normalized execution

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Tool, ToolResult};
use crate::JsonMap;

/// Registry of available tools.
///
/// `execute` is total: unknown names and tool failures come back as
/// `ToolResult::error`, never as a propagated failure.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool; a tool with the same name is overwritten.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names
    pub fn list_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the tool catalog for the oracle: one entry per tool with its
    /// description and declared argument shape.
    pub fn tools_description(&self) -> String {
        if self.tools.is_empty() {
            return "No tools available.".to_string();
        }

        let mut lines = vec!["Available tools:".to_string()];
        for tool in self.tools.values() {
            lines.push(format!("- {}: {}", tool.name(), tool.description()));
            for param in tool.parameters_schema().describe() {
                lines.push(format!("    {}", param));
            }
        }
        lines.join("\n")
    }

    /// Execute a tool by name with the given arguments.
    pub async fn execute(&self, name: &str, args: &JsonMap) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "Tool not found");
            return ToolResult::error(format!("Tool '{}' not found", name));
        };

        debug!(tool = %name, "Executing tool");
        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolResult::error(format!("Tool '{}' failed: {}", name, e))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParameterProperty, ParameterSchema, ToolStatus};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the text argument"
        }

        fn parameters_schema(&self) -> ParameterSchema {
            ParameterSchema::new()
                .with_required("text", ParameterProperty::string("Text to echo"))
        }

        async fn execute(&self, args: &JsonMap) -> Result<ToolResult> {
            let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("empty");
            Ok(ToolResult::success(text))
        }
    }

    struct FaultyTool;

    #[async_trait]
    impl Tool for FaultyTool {
        fn name(&self) -> &str {
            "faulty"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, _args: &JsonMap) -> Result<ToolResult> {
            bail!("deliberate failure")
        }
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let args = json!({"text": "hello"}).as_object().unwrap().clone();
        let result = registry.execute("echo", &args).await;
        assert_eq!(result.status, ToolStatus::Success);
        assert_eq!(result.message, "hello");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_never_raises() {
        let registry = ToolRegistry::new();
        let result = registry.execute("ghost", &JsonMap::new()).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.message, "Tool 'ghost' not found");
    }

    #[tokio::test]
    async fn test_tool_failure_is_normalized() {
        let mut registry = ToolRegistry::new();
        registry.register(FaultyTool);

        let result = registry.execute("faulty", &JsonMap::new()).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.message.contains("Tool 'faulty' failed"));
        assert!(result.message.contains("deliberate failure"));
    }

    #[test]
    fn test_register_overwrites_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(EchoTool);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_tools_description_renders_catalog() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let catalog = registry.tools_description();
        assert!(catalog.starts_with("Available tools:"));
        assert!(catalog.contains("- echo: Echoes the text argument"));
        assert!(catalog.contains("text (string, required): Text to echo"));
    }

    #[test]
    fn test_empty_registry_description() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tools_description(), "No tools available.");
    }
}
