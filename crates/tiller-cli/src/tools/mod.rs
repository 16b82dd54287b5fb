//! Demo tools for the CLI runner

mod calculate;
mod get_time;
mod get_weather;
mod search_web;

pub use calculate::CalculateTool;
pub use get_time::GetTimeTool;
pub use get_weather::GetWeatherTool;
pub use search_web::SearchWebTool;

use loop_core::ToolRegistry;

/// Create a registry with the demo tools.
pub fn create_demo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(CalculateTool);
    registry.register(SearchWebTool);
    registry.register(GetWeatherTool);
    registry.register(GetTimeTool);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use loop_core::{
        Actor, AgentState, DecisionRequest, Oracle, Orchestrator, OutcomeKind, PolicyContext,
        RawDecision, RunStatus, ToolStatus,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[test]
    fn test_demo_registry_contents() {
        let registry = create_demo_registry();
        assert_eq!(
            registry.list_names(),
            vec!["calculate", "get_current_time", "get_weather", "search_web"]
        );
    }

    struct ScriptedOracle {
        script: Mutex<VecDeque<RawDecision>>,
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn decide(&self, _request: &DecisionRequest) -> Result<RawDecision> {
            Ok(self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("oracle script exhausted"))
        }
    }

    #[tokio::test]
    async fn test_demo_tools_drive_loop_end_to_end() {
        let oracle = ScriptedOracle {
            script: Mutex::new(
                vec![
                    RawDecision {
                        rationale: "the goal needs arithmetic".to_string(),
                        decision_type: "tool".to_string(),
                        selected_tool: "calculate".to_string(),
                        arguments: r#"{"expression": "2+2*10"}"#.to_string(),
                        ..Default::default()
                    },
                    RawDecision {
                        rationale: "the calculation is done".to_string(),
                        decision_type: "final".to_string(),
                        final_response: "22".to_string(),
                        ..Default::default()
                    },
                ]
                .into(),
            ),
        };

        let mut orchestrator = Orchestrator::new(oracle, create_demo_registry());
        let mut state = AgentState::new("compute 2+2*10", vec![]);
        let status = orchestrator
            .run(&mut state, &PolicyContext::default())
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Finished);
        assert_eq!(state.final_response(), Some("22"));

        assert_eq!(state.history().len(), 1);
        let entry = &state.history()[0];
        assert_eq!(entry.actor, Actor::Tool);
        assert_eq!(entry.action, "calculate");
        assert_eq!(entry.outcome, OutcomeKind::Success);
        assert!(entry.result.contains("22"));

        let outcome = orchestrator.audit_log().entries()[0].outcome.as_ref().unwrap();
        assert_eq!(outcome.status, OutcomeKind::Success);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_surfaced_not_raised() {
        let registry = create_demo_registry();
        let result = registry.execute("ghost", &loop_core::JsonMap::new()).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.message, "Tool 'ghost' not found");
    }
}
