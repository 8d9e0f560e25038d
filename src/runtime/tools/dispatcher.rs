//! Bridges an `IRUseTool` step to a registry lookup plus a timeout-wrapped
//! `execute` call, converting any failure or timeout into a failed
//! `ToolResult` rather than letting an exception escape.

use tokio::time::timeout;
use tracing::error;

use super::base_tool::ToolResult;
use super::registry::RuntimeToolRegistry;

pub struct ToolDispatcher;

impl ToolDispatcher {
    pub async fn dispatch(
        registry: &mut RuntimeToolRegistry,
        tool_name: &str,
        config_fingerprint: &str,
        query: &str,
    ) -> ToolResult {
        let Some(tool) = registry.get(tool_name, config_fingerprint) else {
            return ToolResult::failed(format!("tool '{tool_name}' is not registered"))
                .stamp(tool_name, false);
        };

        let is_stub = tool.is_stub();
        match timeout(tool.default_timeout(), tool.execute(query)).await {
            Ok(Ok(result)) => result.stamp(tool_name, is_stub),
            Ok(Err(err)) => {
                error!(tool_name, error = %err, "tool execution failed");
                ToolResult::failed(err.to_string()).stamp(tool_name, is_stub)
            }
            Err(_) => ToolResult::failed(format!("tool '{tool_name}' timed out"))
                .stamp(tool_name, is_stub),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::tools::stubs::WebSearch;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct SlowTool;

    #[async_trait]
    impl super::super::base_tool::BaseTool for SlowTool {
        fn tool_name_const() -> &'static str { "Slow" }
        fn is_stub_const() -> bool { true }
        fn default_timeout_const() -> Duration { Duration::from_millis(10) }

        fn name(&self) -> &'static str {
            Self::tool_name_const()
        }
        fn is_stub(&self) -> bool {
            Self::is_stub_const()
        }
        fn default_timeout(&self) -> Duration {
            Self::default_timeout_const()
        }

        async fn execute(
            &self,
            _query: &str,
        ) -> Result<ToolResult, crate::runtime::errors::AxonRuntimeError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::ok(serde_json::json!(null)))
        }
    }

    #[tokio::test]
    async fn missing_tool_returns_failed_result() {
        let mut registry = RuntimeToolRegistry::new();
        let result = ToolDispatcher::dispatch(&mut registry, "Ghost", "{}", "q").await;
        assert!(!result.success);
        assert_eq!(result.metadata["tool_name"], "Ghost");
    }

    #[tokio::test]
    async fn successful_dispatch_stamps_metadata() {
        let mut registry = RuntimeToolRegistry::new();
        registry
            .register("WebSearch", true, || Arc::new(WebSearch))
            .unwrap();
        let result = ToolDispatcher::dispatch(&mut registry, "WebSearch", "{}", "q").await;
        assert!(result.success);
        assert_eq!(result.metadata["tool_name"], "WebSearch");
        assert_eq!(result.metadata["is_stub"], true);
    }

    #[tokio::test]
    async fn timeout_produces_failed_result_with_timed_out_message() {
        let mut registry = RuntimeToolRegistry::new();
        registry.register("Slow", true, || Arc::new(SlowTool)).unwrap();
        let result = ToolDispatcher::dispatch(&mut registry, "Slow", "{}", "q").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }
}
