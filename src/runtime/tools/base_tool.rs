//! The `BaseTool` contract every tool implementation satisfies.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::runtime::errors::AxonRuntimeError;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: HashMap::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn stamp(mut self, tool_name: &str, is_stub: bool) -> Self {
        self.metadata
            .insert("tool_name".to_string(), Value::String(tool_name.to_string()));
        self.metadata
            .insert("is_stub".to_string(), Value::Bool(is_stub));
        self
    }
}

#[async_trait]
pub trait BaseTool: Send + Sync {
    fn tool_name_const() -> &'static str
    where
        Self: Sized;
    fn is_stub_const() -> bool
    where
        Self: Sized;
    fn default_timeout_const() -> Duration
    where
        Self: Sized;

    fn name(&self) -> &'static str;
    fn is_stub(&self) -> bool;
    fn default_timeout(&self) -> Duration;

    fn validate_config(&self) -> Result<(), AxonRuntimeError> {
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<ToolResult, AxonRuntimeError>;
}
