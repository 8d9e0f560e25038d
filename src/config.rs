//! Plain configuration data threaded into the runtime. No env var or file
//! I/O lives here — callers build it however they like.

use serde::{Deserialize, Serialize};

use crate::runtime::tools::ToolMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffortLevel {
    Low,
    Medium,
    High,
    Max,
}

impl EffortLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

impl Default for EffortLevel {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone)]
pub struct AxonConfig {
    pub tool_mode: ToolMode,
    pub web_search_api_key: Option<String>,
    pub default_effort: EffortLevel,
    pub max_trace_events: Option<usize>,
}

impl Default for AxonConfig {
    fn default() -> Self {
        Self {
            tool_mode: ToolMode::Stub,
            web_search_api_key: None,
            default_effort: EffortLevel::Medium,
            max_trace_events: None,
        }
    }
}

impl AxonConfig {
    pub fn with_tool_mode(mut self, mode: ToolMode) -> Self {
        self.tool_mode = mode;
        self
    }

    pub fn with_web_search_api_key(mut self, key: impl Into<String>) -> Self {
        self.web_search_api_key = Some(key.into());
        self
    }

    pub fn with_default_effort(mut self, effort: EffortLevel) -> Self {
        self.default_effort = effort;
        self
    }

    pub fn with_max_trace_events(mut self, max: usize) -> Self {
        self.max_trace_events = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = AxonConfig::default();
        assert_eq!(config.tool_mode, ToolMode::Stub);
        assert!(config.web_search_api_key.is_none());
        assert_eq!(config.default_effort, EffortLevel::Medium);
        assert!(config.max_trace_events.is_none());
    }

    #[test]
    fn builder_methods_chain() {
        let config = AxonConfig::default()
            .with_tool_mode(ToolMode::Real)
            .with_web_search_api_key("key")
            .with_default_effort(EffortLevel::High)
            .with_max_trace_events(1000);
        assert_eq!(config.tool_mode, ToolMode::Real);
        assert_eq!(config.web_search_api_key.as_deref(), Some("key"));
    }

    #[test]
    fn effort_level_parses_known_strings() {
        assert_eq!(EffortLevel::parse("high"), Some(EffortLevel::High));
        assert_eq!(EffortLevel::parse("bogus"), None);
    }
}
