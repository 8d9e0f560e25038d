//! The tool subsystem: `BaseTool` contract, the caching registry, the
//! timeout-enforcing dispatcher, and the always-available stub tools.

pub mod base_tool;
pub mod dispatcher;
#[cfg(feature = "real-tools")]
pub mod real;
pub mod registry;
pub mod stubs;

use std::sync::Arc;

pub use base_tool::{BaseTool, ToolResult};
pub use dispatcher::ToolDispatcher;
pub use registry::{RuntimeToolRegistry, ToolListing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Stub,
    Real,
    Hybrid,
}

/// Registers the four stub tools, then overlays real backends per `mode`.
/// Only `WebSearch` gets a genuine real backend in this crate's scope;
/// `FileReader`/`CodeExecutor` stay interface-level.
pub fn create_default_registry(mode: ToolMode, web_search_api_key: Option<&str>) -> RuntimeToolRegistry {
    let mut registry = RuntimeToolRegistry::new();
    registry
        .register(stubs::WebSearch::tool_name_const(), true, || Arc::new(stubs::WebSearch))
        .expect("WebSearch is a non-empty literal");
    registry
        .register(stubs::Calculator::tool_name_const(), false, || Arc::new(stubs::Calculator))
        .expect("Calculator is a non-empty literal");
    registry
        .register(stubs::FileReader::tool_name_const(), true, || Arc::new(stubs::FileReader))
        .expect("FileReader is a non-empty literal");
    registry
        .register(stubs::CodeExecutor::tool_name_const(), true, || Arc::new(stubs::CodeExecutor))
        .expect("CodeExecutor is a non-empty literal");

    #[cfg(feature = "real-tools")]
    {
        let should_use_real = match mode {
            ToolMode::Stub => false,
            ToolMode::Real => true,
            ToolMode::Hybrid => web_search_api_key.is_some(),
        };
        if should_use_real {
            if let Some(key) = web_search_api_key {
                let key = key.to_string();
                registry.replace(stubs::WebSearch::tool_name_const(), false, move || {
                    Arc::new(crate::runtime::tools::real::HttpWebSearch::new(key.clone()))
                });
            }
        }
    }
    #[cfg(not(feature = "real-tools"))]
    {
        let _ = (mode, web_search_api_key);
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_all_four_stub_tools() {
        let registry = create_default_registry(ToolMode::Stub, None);
        assert!(registry.contains("WebSearch"));
        assert!(registry.contains("Calculator"));
        assert!(registry.contains("FileReader"));
        assert!(registry.contains("CodeExecutor"));
    }
}
