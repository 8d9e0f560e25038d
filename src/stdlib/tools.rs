//! Catalog entries for the four built-in stub tools.
//!
//! These wrap the declarative `IRTool` shape used at compile time; the
//! actual tool behavior lives in `runtime::tools`. Registering one of
//! these lets a program reference e.g. `tool.WebSearch` without declaring
//! its own `tool` block.

use crate::compiler::tokens::Position;
use crate::ir::nodes::IRTool;

use super::base::{StdlibEntryKind, StdlibTool};

pub fn catalog() -> Vec<StdlibEntryKind> {
    vec![
        StdlibEntryKind::Tool(StdlibTool {
            ir: IRTool {
                node_type: "tool",
                name: "WebSearch".to_string(),
                max_results: Some(5),
                pos: Position::default(),
            },
            description: "Stub web search, returns a fixed placeholder result set.".to_string(),
        }),
        StdlibEntryKind::Tool(StdlibTool {
            ir: IRTool {
                node_type: "tool",
                name: "Calculator".to_string(),
                max_results: None,
                pos: Position::default(),
            },
            description: "Evaluates arithmetic expressions over +, -, *, / and parentheses."
                .to_string(),
        }),
        StdlibEntryKind::Tool(StdlibTool {
            ir: IRTool {
                node_type: "tool",
                name: "FileReader".to_string(),
                max_results: None,
                pos: Position::default(),
            },
            description: "Stub file reader, echoes back a placeholder file body.".to_string(),
        }),
        StdlibEntryKind::Tool(StdlibTool {
            ir: IRTool {
                node_type: "tool",
                name: "CodeExecutor".to_string(),
                max_results: None,
                pos: Position::default(),
            },
            description: "Stub code executor, reports success without running anything."
                .to_string(),
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_four_tools() {
        assert_eq!(catalog().len(), 4);
    }

    #[test]
    fn catalog_names_match_runtime_tool_registry() {
        let entries = catalog();
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["WebSearch", "Calculator", "FileReader", "CodeExecutor"]);
    }
}
