//! No stdlib flows ship by default — flows are necessarily program-specific.
//! The namespace exists and is exercised empty-then-populated in tests.

use super::base::StdlibEntryKind;

pub fn catalog() -> Vec<StdlibEntryKind> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::base::{StdlibEntryKind as Kind, StdlibFlow, StdlibRegistry};
    use crate::compiler::tokens::Position;
    use crate::ir::nodes::IRFlow;

    #[test]
    fn default_catalog_is_empty() {
        assert!(catalog().is_empty());
    }

    #[test]
    fn flows_namespace_accepts_registration_despite_empty_default() {
        let mut registry = StdlibRegistry::new();
        assert!(registry.list_names("flows").is_empty());
        registry.register(Kind::Flow(StdlibFlow {
            ir: IRFlow {
                node_type: "flow",
                name: "Summarize".to_string(),
                params: Vec::new(),
                return_type: None,
                steps: Vec::new(),
                pos: Position::default(),
            },
            description: "example only, not a shipped default".to_string(),
        }));
        assert_eq!(registry.list_names("flows"), vec!["Summarize"]);
    }
}
