//! Built-in persona/anchor/flow/tool catalog.
//!
//! `StdlibRegistry::with_defaults()` builds the illustrative catalog
//! described in the runtime layer's documentation: two personas, two
//! anchors, the four stub tools, and an empty flows namespace. Programs
//! are free to shadow any of these with their own declarations of the
//! same name.

pub mod anchors;
pub mod base;
pub mod flows;
pub mod personas;
pub mod tools;

pub use base::{StdlibAnchor, StdlibEntryKind, StdlibFlow, StdlibPersona, StdlibRegistry, StdlibTool};

impl StdlibRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = StdlibRegistry::new();
        for entry in personas::catalog() {
            registry.register(entry);
        }
        for entry in anchors::catalog() {
            registry.register(entry);
        }
        for entry in flows::catalog() {
            registry.register(entry);
        }
        for entry in tools::catalog() {
            registry.register(entry);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_has_the_full_illustrative_catalog() {
        let registry = StdlibRegistry::with_defaults();
        assert_eq!(registry.list_names("personas"), vec!["Analyst", "Skeptic"]);
        assert_eq!(registry.list_names("anchors"), vec!["CiteSources", "NoSpeculation"]);
        assert!(registry.list_names("flows").is_empty());
        assert_eq!(
            registry.list_names("tools"),
            vec!["Calculator", "CodeExecutor", "FileReader", "WebSearch"]
        );
        assert_eq!(registry.total_count(), 8);
    }
}
