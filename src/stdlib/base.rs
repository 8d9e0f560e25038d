//! Catalog wrapper types plus the `StdlibRegistry` they populate.
//!
//! Each wrapper pairs a resolved IR node with catalog metadata; the
//! `StdlibEntry` derive generates the `name()` forwarding accessor and the
//! `NAMESPACE` constant every wrapper needs.

use std::collections::HashMap;

use axon_derive::StdlibEntry;

use crate::ir::nodes::{IRAnchor, IRFlow, IRPersona, IRTool};

#[derive(Debug, Clone, StdlibEntry)]
#[stdlib(namespace = "personas")]
pub struct StdlibPersona {
    pub ir: IRPersona,
    pub description: String,
}

#[derive(Debug, Clone, StdlibEntry)]
#[stdlib(namespace = "anchors")]
pub struct StdlibAnchor {
    pub ir: IRAnchor,
    pub description: String,
}

#[derive(Debug, Clone, StdlibEntry)]
#[stdlib(namespace = "flows")]
pub struct StdlibFlow {
    pub ir: IRFlow,
    pub description: String,
}

#[derive(Debug, Clone, StdlibEntry)]
#[stdlib(namespace = "tools")]
pub struct StdlibTool {
    pub ir: IRTool,
    pub description: String,
}

/// One catalog entry kind per registry namespace, named so a single
/// per-namespace map can hold any of them without four parallel registry
/// types.
#[derive(Debug, Clone)]
pub enum StdlibEntryKind {
    Persona(StdlibPersona),
    Anchor(StdlibAnchor),
    Flow(StdlibFlow),
    Tool(StdlibTool),
}

impl StdlibEntryKind {
    pub fn name(&self) -> &str {
        match self {
            StdlibEntryKind::Persona(p) => p.name(),
            StdlibEntryKind::Anchor(a) => a.name(),
            StdlibEntryKind::Flow(f) => f.name(),
            StdlibEntryKind::Tool(t) => t.name(),
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            StdlibEntryKind::Persona(_) => StdlibPersona::NAMESPACE,
            StdlibEntryKind::Anchor(_) => StdlibAnchor::NAMESPACE,
            StdlibEntryKind::Flow(_) => StdlibFlow::NAMESPACE,
            StdlibEntryKind::Tool(_) => StdlibTool::NAMESPACE,
        }
    }
}

/// Process-wide catalogs redesigned as an explicit value: constructed once,
/// passed into the compiler and runtime, rather than a lazily-loaded
/// module-level global.
#[derive(Debug, Clone, Default)]
pub struct StdlibRegistry {
    stores: HashMap<&'static str, HashMap<String, StdlibEntryKind>>,
}

impl StdlibRegistry {
    pub fn new() -> Self {
        let mut stores = HashMap::new();
        for namespace in ["personas", "anchors", "flows", "tools"] {
            stores.insert(namespace, HashMap::new());
        }
        Self { stores }
    }

    pub fn register(&mut self, entry: StdlibEntryKind) {
        let name = entry.name().to_string();
        self.stores
            .entry(entry.namespace())
            .or_default()
            .insert(name, entry);
    }

    pub fn resolve(&self, namespace: &str, name: &str) -> Option<&StdlibEntryKind> {
        self.stores.get(namespace)?.get(name)
    }

    pub fn resolve_entry(&self, qualified_name: &str) -> Option<&StdlibEntryKind> {
        let (namespace, name) = qualified_name.split_once('.')?;
        self.resolve(namespace, name)
    }

    pub fn list_names(&self, namespace: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .stores
            .get(namespace)
            .map(|m| m.keys().map(|s| s.as_str()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn list_all(&self) -> Vec<&StdlibEntryKind> {
        self.stores.values().flat_map(|m| m.values()).collect()
    }

    pub fn has(&self, namespace: &str, name: &str) -> bool {
        self.resolve(namespace, name).is_some()
    }

    pub fn namespaces(&self) -> Vec<&'static str> {
        let mut ns: Vec<&'static str> = self.stores.keys().copied().collect();
        ns.sort_unstable();
        ns
    }

    pub fn total_count(&self) -> usize {
        self.stores.values().map(|m| m.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::IRAnchor;
    use crate::compiler::tokens::Position;

    fn sample_anchor(name: &str) -> StdlibAnchor {
        StdlibAnchor {
            ir: IRAnchor {
                node_type: "anchor",
                name: name.to_string(),
                confidence_floor: Some(0.7),
                on_violation: Some("raise".to_string()),
                target: None,
                pos: Position::default(),
            },
            description: "sample".to_string(),
        }
    }

    #[test]
    fn fresh_registry_has_four_empty_namespaces() {
        let registry = StdlibRegistry::new();
        assert_eq!(registry.namespaces().len(), 4);
        assert_eq!(registry.total_count(), 0);
        assert!(registry.list_names("flows").is_empty());
    }

    #[test]
    fn register_then_resolve_round_trips() {
        let mut registry = StdlibRegistry::new();
        registry.register(StdlibEntryKind::Anchor(sample_anchor("NoSpeculation")));
        assert!(registry.has("anchors", "NoSpeculation"));
        assert_eq!(registry.resolve("anchors", "NoSpeculation").unwrap().name(), "NoSpeculation");
    }

    #[test]
    fn resolve_entry_splits_on_dot() {
        let mut registry = StdlibRegistry::new();
        registry.register(StdlibEntryKind::Anchor(sample_anchor("CiteSources")));
        assert!(registry.resolve_entry("anchors.CiteSources").is_some());
        assert!(registry.resolve_entry("not-qualified").is_none());
    }
}
