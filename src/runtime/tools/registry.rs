//! Maps tool names to constructors, caching instances keyed by
//! `(name, config-hash)` so repeated lookups reuse the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::runtime::errors::{AxonRuntimeError, ErrorContext};

use super::base_tool::BaseTool;

type ToolFactory = Arc<dyn Fn() -> Arc<dyn BaseTool> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ToolListing {
    pub name: String,
    pub is_stub: bool,
}

pub struct RuntimeToolRegistry {
    factories: HashMap<String, (ToolFactory, bool)>,
    cache: HashMap<String, Arc<dyn BaseTool>>,
}

impl RuntimeToolRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        is_stub: bool,
        factory: impl Fn() -> Arc<dyn BaseTool> + Send + Sync + 'static,
    ) -> Result<(), AxonRuntimeError> {
        if name.is_empty() {
            return Err(AxonRuntimeError::validation(
                "tool name must not be empty",
                ErrorContext::default(),
            ));
        }
        self.factories
            .insert(name.to_string(), (Arc::new(factory), is_stub));
        Ok(())
    }

    pub fn get(&mut self, name: &str, config_fingerprint: &str) -> Option<Arc<dyn BaseTool>> {
        let cache_key = cache_key(name, config_fingerprint);
        if let Some(instance) = self.cache.get(&cache_key) {
            return Some(instance.clone());
        }
        let (factory, _) = self.factories.get(name)?;
        let instance = factory();
        self.cache.insert(cache_key, instance.clone());
        Some(instance)
    }

    /// Replaces a tool's factory and evicts every cached instance whose
    /// cache key starts with `name` (any config fingerprint).
    pub fn replace(
        &mut self,
        name: &str,
        is_stub: bool,
        factory: impl Fn() -> Arc<dyn BaseTool> + Send + Sync + 'static,
    ) {
        self.factories
            .insert(name.to_string(), (Arc::new(factory), is_stub));
        let prefix = format!("{name}::");
        self.cache.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn list_tools(&self) -> Vec<ToolListing> {
        self.factories
            .iter()
            .map(|(name, (_, is_stub))| ToolListing {
                name: name.clone(),
                is_stub: *is_stub,
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for RuntimeToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(name: &str, config_fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config_fingerprint.as_bytes());
    let digest = hasher.finalize();
    format!("{name}::{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::tools::stubs::WebSearch;

    #[test]
    fn registering_with_empty_name_is_rejected() {
        let mut registry = RuntimeToolRegistry::new();
        assert!(registry
            .register("", true, || Arc::new(WebSearch))
            .is_err());
    }

    #[test]
    fn repeated_get_with_same_config_returns_same_instance() {
        let mut registry = RuntimeToolRegistry::new();
        registry.register("WebSearch", true, || Arc::new(WebSearch)).unwrap();
        let a = registry.get("WebSearch", "{}").unwrap();
        let b = registry.get("WebSearch", "{}").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn replace_evicts_cached_instances() {
        let mut registry = RuntimeToolRegistry::new();
        registry.register("WebSearch", true, || Arc::new(WebSearch)).unwrap();
        let a = registry.get("WebSearch", "{}").unwrap();
        registry.replace("WebSearch", true, || Arc::new(WebSearch));
        let b = registry.get("WebSearch", "{}").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn list_tools_reads_is_stub_without_instantiating() {
        let mut registry = RuntimeToolRegistry::new();
        registry.register("Calculator", false, || Arc::new(WebSearch)).unwrap();
        let listing = registry.list_tools();
        assert_eq!(listing.len(), 1);
        assert!(!listing[0].is_stub);
    }
}
