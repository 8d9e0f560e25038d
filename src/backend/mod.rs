//! Backends turn a resolved `IRProgram` into provider-native compiled units.

pub mod bracket;
pub mod contract;
pub mod markdown;

pub use bracket::BracketBackend;
pub use contract::{Backend, CompiledExecutionUnit, CompiledProgram, CompiledStep, StepMetadata};
pub use markdown::MarkdownBackend;

/// Looks up a backend by its external CLI name (`bracket` / `markdown`).
pub fn by_name(name: &str) -> Option<Box<dyn Backend>> {
    match name {
        "bracket" => Some(Box::new(BracketBackend)),
        "markdown" => Some(Box::new(MarkdownBackend)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_name_resolves_to_none() {
        assert!(by_name("nonexistent").is_none());
    }

    #[test]
    fn known_backend_names_resolve() {
        assert!(by_name("bracket").is_some());
        assert!(by_name("markdown").is_some());
    }
}
