//! Two illustrative built-in personas.

use crate::compiler::tokens::Position;
use crate::ir::nodes::IRPersona;

use super::base::{StdlibEntryKind, StdlibPersona};

pub fn catalog() -> Vec<StdlibEntryKind> {
    vec![
        StdlibEntryKind::Persona(StdlibPersona {
            ir: IRPersona {
                node_type: "persona",
                name: "Analyst".to_string(),
                tone: Some("precise".to_string()),
                confidence_threshold: Some(0.7),
                pos: Position::default(),
            },
            description: "Grounds claims in evidence, flags uncertainty rather than guessing."
                .to_string(),
        }),
        StdlibEntryKind::Persona(StdlibPersona {
            ir: IRPersona {
                node_type: "persona",
                name: "Skeptic".to_string(),
                tone: Some("analytical".to_string()),
                confidence_threshold: Some(0.85),
                pos: Position::default(),
            },
            description: "Actively looks for the weakest link in a claim before accepting it."
                .to_string(),
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_two_personas() {
        assert_eq!(catalog().len(), 2);
    }
}
