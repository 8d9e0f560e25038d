//! Two illustrative built-in anchors.

use crate::compiler::tokens::Position;
use crate::ir::nodes::IRAnchor;

use super::base::{StdlibAnchor, StdlibEntryKind};

pub fn catalog() -> Vec<StdlibEntryKind> {
    vec![
        StdlibEntryKind::Anchor(StdlibAnchor {
            ir: IRAnchor {
                node_type: "anchor",
                name: "NoSpeculation".to_string(),
                confidence_floor: Some(0.6),
                on_violation: Some("raise".to_string()),
                target: None,
                pos: Position::default(),
            },
            description: "Rejects output typed as Speculation or Opinion where a factual claim was asked for."
                .to_string(),
        }),
        StdlibEntryKind::Anchor(StdlibAnchor {
            ir: IRAnchor {
                node_type: "anchor",
                name: "CiteSources".to_string(),
                confidence_floor: None,
                on_violation: Some("raise".to_string()),
                target: Some("sources".to_string()),
                pos: Position::default(),
            },
            description: "Requires every factual claim to carry a traceable source reference."
                .to_string(),
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_two_anchors() {
        assert_eq!(catalog().len(), 2);
    }
}
