//! Compile-time error taxonomy: lexer, parser, type checker, IR generator.

use thiserror::Error;

use super::tokens::Position;

/// Severity of a single structured type-checker finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One structured finding accumulated by the type checker.
///
/// The type checker never raises mid-pass; it returns a `Vec<TypeErrorEntry>`
/// so a caller sees every problem in one compilation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TypeErrorEntry {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub code: String,
}

impl TypeErrorEntry {
    pub fn error(message: impl Into<String>, pos: Position, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: pos.line,
            column: pos.column,
            severity: Severity::Error,
            code: code.into(),
        }
    }

    pub fn warning(message: impl Into<String>, pos: Position, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: pos.line,
            column: pos.column,
            severity: Severity::Warning,
            code: code.into(),
        }
    }
}

/// A field the skip-value routine tolerated without recognizing.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParserWarning {
    pub field: String,
    pub line: usize,
    pub column: usize,
}

/// Errors produced by the lexer, parser, and IR generator. The type checker
/// does not raise — see `TypeErrorEntry` above.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("LexerError [line {line}, col {column}]: {message}")]
    Lexer {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("ParseError [line {line}, col {column}]: {message}{}", format_expected_found(.expected, .found))]
    Parse {
        message: String,
        line: usize,
        column: usize,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("IRError [line {line}, col {column}]: {message}")]
    Ir {
        message: String,
        line: usize,
        column: usize,
        dangling_name: String,
        available: Vec<String>,
    },
}

fn format_expected_found(expected: &Option<String>, found: &Option<String>) -> String {
    match (expected, found) {
        (Some(e), Some(f)) => format!(" (expected {e}, found {f})"),
        _ => String::new(),
    }
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, pos: Position) -> Self {
        Self::Lexer {
            message: message.into(),
            line: pos.line,
            column: pos.column,
        }
    }

    pub fn parse(message: impl Into<String>, pos: Position) -> Self {
        Self::Parse {
            message: message.into(),
            line: pos.line,
            column: pos.column,
            expected: None,
            found: None,
        }
    }

    pub fn parse_unexpected(
        pos: Position,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Parse {
            message: "unexpected token".to_string(),
            line: pos.line,
            column: pos.column,
            expected: Some(expected.into()),
            found: Some(found.into()),
        }
    }

    /// Build an `IRError` with the reference implementation's exact message
    /// format: `"{message}. Available {kind}s: {available}"`.
    pub fn unresolved_reference(
        kind: &str,
        name: &str,
        available: &[String],
        pos: Position,
    ) -> Self {
        let mut sorted = available.to_vec();
        sorted.sort();
        let list = if sorted.is_empty() {
            "(none)".to_string()
        } else {
            sorted.join(", ")
        };
        Self::Ir {
            message: format!(
                "Run statement references undefined {kind} '{name}'. Available {kind}s: {list}"
            ),
            line: pos.line,
            column: pos.column,
            dangling_name: name.to_string(),
            available: sorted,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            CompileError::Lexer { line, column, .. }
            | CompileError::Parse { line, column, .. }
            | CompileError::Ir { line, column, .. } => Position::new(*line, *column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_sorts_and_joins_available_names() {
        let err = CompileError::unresolved_reference(
            "anchor",
            "GhostAnchor",
            &["Zeta".to_string(), "Alpha".to_string()],
            Position::new(3, 9),
        );
        let msg = err.to_string();
        assert!(msg.contains("GhostAnchor"));
        assert!(msg.contains("Alpha, Zeta"));
    }

    #[test]
    fn unresolved_reference_with_no_candidates_says_none() {
        let err = CompileError::unresolved_reference("flow", "Missing", &[], Position::start());
        assert!(err.to_string().contains("(none)"));
    }

    #[test]
    fn parse_unexpected_includes_expected_and_found() {
        let err = CompileError::parse_unexpected(Position::start(), "identifier", "'{'");
        let msg = err.to_string();
        assert!(msg.contains("expected identifier, found '{'"));
    }
}
