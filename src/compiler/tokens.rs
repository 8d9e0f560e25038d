//! Token kinds and the keyword table shared by the lexer and parser.

use std::fmt;

/// Source position carried from tokens through the AST into IR.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub const fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

/// Keyword table. `true`/`false` are handled separately as `TokenKind::Bool`.
pub const KEYWORDS: &[&str] = &[
    "persona", "context", "intent", "flow", "reason", "anchor", "validate",
    "refine", "memory", "tool", "probe", "weave", "step", "type", "import",
    "run", "if", "else", "use", "remember", "recall", "as", "within",
    "constrained_by", "on_failure", "output_to", "effort", "for", "into",
    "against", "about", "from", "where", "given", "ask", "output",
];

pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|&&kw| kw == ident)
        .map(|&kw| TokenKind::Keyword(kw))
}

/// Every distinguishable lexical category a token can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(&'static str),
    Identifier(String),

    StringLit(String),
    IntegerLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    /// Lexeme includes the unit suffix, e.g. `"10s"`.
    DurationLit(String),

    // Symbols
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Dot,
    Question,
    Arrow,   // ->
    DotDot,  // ..

    // Comparison operators
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "keyword '{k}'"),
            TokenKind::Identifier(s) => write!(f, "identifier '{s}'"),
            TokenKind::StringLit(s) => write!(f, "string \"{s}\""),
            TokenKind::IntegerLit(n) => write!(f, "integer {n}"),
            TokenKind::FloatLit(n) => write!(f, "float {n}"),
            TokenKind::BoolLit(b) => write!(f, "bool {b}"),
            TokenKind::DurationLit(s) => write!(f, "duration {s}"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Arrow => write!(f, "'->'"),
            TokenKind::DotDot => write!(f, "'..'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line: pos.line,
            column: pos.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_has_expected_count() {
        assert_eq!(KEYWORDS.len(), 35);
    }

    #[test]
    fn lookup_keyword_recognizes_members() {
        assert_eq!(lookup_keyword("persona"), Some(TokenKind::Keyword("persona")));
        assert_eq!(lookup_keyword("run"), Some(TokenKind::Keyword("run")));
        assert_eq!(lookup_keyword("notakeyword"), None);
    }

    #[test]
    fn lookup_keyword_does_not_match_true_false() {
        assert_eq!(lookup_keyword("true"), None);
        assert_eq!(lookup_keyword("false"), None);
    }
}
