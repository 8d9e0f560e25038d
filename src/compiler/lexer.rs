//! Character scanner producing a token stream.
//!
//! Negative numbers: a leading `-` is only ever folded into a numeric
//! literal when the immediately following character is an ASCII digit.
//! In every other position `-` is an unknown-character error — this
//! grammar has no standalone subtraction operator.

use super::errors::CompileError;
use super::tokens::{lookup_keyword, Position, Token, TokenKind};

const DURATION_SUFFIXES: &[&str] = &["ms", "s", "m", "h", "d"];

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let start = self.position();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", start));
                break;
            };

            let token = if c == b'"' {
                self.scan_string(start)?
            } else if c.is_ascii_digit() {
                self.scan_number(start, false)?
            } else if c == b'-' {
                if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
                    self.advance();
                    self.scan_number(start, true)?
                } else {
                    return Err(CompileError::lexer(
                        format!("unknown character '{}'", c as char),
                        start,
                    ));
                }
            } else if c.is_ascii_alphabetic() || c == b'_' {
                self.scan_identifier(start)
            } else {
                self.scan_symbol(start)?
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.position();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.peek() {
                        if c == b'*' && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        return Err(CompileError::lexer("unterminated block comment", start));
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_string(&mut self, start: Position) -> Result<Token, CompileError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(CompileError::lexer("unterminated string", start)),
                Some(b'\n') => return Err(CompileError::lexer("unterminated string", start)),
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'"') => value.push('"'),
                        Some(b'\\') => value.push('\\'),
                        Some(other) => value.push(other as char),
                        None => return Err(CompileError::lexer("unterminated string", start)),
                    }
                }
                Some(_) => {
                    let byte_start = self.pos;
                    self.advance();
                    value.push_str(std::str::from_utf8(&self.source[byte_start..self.pos]).unwrap_or("?"));
                }
            }
        }
        Ok(Token::new(TokenKind::StringLit(value.clone()), value, start))
    }

    fn scan_number(&mut self, start: Position, negative: bool) -> Result<Token, CompileError> {
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1) != Some(b'.') {
            is_float = true;
            self.advance();
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(CompileError::lexer("expected digit after decimal point", self.position()));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let number_text = std::str::from_utf8(&self.source[digits_start..self.pos]).unwrap();
        let sign = if negative { "-" } else { "" };
        let full_text = format!("{sign}{number_text}");

        // Duration suffix: longest match first so "ms" wins over "m".
        let mut suffixes: Vec<&str> = DURATION_SUFFIXES.to_vec();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        for suffix in suffixes {
            let bytes = suffix.as_bytes();
            if self.source[self.pos..].starts_with(bytes) {
                let after = self.pos + bytes.len();
                let trailing_alpha = self.source.get(after).is_some_and(|c| c.is_ascii_alphabetic());
                if !trailing_alpha {
                    for _ in 0..bytes.len() {
                        self.advance();
                    }
                    let lexeme = format!("{full_text}{suffix}");
                    return Ok(Token::new(TokenKind::DurationLit(lexeme.clone()), lexeme, start));
                }
            }
        }

        if is_float {
            let value: f64 = full_text.parse().map_err(|_| {
                CompileError::lexer(format!("invalid float literal '{full_text}'"), start)
            })?;
            Ok(Token::new(TokenKind::FloatLit(value), full_text, start))
        } else {
            let value: i64 = full_text.parse().map_err(|_| {
                CompileError::lexer(format!("invalid integer literal '{full_text}'"), start)
            })?;
            Ok(Token::new(TokenKind::IntegerLit(value), full_text, start))
        }
    }

    fn scan_identifier(&mut self, start: Position) -> Token {
        let begin = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[begin..self.pos]).unwrap().to_string();

        if text == "true" {
            return Token::new(TokenKind::BoolLit(true), text, start);
        }
        if text == "false" {
            return Token::new(TokenKind::BoolLit(false), text, start);
        }
        if let Some(kind) = lookup_keyword(&text) {
            return Token::new(kind, text, start);
        }
        Token::new(TokenKind::Identifier(text.clone()), text, start)
    }

    fn scan_symbol(&mut self, start: Position) -> Result<Token, CompileError> {
        let c = self.advance().unwrap();
        let two_char = |this: &mut Self, expected: u8, kind: TokenKind, lexeme: &str| -> Option<Token> {
            if this.peek() == Some(expected) {
                this.advance();
                Some(Token::new(kind, lexeme, start))
            } else {
                None
            }
        };

        let token = match c {
            b'{' => Token::new(TokenKind::LBrace, "{", start),
            b'}' => Token::new(TokenKind::RBrace, "}", start),
            b'(' => Token::new(TokenKind::LParen, "(", start),
            b')' => Token::new(TokenKind::RParen, ")", start),
            b'[' => Token::new(TokenKind::LBracket, "[", start),
            b']' => Token::new(TokenKind::RBracket, "]", start),
            b':' => Token::new(TokenKind::Colon, ":", start),
            b',' => Token::new(TokenKind::Comma, ",", start),
            b'?' => Token::new(TokenKind::Question, "?", start),
            b'.' => {
                if let Some(tok) = two_char(self, b'.', TokenKind::DotDot, "..") {
                    tok
                } else {
                    Token::new(TokenKind::Dot, ".", start)
                }
            }
            b'-' => {
                if let Some(tok) = two_char(self, b'>', TokenKind::Arrow, "->") {
                    tok
                } else {
                    return Err(CompileError::lexer("unknown character '-'", start));
                }
            }
            b'<' => {
                if let Some(tok) = two_char(self, b'=', TokenKind::Le, "<=") {
                    tok
                } else {
                    Token::new(TokenKind::Lt, "<", start)
                }
            }
            b'>' => {
                if let Some(tok) = two_char(self, b'=', TokenKind::Ge, ">=") {
                    tok
                } else {
                    Token::new(TokenKind::Gt, ">", start)
                }
            }
            b'=' => {
                if let Some(tok) = two_char(self, b'=', TokenKind::EqEq, "==") {
                    tok
                } else {
                    return Err(CompileError::lexer("unknown character '='", start));
                }
            }
            b'!' => {
                if let Some(tok) = two_char(self, b'=', TokenKind::NotEq, "!=") {
                    tok
                } else {
                    return Err(CompileError::lexer("unknown character '!'", start));
                }
            }
            other => {
                return Err(CompileError::lexer(
                    format!("unknown character '{}'", other as char),
                    start,
                ))
            }
        };
        Ok(token)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_persona_declaration() {
        let tokens = tokenize("persona Expert { tone: precise }").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword("persona"),
                TokenKind::Identifier("Expert".into()),
                TokenKind::LBrace,
                TokenKind::Identifier("tone".into()),
                TokenKind::Colon,
                TokenKind::Identifier("precise".into()),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_negative_number_only_before_digit() {
        let tokens = tokenize("-1.5").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::FloatLit(-1.5));
    }

    #[test]
    fn standalone_minus_is_an_error() {
        assert!(tokenize("- 1").is_err());
    }

    #[test]
    fn missing_digit_after_decimal_point_is_an_error() {
        assert!(tokenize("5.").is_err());
        assert!(tokenize("5.x").is_err());
    }

    #[test]
    fn range_literal_keeps_dots_separate() {
        let tokens = tokenize("0.0..1.0").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::FloatLit(0.0),
                TokenKind::DotDot,
                TokenKind::FloatLit(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn duration_suffix_attaches_to_number() {
        let tokens = tokenize("10s 30ms 2h").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::DurationLit("10s".into()));
        assert_eq!(tokens[1].kind, TokenKind::DurationLit("30ms".into()));
        assert_eq!(tokens[2].kind, TokenKind::DurationLit("2h".into()));
    }

    #[test]
    fn trailing_identifier_after_number_is_not_duration() {
        let tokens = tokenize("10 seconds").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntegerLit(10));
        assert_eq!(tokens[1].kind, TokenKind::Identifier("seconds".into()));
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = tokenize(r#""a\nb\t\"c\\d""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLit("a\nb\t\"c\\d".into()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("\"abc").is_err());
    }

    #[test]
    fn line_comment_is_skipped() {
        let tokens = tokenize("persona // comment\nExpert").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Identifier("Expert".into()));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn booleans_are_distinct_from_identifiers() {
        let tokens = tokenize("true false maybe").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::BoolLit(true));
        assert_eq!(tokens[1].kind, TokenKind::BoolLit(false));
        assert_eq!(tokens[2].kind, TokenKind::Identifier("maybe".into()));
    }
}
