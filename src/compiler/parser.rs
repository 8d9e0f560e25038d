//! Recursive-descent parser: tokens → AST.
//!
//! One token of lookahead everywhere. Unknown field names inside brace
//! blocks are tolerated: `parse_block` collects every `name: value` pair
//! generically, and each declaration builder only pulls the fields it
//! recognizes, pushing a `ParserWarning` for the rest. This is forward
//! compatibility, not silent data loss — the type checker surfaces the
//! warnings.

use super::ast::*;
use super::errors::{CompileError, ParserWarning};
use super::tokens::{Position, Token, TokenKind};

/// A generically parsed block value, produced before a declaration-specific
/// builder interprets it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(String),
    Ident(String),
    List(Vec<FieldValue>),
    Block(Vec<(String, FieldValue, Position)>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) | FieldValue::Ident(s) | FieldValue::Duration(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
            _ => Vec::new(),
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    warnings: Vec<ParserWarning>,
}

type PResult<T> = Result<T, CompileError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            warnings: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> PResult<Program> {
        let mut declarations = Vec::new();
        while !self.at_eof() {
            declarations.push(self.parse_decl()?);
        }
        Ok(Program {
            declarations,
            warnings: self.warnings,
        })
    }

    // ── Token stream helpers ────────────────────────────────────────

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn pos_here(&self) -> Position {
        self.current().position()
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check_keyword(&self, kw: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn expect_keyword(&mut self, kw: &str) -> PResult<Token> {
        if self.check_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(CompileError::parse_unexpected(
                self.pos_here(),
                format!("keyword '{kw}'"),
                self.current().kind.to_string(),
            ))
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.current().kind == kind {
            Ok(self.advance())
        } else {
            Err(CompileError::parse_unexpected(
                self.pos_here(),
                kind.to_string(),
                self.current().kind.to_string(),
            ))
        }
    }

    /// Identifiers and field names may legally be keywords (e.g. `output`,
    /// `effort`) when used as brace-block field labels.
    fn expect_name(&mut self) -> PResult<String> {
        match &self.current().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            TokenKind::Keyword(k) => {
                let s = k.to_string();
                self.advance();
                Ok(s)
            }
            other => Err(CompileError::parse_unexpected(
                self.pos_here(),
                "identifier".to_string(),
                other.to_string(),
            )),
        }
    }

    fn expect_string(&mut self) -> PResult<String> {
        match &self.current().kind {
            TokenKind::StringLit(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            other => Err(CompileError::parse_unexpected(
                self.pos_here(),
                "string literal".to_string(),
                other.to_string(),
            )),
        }
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn parse_decl(&mut self) -> PResult<Decl> {
        match &self.current().kind {
            TokenKind::Keyword("import") => self.parse_import().map(Decl::Import),
            TokenKind::Keyword("persona") => self.parse_persona().map(Decl::Persona),
            TokenKind::Keyword("context") => self.parse_context().map(Decl::Context),
            TokenKind::Keyword("anchor") => self.parse_anchor().map(Decl::Anchor),
            TokenKind::Keyword("memory") => self.parse_memory().map(Decl::Memory),
            TokenKind::Keyword("tool") => self.parse_tool().map(Decl::Tool),
            TokenKind::Keyword("type") => self.parse_type_decl().map(Decl::Type),
            TokenKind::Keyword("flow") => self.parse_flow().map(Decl::Flow),
            TokenKind::Keyword("intent") => self.parse_intent().map(Decl::Intent),
            TokenKind::Keyword("run") => self.parse_run().map(Decl::Run),
            other => Err(CompileError::parse_unexpected(
                self.pos_here(),
                "top-level declaration".to_string(),
                other.to_string(),
            )),
        }
    }

    fn parse_import(&mut self) -> PResult<ImportDecl> {
        let pos = self.pos_here();
        self.expect_keyword("import")?;
        // import axon.<namespace>.<Name>
        let mut parts = vec![self.expect_name()?];
        while self.current().kind == TokenKind::Dot {
            self.advance();
            parts.push(self.expect_name()?);
        }
        let name = parts.pop().unwrap_or_default();
        let namespace = parts.last().cloned().unwrap_or_default();
        Ok(ImportDecl { namespace, name, pos })
    }

    fn parse_block(&mut self) -> PResult<Vec<(String, FieldValue, Position)>> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.current().kind != TokenKind::RBrace {
            let field_pos = self.pos_here();
            let name = self.expect_name()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_value()?;
            fields.push((name, value, field_pos));
            if self.current().kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }

    fn parse_value(&mut self) -> PResult<FieldValue> {
        match self.current().kind.clone() {
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(FieldValue::Str(s))
            }
            TokenKind::IntegerLit(n) => {
                self.advance();
                Ok(FieldValue::Int(n))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Ok(FieldValue::Float(n))
            }
            TokenKind::BoolLit(b) => {
                self.advance();
                Ok(FieldValue::Bool(b))
            }
            TokenKind::DurationLit(s) => {
                self.advance();
                Ok(FieldValue::Duration(s))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while self.current().kind != TokenKind::RBracket {
                    items.push(self.parse_value()?);
                    if self.current().kind == TokenKind::Comma {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(FieldValue::List(items))
            }
            TokenKind::LBrace => Ok(FieldValue::Block(self.parse_block()?)),
            TokenKind::Identifier(s) => {
                self.advance();
                Ok(FieldValue::Ident(s))
            }
            TokenKind::Keyword(k) => {
                self.advance();
                Ok(FieldValue::Ident(k.to_string()))
            }
            other => Err(CompileError::parse_unexpected(
                self.pos_here(),
                "value".to_string(),
                other.to_string(),
            )),
        }
    }

    fn warn_unknown(&mut self, name: &str, pos: Position) {
        self.warnings.push(ParserWarning {
            field: name.to_string(),
            line: pos.line,
            column: pos.column,
        });
    }

    fn parse_persona(&mut self) -> PResult<PersonaDecl> {
        let pos = self.pos_here();
        self.expect_keyword("persona")?;
        let name = self.expect_name()?;
        let mut decl = PersonaDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "tone" => decl.tone = value.as_str().map(String::from),
                "confidence_threshold" => decl.confidence_threshold = value.as_f64(),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_context(&mut self) -> PResult<ContextDecl> {
        let pos = self.pos_here();
        self.expect_keyword("context")?;
        let name = self.expect_name()?;
        let mut decl = ContextDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "memory_scope" => decl.memory_scope = value.as_str().map(String::from),
                "depth" => decl.depth = value.as_str().map(String::from),
                "temperature" => decl.temperature = value.as_f64(),
                "max_tokens" => decl.max_tokens = value.as_i64(),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_anchor(&mut self) -> PResult<AnchorDecl> {
        let pos = self.pos_here();
        self.expect_keyword("anchor")?;
        let name = self.expect_name()?;
        let mut decl = AnchorDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "confidence_floor" => decl.confidence_floor = value.as_f64(),
                "on_violation" => decl.on_violation = value.as_str().map(String::from),
                "target" => decl.target = value.as_str().map(String::from),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_memory(&mut self) -> PResult<MemoryDecl> {
        let pos = self.pos_here();
        self.expect_keyword("memory")?;
        let name = self.expect_name()?;
        let mut decl = MemoryDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "store" => decl.store = value.as_str().map(String::from),
                "retrieval" => decl.retrieval = value.as_str().map(String::from),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_tool(&mut self) -> PResult<ToolDecl> {
        let pos = self.pos_here();
        self.expect_keyword("tool")?;
        let name = self.expect_name()?;
        let mut decl = ToolDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "max_results" => decl.max_results = value.as_i64(),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_type_expr(&mut self) -> PResult<TypeExpr> {
        let name = self.expect_name()?;
        let mut expr = TypeExpr::simple(name);
        if self.current().kind == TokenKind::Lt {
            self.advance();
            expr.param = Some(self.expect_name()?);
            self.expect(TokenKind::Gt)?;
        }
        if self.current().kind == TokenKind::Question {
            self.advance();
            expr.optional = true;
        }
        Ok(expr)
    }

    fn parse_type_decl(&mut self) -> PResult<TypeDecl> {
        let pos = self.pos_here();
        self.expect_keyword("type")?;
        let name = self.expect_name()?;
        let mut decl = TypeDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "min" => decl.min = value.as_f64(),
                "max" => decl.max = value.as_f64(),
                "fields" => {
                    if let FieldValue::Block(entries) = value {
                        for (fname, fvalue, _) in entries {
                            if let Some(tn) = fvalue.as_str() {
                                decl.fields.push((fname, TypeExpr::simple(tn)));
                            }
                        }
                    }
                }
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_intent(&mut self) -> PResult<IntentDecl> {
        let pos = self.pos_here();
        self.expect_keyword("intent")?;
        let name = self.expect_name()?;
        let mut decl = IntentDecl { name, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "ask" => decl.ask = value.as_str().map(String::from).unwrap_or_default(),
                "output_type" | "output" => decl.output_type = value.as_str().map(String::from),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(decl)
    }

    fn parse_flow(&mut self) -> PResult<FlowDecl> {
        let pos = self.pos_here();
        self.expect_keyword("flow")?;
        let name = self.expect_name()?;
        let mut params = Vec::new();
        if self.current().kind == TokenKind::LParen {
            self.advance();
            while self.current().kind != TokenKind::RParen {
                let pname = self.expect_name()?;
                self.expect(TokenKind::Colon)?;
                let ptype = self.parse_type_expr()?;
                params.push((pname, ptype));
                if self.current().kind == TokenKind::Comma {
                    self.advance();
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        let mut return_type = None;
        if self.current().kind == TokenKind::Arrow {
            self.advance();
            return_type = Some(self.parse_type_expr()?);
        }
        self.expect(TokenKind::LBrace)?;
        let mut steps = Vec::new();
        while self.current().kind != TokenKind::RBrace {
            steps.push(self.parse_step()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(FlowDecl { name, params, return_type, steps, pos })
    }

    // ── Steps ────────────────────────────────────────────────────────

    fn parse_step(&mut self) -> PResult<Step> {
        match &self.current().kind {
            TokenKind::Keyword("probe") => self.parse_probe().map(Step::Probe),
            TokenKind::Keyword("reason") => self.parse_reason().map(Step::Reason),
            TokenKind::Keyword("weave") => self.parse_weave().map(Step::Weave),
            TokenKind::Keyword("validate") => self.parse_validate().map(Step::Validate),
            TokenKind::Keyword("refine") => self.parse_refine().map(Step::Refine),
            TokenKind::Keyword("use") => self.parse_use_tool().map(Step::UseTool),
            TokenKind::Keyword("remember") => self.parse_remember().map(Step::Remember),
            TokenKind::Keyword("recall") => self.parse_recall().map(Step::Recall),
            TokenKind::Keyword("if") => self.parse_conditional().map(Step::Conditional),
            TokenKind::Keyword("intent") => self.parse_intent_ref().map(Step::Intent),
            TokenKind::Keyword("step") => self.parse_step_node().map(Step::Step),
            other => Err(CompileError::parse_unexpected(
                self.pos_here(),
                "step".to_string(),
                other.to_string(),
            )),
        }
    }

    fn parse_step_body(&mut self) -> PResult<Vec<Step>> {
        self.expect(TokenKind::LBrace)?;
        let mut steps = Vec::new();
        while self.current().kind != TokenKind::RBrace {
            steps.push(self.parse_step()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(steps)
    }

    fn parse_step_node(&mut self) -> PResult<StepNode> {
        let pos = self.pos_here();
        self.expect_keyword("step")?;
        let name = self.expect_name()?;
        let mut output_type = None;
        if self.current().kind == TokenKind::Arrow {
            self.advance();
            output_type = Some(self.expect_name()?);
        }
        let body = self.parse_step_body()?;
        Ok(StepNode { name, body, output_type, pos })
    }

    fn parse_probe(&mut self) -> PResult<ProbeNode> {
        let pos = self.pos_here();
        self.expect_keyword("probe")?;
        let target = self.expect_name()?;
        self.expect_keyword("for")?;
        self.expect(TokenKind::LBracket)?;
        let mut fields = Vec::new();
        while self.current().kind != TokenKind::RBracket {
            fields.push(self.expect_name()?);
            if self.current().kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(ProbeNode { target, fields, pos })
    }

    fn parse_reason(&mut self) -> PResult<ReasonNode> {
        let pos = self.pos_here();
        self.expect_keyword("reason")?;
        self.expect_keyword("about")?;
        let topic = self.expect_string().or_else(|_| self.expect_name())?;
        let mut node = ReasonNode { topic, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "given" => {
                    node.given = match &value {
                        FieldValue::Str(s) if s.is_empty() => ReasonGiven::None,
                        FieldValue::Str(s) => ReasonGiven::Single(s.clone()),
                        FieldValue::List(_) => ReasonGiven::Many(value.as_str_list()),
                        _ => ReasonGiven::None,
                    };
                }
                "depth" => node.depth = value.as_i64(),
                "show_work" => node.show_work = value.as_bool(),
                "ask" => node.ask = value.as_str().map(String::from),
                "output" => node.output = value.as_str().map(TypeExpr::simple),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(node)
    }

    fn parse_weave(&mut self) -> PResult<WeaveNode> {
        let pos = self.pos_here();
        self.expect_keyword("weave")?;
        self.expect(TokenKind::LBracket)?;
        let mut sources = Vec::new();
        while self.current().kind != TokenKind::RBracket {
            sources.push(self.expect_name()?);
            if self.current().kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RBracket)?;
        self.expect_keyword("into")?;
        let target = self.expect_name()?;
        let mut node = WeaveNode { sources, target, pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "priority" => node.priority = value.as_str_list(),
                "format" => node.format = value.as_str().map(String::from),
                "style" => node.style = value.as_str().map(String::from),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(node)
    }

    /// The validate rule grammar is intentionally light: `if <cond> -> action`
    /// where `<cond>` is captured verbatim as the raw source text up to `->`.
    fn parse_condition_text(&mut self) -> PResult<String> {
        let mut parts = Vec::new();
        while self.current().kind != TokenKind::Arrow {
            if self.at_eof() {
                return Err(CompileError::parse_unexpected(
                    self.pos_here(),
                    "'->'".to_string(),
                    "end of input".to_string(),
                ));
            }
            parts.push(self.advance().lexeme);
        }
        self.expect(TokenKind::Arrow)?;
        Ok(parts.join(" "))
    }

    fn parse_validate_action(&mut self) -> PResult<ValidateAction> {
        if self.check_keyword("refine") {
            Ok(ValidateAction::Refine(self.parse_refine()?))
        } else if matches!(&self.current().kind, TokenKind::Identifier(s) if s == "raise") {
            self.advance();
            Ok(ValidateAction::Raise(self.expect_name()?))
        } else if matches!(&self.current().kind, TokenKind::Identifier(s) if s == "warn") {
            self.advance();
            Ok(ValidateAction::Warn(self.expect_string()?))
        } else if matches!(&self.current().kind, TokenKind::Identifier(s) if s == "pass") {
            self.advance();
            Ok(ValidateAction::Pass)
        } else {
            Err(CompileError::parse_unexpected(
                self.pos_here(),
                "refine/raise/warn/pass".to_string(),
                self.current().kind.to_string(),
            ))
        }
    }

    fn parse_validate(&mut self) -> PResult<ValidateNode> {
        let pos = self.pos_here();
        self.expect_keyword("validate")?;
        let target = self.expect_name()?;
        self.expect_keyword("against")?;
        let schema = self.expect_name()?;
        self.expect(TokenKind::LBrace)?;
        let mut rules = Vec::new();
        while self.current().kind != TokenKind::RBrace {
            if self.check_keyword("if") {
                self.advance();
                let condition = self.parse_condition_text()?;
                let action = self.parse_validate_action()?;
                rules.push(ValidateRule { condition, action });
            } else {
                // Bare action with no guard, e.g. `pass`.
                let action = self.parse_validate_action()?;
                rules.push(ValidateRule { condition: String::new(), action });
            }
            if self.current().kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(ValidateNode { target, schema, rules, pos })
    }

    fn parse_refine(&mut self) -> PResult<RefineNode> {
        let pos = self.pos_here();
        self.expect_keyword("refine")?;
        let mut node = RefineNode { pos, ..Default::default() };
        if self.current().kind == TokenKind::LParen {
            self.advance();
            node.parse_args(self)?;
            self.expect(TokenKind::RParen)?;
        } else if self.current().kind == TokenKind::LBrace {
            for (field, value, fpos) in self.parse_block()? {
                match field.as_str() {
                    "max_attempts" => node.max_attempts = value.as_i64(),
                    "backoff" => node.backoff = value.as_str().map(String::from),
                    "on_exhaustion" => node.on_exhaustion = value.as_str().map(String::from),
                    other => self.warn_unknown(other, fpos),
                }
            }
        }
        Ok(node)
    }

    fn parse_use_tool(&mut self) -> PResult<UseToolNode> {
        let pos = self.pos_here();
        self.expect_keyword("use")?;
        let tool_name = self.expect_name()?;
        self.expect(TokenKind::LParen)?;
        let argument = self.expect_string()?;
        self.expect(TokenKind::RParen)?;
        Ok(UseToolNode { tool_name, argument, pos })
    }

    fn parse_remember(&mut self) -> PResult<RememberNode> {
        let pos = self.pos_here();
        self.expect_keyword("remember")?;
        let mut node = RememberNode { pos, ..Default::default() };
        for (field, value, fpos) in self.parse_block()? {
            match field.as_str() {
                "key" => node.key = value.as_str().map(String::from).unwrap_or_default(),
                "value" => node.value = value.as_str().map(String::from).unwrap_or_default(),
                other => self.warn_unknown(other, fpos),
            }
        }
        Ok(node)
    }

    fn parse_recall(&mut self) -> PResult<RecallNode> {
        let pos = self.pos_here();
        self.expect_keyword("recall")?;
        let query = self.expect_string()?;
        let mut node = RecallNode { query, pos, ..Default::default() };
        if self.current().kind == TokenKind::LBrace {
            for (field, value, fpos) in self.parse_block()? {
                match field.as_str() {
                    "top_k" => node.top_k = value.as_i64(),
                    other => self.warn_unknown(other, fpos),
                }
            }
        }
        Ok(node)
    }

    fn parse_conditional(&mut self) -> PResult<ConditionalNode> {
        let pos = self.pos_here();
        self.expect_keyword("if")?;
        let condition = self.parse_condition_until_brace()?;
        let then_body = self.parse_step_body()?;
        let mut else_body = Vec::new();
        if self.check_keyword("else") {
            self.advance();
            else_body = self.parse_step_body()?;
        }
        Ok(ConditionalNode { condition, then_body, else_body, pos })
    }

    fn parse_condition_until_brace(&mut self) -> PResult<String> {
        let mut parts = Vec::new();
        while self.current().kind != TokenKind::LBrace {
            if self.at_eof() {
                return Err(CompileError::parse_unexpected(
                    self.pos_here(),
                    "'{'".to_string(),
                    "end of input".to_string(),
                ));
            }
            parts.push(self.advance().lexeme);
        }
        Ok(parts.join(" "))
    }

    fn parse_intent_ref(&mut self) -> PResult<IntentRefNode> {
        let pos = self.pos_here();
        self.expect_keyword("intent")?;
        let name = self.expect_name()?;
        Ok(IntentRefNode { name, pos })
    }

    // ── Run ──────────────────────────────────────────────────────────

    fn parse_run(&mut self) -> PResult<RunDecl> {
        let pos = self.pos_here();
        self.expect_keyword("run")?;
        let flow_name = self.expect_name()?;
        let mut args = Vec::new();
        self.expect(TokenKind::LParen)?;
        while self.current().kind != TokenKind::RParen {
            args.push(self.expect_name().or_else(|_| self.expect_string())?);
            if self.current().kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen)?;

        let mut decl = RunDecl { flow_name, args, pos, ..Default::default() };
        loop {
            match &self.current().kind {
                TokenKind::Keyword("as") => {
                    self.advance();
                    decl.persona_name = Some(self.expect_name()?);
                }
                TokenKind::Keyword("within") => {
                    self.advance();
                    decl.context_name = Some(self.expect_name()?);
                }
                TokenKind::Keyword("constrained_by") => {
                    self.advance();
                    self.expect(TokenKind::LBracket)?;
                    while self.current().kind != TokenKind::RBracket {
                        decl.anchor_names.push(self.expect_name()?);
                        if self.current().kind == TokenKind::Comma {
                            self.advance();
                        }
                    }
                    self.expect(TokenKind::RBracket)?;
                }
                TokenKind::Keyword("on_failure") => {
                    self.advance();
                    self.expect(TokenKind::Colon)?;
                    decl.on_failure = Some(self.parse_on_failure()?);
                }
                TokenKind::Keyword("output_to") => {
                    self.advance();
                    self.expect(TokenKind::Colon)?;
                    decl.output_to = Some(self.expect_string()?);
                }
                TokenKind::Keyword("effort") => {
                    self.advance();
                    self.expect(TokenKind::Colon)?;
                    decl.effort = Some(self.expect_name()?);
                }
                _ => break,
            }
        }
        Ok(decl)
    }

    fn parse_on_failure(&mut self) -> PResult<OnFailure> {
        let name = self.expect_name()?;
        match name.as_str() {
            "retry" => {
                let mut backoff = None;
                if self.current().kind == TokenKind::LParen {
                    self.advance();
                    while self.current().kind != TokenKind::RParen {
                        let field = self.expect_name()?;
                        self.expect(TokenKind::Colon)?;
                        let value = self.expect_name()?;
                        if field == "backoff" {
                            backoff = Some(value);
                        }
                        if self.current().kind == TokenKind::Comma {
                            self.advance();
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                }
                Ok(OnFailure::Retry { backoff })
            }
            "raise" => Ok(OnFailure::Raise(self.expect_name()?)),
            "log" => Ok(OnFailure::Log),
            "escalate" => Ok(OnFailure::Escalate),
            other => Err(CompileError::parse_unexpected(
                self.pos_here(),
                "retry/raise/log/escalate".to_string(),
                other.to_string(),
            )),
        }
    }
}

impl RefineNode {
    fn parse_args(&mut self, parser: &mut Parser) -> PResult<()> {
        while parser.current().kind != TokenKind::RParen {
            let field = parser.expect_name()?;
            parser.expect(TokenKind::Colon)?;
            let value = parser.parse_value()?;
            match field.as_str() {
                "max_attempts" => self.max_attempts = value.as_i64(),
                "backoff" => self.backoff = value.as_str().map(String::from),
                "on_exhaustion" => self.on_exhaustion = value.as_str().map(String::from),
                _ => {}
            }
            if parser.current().kind == TokenKind::Comma {
                parser.advance();
            }
        }
        Ok(())
    }
}

pub fn parse(source: &str) -> PResult<Program> {
    let tokens = super::lexer::tokenize(source)?;
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_persona_declaration() {
        let program = parse("persona Expert { tone: precise }").unwrap();
        assert_eq!(program.declarations.len(), 1);
        match &program.declarations[0] {
            Decl::Persona(p) => {
                assert_eq!(p.name, "Expert");
                assert_eq!(p.tone.as_deref(), Some("precise"));
                assert!(p.confidence_threshold.is_none());
            }
            other => panic!("expected persona, got {other:?}"),
        }
    }

    #[test]
    fn unknown_field_produces_warning_not_error() {
        let program = parse("persona Expert { tone: precise, mystery: 1 }").unwrap();
        assert_eq!(program.warnings.len(), 1);
        assert_eq!(program.warnings[0].field, "mystery");
    }

    #[test]
    fn parses_probe_step_inside_flow() {
        let source = "flow F() { probe Doc for [title, author] }";
        let program = parse(source).unwrap();
        match &program.declarations[0] {
            Decl::Flow(f) => match &f.steps[0] {
                Step::Probe(p) => {
                    assert_eq!(p.target, "Doc");
                    assert_eq!(p.fields, vec!["title".to_string(), "author".to_string()]);
                }
                other => panic!("expected probe, got {other:?}"),
            },
            other => panic!("expected flow, got {other:?}"),
        }
    }

    #[test]
    fn parses_reason_given_normalizes_to_enum_variant() {
        let source = r#"flow F() { reason about "topic" { given: ["a", "b"], depth: 2 } }"#;
        let program = parse(source).unwrap();
        match &program.declarations[0] {
            Decl::Flow(f) => match &f.steps[0] {
                Step::Reason(r) => {
                    assert_eq!(r.given, ReasonGiven::Many(vec!["a".into(), "b".into()]));
                    assert_eq!(r.depth, Some(2));
                }
                other => panic!("expected reason, got {other:?}"),
            },
            other => panic!("expected flow, got {other:?}"),
        }
    }

    #[test]
    fn parses_run_with_constrained_by_and_effort() {
        let source = "run F() constrained_by [GhostAnchor] effort: high";
        let program = parse(source).unwrap();
        match &program.declarations[0] {
            Decl::Run(r) => {
                assert_eq!(r.flow_name, "F");
                assert_eq!(r.anchor_names, vec!["GhostAnchor".to_string()]);
                assert_eq!(r.effort.as_deref(), Some("high"));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_token_produces_parse_error_with_position() {
        let err = parse("persona { }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
