//! Cognitive AST node definitions.
//!
//! The root `Program` holds an ordered sequence of top-level declarations.
//! Nodes are tagged enums rather than a string-keyed dispatch table — the
//! parser and type checker both exhaustively match over `Decl`/`Step`.

use super::tokens::Position;

/// A type expression: `Name`, `Name<Param>`, or `Name?`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TypeExpr {
    pub name: String,
    pub param: Option<String>,
    pub optional: bool,
}

impl TypeExpr {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param: None,
            optional: false,
        }
    }
}

/// Root of a parsed AXON program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub declarations: Vec<Decl>,
    pub warnings: Vec<super::errors::ParserWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Import(ImportDecl),
    Persona(PersonaDecl),
    Context(ContextDecl),
    Anchor(AnchorDecl),
    Memory(MemoryDecl),
    Tool(ToolDecl),
    Type(TypeDecl),
    Flow(FlowDecl),
    Intent(IntentDecl),
    Run(RunDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub namespace: String,
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersonaDecl {
    pub name: String,
    pub tone: Option<String>,
    pub confidence_threshold: Option<f64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextDecl {
    pub name: String,
    pub memory_scope: Option<String>,
    pub depth: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnchorDecl {
    pub name: String,
    pub confidence_floor: Option<f64>,
    pub on_violation: Option<String>,
    pub target: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryDecl {
    pub name: String,
    pub store: Option<String>,
    pub retrieval: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolDecl {
    pub name: String,
    pub max_results: Option<i64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDecl {
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub fields: Vec<(String, TypeExpr)>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentDecl {
    pub name: String,
    pub ask: String,
    pub output_type: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowDecl {
    pub name: String,
    pub params: Vec<(String, TypeExpr)>,
    pub return_type: Option<TypeExpr>,
    pub steps: Vec<Step>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Step(StepNode),
    Probe(ProbeNode),
    Reason(ReasonNode),
    Weave(WeaveNode),
    Validate(ValidateNode),
    Refine(RefineNode),
    UseTool(UseToolNode),
    Remember(RememberNode),
    Recall(RecallNode),
    Conditional(ConditionalNode),
    Intent(IntentRefNode),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepNode {
    pub name: String,
    pub body: Vec<Step>,
    pub output_type: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeNode {
    pub target: String,
    pub fields: Vec<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReasonGiven {
    None,
    Single(String),
    Many(Vec<String>),
}

impl Default for ReasonGiven {
    fn default() -> Self {
        ReasonGiven::None
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReasonNode {
    pub topic: String,
    pub given: ReasonGiven,
    pub depth: Option<i64>,
    pub show_work: Option<bool>,
    pub ask: Option<String>,
    pub output: Option<TypeExpr>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeaveNode {
    pub sources: Vec<String>,
    pub target: String,
    pub priority: Vec<String>,
    pub format: Option<String>,
    pub style: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidateAction {
    Refine(RefineNode),
    Raise(String),
    Warn(String),
    Pass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidateRule {
    pub condition: String,
    pub action: ValidateAction,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidateNode {
    pub target: String,
    pub schema: String,
    pub rules: Vec<ValidateRule>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefineNode {
    pub max_attempts: Option<i64>,
    pub backoff: Option<String>,
    pub on_exhaustion: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UseToolNode {
    pub tool_name: String,
    pub argument: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RememberNode {
    pub key: String,
    pub value: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecallNode {
    pub query: String,
    pub top_k: Option<i64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionalNode {
    pub condition: String,
    pub then_body: Vec<Step>,
    pub else_body: Vec<Step>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentRefNode {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum OnFailure {
    Retry { backoff: Option<String> },
    Raise(String),
    Log,
    Escalate,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunDecl {
    pub flow_name: String,
    pub args: Vec<String>,
    pub persona_name: Option<String>,
    pub context_name: Option<String>,
    pub anchor_names: Vec<String>,
    pub on_failure: Option<OnFailure>,
    pub output_to: Option<String>,
    pub effort: Option<String>,
    pub pos: Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_expr_simple_has_no_param_or_optional() {
        let t = TypeExpr::simple("FactualClaim");
        assert_eq!(t.name, "FactualClaim");
        assert!(t.param.is_none());
        assert!(!t.optional);
    }

    #[test]
    fn reason_given_defaults_to_none() {
        assert_eq!(ReasonGiven::default(), ReasonGiven::None);
    }
}
