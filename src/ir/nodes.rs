//! Immutable lowered IR node definitions.
//!
//! Resolved cross-references in `IRRun` are modeled as indices into the
//! owning `IRProgram`'s per-kind vectors rather than duplicated or shared
//! node ownership — this avoids the AST reference's name-plus-node
//! duplication and makes serialization trivial.

use serde::{Deserialize, Serialize};

use crate::compiler::ast::{OnFailure, TypeExpr};
use crate::compiler::tokens::Position;

macro_rules! index_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub usize);
    };
}

index_type!(PersonaId);
index_type!(ContextId);
index_type!(AnchorId);
index_type!(ToolId);
index_type!(MemoryId);
index_type!(TypeId);
index_type!(FlowId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRImport {
    pub node_type: &'static str,
    pub namespace: String,
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRPersona {
    pub node_type: &'static str,
    pub name: String,
    pub tone: Option<String>,
    pub confidence_threshold: Option<f64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRContext {
    pub node_type: &'static str,
    pub name: String,
    pub memory_scope: Option<String>,
    pub depth: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRAnchor {
    pub node_type: &'static str,
    pub name: String,
    pub confidence_floor: Option<f64>,
    pub on_violation: Option<String>,
    pub target: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRMemory {
    pub node_type: &'static str,
    pub name: String,
    pub store: Option<String>,
    pub retrieval: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRTool {
    pub node_type: &'static str,
    pub name: String,
    pub max_results: Option<i64>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRTypeDef {
    pub node_type: &'static str,
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub fields: Vec<(String, TypeExpr)>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRIntent {
    pub node_type: &'static str,
    pub name: String,
    pub ask: String,
    pub output_type: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRFlow {
    pub node_type: &'static str,
    pub name: String,
    pub params: Vec<(String, TypeExpr)>,
    pub return_type: Option<TypeExpr>,
    pub steps: Vec<IRStep>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IRStep {
    Step(IRStepNode),
    Probe(IRProbe),
    Reason(IRReason),
    Weave(IRWeave),
    Validate(IRValidate),
    Refine(IRRefine),
    UseTool(IRUseTool),
    Remember(IRRemember),
    Recall(IRRecall),
    Conditional(IRConditional),
    Intent(IRIntentRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRStepNode {
    pub name: String,
    pub body: Vec<IRStep>,
    pub output_type: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRProbe {
    pub target: String,
    pub fields: Vec<String>,
    pub pos: Position,
}

/// `given` is always a tuple (`Vec<String>` here): a single-string AST value
/// normalizes to a one-element vector, an empty value to an empty vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRReason {
    pub topic: String,
    pub given: Vec<String>,
    pub depth: Option<i64>,
    pub show_work: Option<bool>,
    pub ask: Option<String>,
    pub output: Option<TypeExpr>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRWeave {
    pub sources: Vec<String>,
    pub target: String,
    pub priority: Vec<String>,
    pub format: Option<String>,
    pub style: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IRValidateAction {
    Refine(IRRefine),
    Raise(String),
    Warn(String),
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRValidateRule {
    pub condition: String,
    pub action: IRValidateAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRValidate {
    pub target: String,
    pub schema: String,
    pub rules: Vec<IRValidateRule>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRRefine {
    pub max_attempts: i64,
    pub pass_failure_context: bool,
    pub backoff: String,
    pub on_exhaustion: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRUseTool {
    pub tool_name: String,
    pub argument: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRRemember {
    pub key: String,
    pub value: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRRecall {
    pub query: String,
    pub top_k: i64,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRConditional {
    pub condition: String,
    pub then_body: Vec<IRStep>,
    pub else_body: Vec<IRStep>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRIntentRef {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRRun {
    pub node_type: &'static str,
    pub flow_name: String,
    pub args: Vec<String>,
    pub persona_name: Option<String>,
    pub context_name: Option<String>,
    pub anchor_names: Vec<String>,
    pub on_failure: Option<OnFailure>,
    pub output_to: Option<String>,
    pub effort: Option<String>,
    pub pos: Position,

    /// Populated by IR generation Phase 2. `None` only transiently, before
    /// resolution — never observable on a successfully generated program.
    pub resolved_flow: Option<FlowId>,
    pub resolved_persona: Option<PersonaId>,
    pub resolved_context: Option<ContextId>,
    pub resolved_anchors: Vec<AnchorId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRProgram {
    pub node_type: &'static str,
    pub personas: Vec<IRPersona>,
    pub contexts: Vec<IRContext>,
    pub anchors: Vec<IRAnchor>,
    pub tools: Vec<IRTool>,
    pub memories: Vec<IRMemory>,
    pub types: Vec<IRTypeDef>,
    pub intents: Vec<IRIntent>,
    pub flows: Vec<IRFlow>,
    pub runs: Vec<IRRun>,
    pub imports: Vec<IRImport>,
}

impl IRProgram {
    pub fn persona(&self, id: PersonaId) -> &IRPersona {
        &self.personas[id.0]
    }
    pub fn context(&self, id: ContextId) -> &IRContext {
        &self.contexts[id.0]
    }
    pub fn anchor(&self, id: AnchorId) -> &IRAnchor {
        &self.anchors[id.0]
    }
    pub fn tool(&self, id: ToolId) -> &IRTool {
        &self.tools[id.0]
    }
    pub fn flow(&self, id: FlowId) -> &IRFlow {
        &self.flows[id.0]
    }
}
