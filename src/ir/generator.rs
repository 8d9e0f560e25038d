//! AST → IR lowering, cross-reference resolution, and static tool
//! verification.
//!
//! Two phases, matching the reference generator exactly:
//!
//! Phase 1 — lower every top-level declaration in source order, populating
//! per-kind symbol tables keyed by name as they are encountered (so forward
//! references within a program work); queue `run` statements unresolved.
//!
//! Phase 2 — resolve each queued run's `flow_name` (required), then
//! `persona_name`/`context_name` (optional — empty names are skipped), then
//! each anchor name, producing a fresh `IRRun` with both the original names
//! and the resolved indices populated. After resolution, walk the resolved
//! flow's step tree and verify every `use_tool.tool_name` is declared.

use std::collections::HashMap;

use crate::compiler::ast::{self as ast, Decl, Program};
use crate::compiler::errors::CompileError;
use crate::compiler::tokens::Position;

use super::nodes::*;

pub struct IRGenerator {
    personas: Vec<IRPersona>,
    contexts: Vec<IRContext>,
    anchors: Vec<IRAnchor>,
    tools: Vec<IRTool>,
    memories: Vec<IRMemory>,
    types: Vec<IRTypeDef>,
    intents: Vec<IRIntent>,
    flows: Vec<IRFlow>,
    imports: Vec<IRImport>,

    persona_index: HashMap<String, PersonaId>,
    context_index: HashMap<String, ContextId>,
    anchor_index: HashMap<String, AnchorId>,
    tool_index: HashMap<String, ToolId>,
    flow_index: HashMap<String, FlowId>,

    queued_runs: Vec<ast::RunDecl>,
}

impl IRGenerator {
    pub fn new() -> Self {
        Self {
            personas: Vec::new(),
            contexts: Vec::new(),
            anchors: Vec::new(),
            tools: Vec::new(),
            memories: Vec::new(),
            types: Vec::new(),
            intents: Vec::new(),
            flows: Vec::new(),
            imports: Vec::new(),
            persona_index: HashMap::new(),
            context_index: HashMap::new(),
            anchor_index: HashMap::new(),
            tool_index: HashMap::new(),
            flow_index: HashMap::new(),
            queued_runs: Vec::new(),
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<IRProgram, CompileError> {
        for decl in &program.declarations {
            self.lower_decl(decl);
        }

        let mut runs = Vec::new();
        for run in std::mem::take(&mut self.queued_runs) {
            runs.push(self.resolve_run(run)?);
        }

        let ir = IRProgram {
            node_type: "program",
            personas: self.personas,
            contexts: self.contexts,
            anchors: self.anchors,
            tools: self.tools,
            memories: self.memories,
            types: self.types,
            intents: self.intents,
            flows: self.flows,
            runs,
            imports: self.imports,
        };
        Ok(ir)
    }

    // ── Phase 1 — lowering ────────────────────────────────────────────

    fn lower_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Import(d) => self.imports.push(IRImport {
                node_type: "import",
                namespace: d.namespace.clone(),
                name: d.name.clone(),
                pos: d.pos,
            }),
            Decl::Persona(d) => {
                let id = PersonaId(self.personas.len());
                self.personas.push(IRPersona {
                    node_type: "persona",
                    name: d.name.clone(),
                    tone: d.tone.clone(),
                    confidence_threshold: d.confidence_threshold,
                    pos: d.pos,
                });
                self.persona_index.insert(d.name.clone(), id);
            }
            Decl::Context(d) => {
                let id = ContextId(self.contexts.len());
                self.contexts.push(IRContext {
                    node_type: "context",
                    name: d.name.clone(),
                    memory_scope: d.memory_scope.clone(),
                    depth: d.depth.clone(),
                    temperature: d.temperature,
                    max_tokens: d.max_tokens,
                    pos: d.pos,
                });
                self.context_index.insert(d.name.clone(), id);
            }
            Decl::Anchor(d) => {
                let id = AnchorId(self.anchors.len());
                self.anchors.push(IRAnchor {
                    node_type: "anchor",
                    name: d.name.clone(),
                    confidence_floor: d.confidence_floor,
                    on_violation: d.on_violation.clone(),
                    target: d.target.clone(),
                    pos: d.pos,
                });
                self.anchor_index.insert(d.name.clone(), id);
            }
            Decl::Memory(d) => self.memories.push(IRMemory {
                node_type: "memory",
                name: d.name.clone(),
                store: d.store.clone(),
                retrieval: d.retrieval.clone(),
                pos: d.pos,
            }),
            Decl::Tool(d) => {
                let id = ToolId(self.tools.len());
                self.tools.push(IRTool {
                    node_type: "tool",
                    name: d.name.clone(),
                    max_results: d.max_results,
                    pos: d.pos,
                });
                self.tool_index.insert(d.name.clone(), id);
            }
            Decl::Type(d) => self.types.push(IRTypeDef {
                node_type: "type",
                name: d.name.clone(),
                min: d.min,
                max: d.max,
                fields: d.fields.clone(),
                pos: d.pos,
            }),
            Decl::Intent(d) => self.intents.push(IRIntent {
                node_type: "intent",
                name: d.name.clone(),
                ask: d.ask.clone(),
                output_type: d.output_type.clone(),
                pos: d.pos,
            }),
            Decl::Flow(d) => {
                let id = FlowId(self.flows.len());
                let steps = d.steps.iter().map(lower_step).collect();
                self.flows.push(IRFlow {
                    node_type: "flow",
                    name: d.name.clone(),
                    params: d.params.clone(),
                    return_type: d.return_type.clone(),
                    steps,
                    pos: d.pos,
                });
                self.flow_index.insert(d.name.clone(), id);
            }
            Decl::Run(d) => self.queued_runs.push(d.clone()),
        }
    }

    // ── Phase 2 — resolution ─────────────────────────────────────────

    fn resolve_run(&self, run: ast::RunDecl) -> Result<IRRun, CompileError> {
        let resolved_flow = Some(self.resolve_ref(
            &run.flow_name,
            &self.flow_index,
            "flow",
            run.pos,
        )?);

        let resolved_persona = match &run.persona_name {
            Some(name) if !name.is_empty() => {
                Some(self.resolve_ref(name, &self.persona_index, "persona", run.pos)?)
            }
            _ => None,
        };
        let resolved_context = match &run.context_name {
            Some(name) if !name.is_empty() => {
                Some(self.resolve_ref(name, &self.context_index, "context", run.pos)?)
            }
            _ => None,
        };

        let mut resolved_anchors = Vec::new();
        for name in &run.anchor_names {
            resolved_anchors.push(self.resolve_ref(name, &self.anchor_index, "anchor", run.pos)?);
        }

        let ir_run = IRRun {
            node_type: "run",
            flow_name: run.flow_name,
            args: run.args,
            persona_name: run.persona_name,
            context_name: run.context_name,
            anchor_names: run.anchor_names,
            on_failure: run.on_failure,
            output_to: run.output_to,
            effort: run.effort,
            pos: run.pos,
            resolved_flow,
            resolved_persona,
            resolved_context,
            resolved_anchors,
        };

        if let Some(flow_id) = ir_run.resolved_flow {
            let flow = &self.flows[flow_id.0];
            self.verify_step_tools(&flow.steps)?;
        }

        Ok(ir_run)
    }

    fn resolve_ref<T: Copy>(
        &self,
        name: &str,
        table: &HashMap<String, T>,
        kind: &str,
        pos: Position,
    ) -> Result<T, CompileError> {
        table.get(name).copied().ok_or_else(|| {
            let available: Vec<String> = table.keys().cloned().collect();
            CompileError::unresolved_reference(kind, name, &available, pos)
        })
    }

    fn verify_step_tools(&self, steps: &[IRStep]) -> Result<(), CompileError> {
        for step in steps {
            match step {
                IRStep::UseTool(use_tool) => {
                    if !self.tool_index.contains_key(&use_tool.tool_name) {
                        let available: Vec<String> = self.tool_index.keys().cloned().collect();
                        return Err(CompileError::unresolved_reference(
                            "tool",
                            &use_tool.tool_name,
                            &available,
                            use_tool.pos,
                        ));
                    }
                }
                IRStep::Step(s) => self.verify_step_tools(&s.body)?,
                IRStep::Conditional(c) => {
                    self.verify_step_tools(&c.then_body)?;
                    self.verify_step_tools(&c.else_body)?;
                }
                IRStep::Validate(v) => {
                    for rule in &v.rules {
                        if let IRValidateAction::Refine(_) = &rule.action {
                            // Refine blocks carry no nested tool steps.
                        }
                    }
                    let _ = v;
                }
                IRStep::Probe(_)
                | IRStep::Reason(_)
                | IRStep::Weave(_)
                | IRStep::Refine(_)
                | IRStep::Remember(_)
                | IRStep::Recall(_)
                | IRStep::Intent(_) => {}
            }
        }
        Ok(())
    }
}

impl Default for IRGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn lower_refine(r: &ast::RefineNode) -> IRRefine {
    IRRefine {
        max_attempts: r.max_attempts.unwrap_or(3),
        pass_failure_context: true,
        backoff: r.backoff.clone().unwrap_or_else(|| "none".to_string()),
        on_exhaustion: r.on_exhaustion.clone().unwrap_or_default(),
        pos: r.pos,
    }
}

/// Normalizes `reason.given` to a tuple (`Vec<String>` here): empty → `[]`,
/// a single string → a one-element vector, a list → itself.
fn normalize_given(given: &ast::ReasonGiven) -> Vec<String> {
    match given {
        ast::ReasonGiven::None => Vec::new(),
        ast::ReasonGiven::Single(s) if s.is_empty() => Vec::new(),
        ast::ReasonGiven::Single(s) => vec![s.clone()],
        ast::ReasonGiven::Many(items) => items.clone(),
    }
}

fn lower_step(step: &ast::Step) -> IRStep {
    match step {
        ast::Step::Step(s) => IRStep::Step(IRStepNode {
            name: s.name.clone(),
            body: s.body.iter().map(lower_step).collect(),
            output_type: s.output_type.clone(),
            pos: s.pos,
        }),
        ast::Step::Probe(p) => IRStep::Probe(IRProbe {
            target: p.target.clone(),
            fields: p.fields.clone(),
            pos: p.pos,
        }),
        ast::Step::Reason(r) => IRStep::Reason(IRReason {
            topic: r.topic.clone(),
            given: normalize_given(&r.given),
            depth: r.depth,
            show_work: r.show_work,
            ask: r.ask.clone(),
            output: r.output.clone(),
            pos: r.pos,
        }),
        ast::Step::Weave(w) => IRStep::Weave(IRWeave {
            sources: w.sources.clone(),
            target: w.target.clone(),
            priority: w.priority.clone(),
            format: w.format.clone(),
            style: w.style.clone(),
            pos: w.pos,
        }),
        ast::Step::Validate(v) => IRStep::Validate(IRValidate {
            target: v.target.clone(),
            schema: v.schema.clone(),
            rules: v
                .rules
                .iter()
                .map(|r| IRValidateRule {
                    condition: r.condition.clone(),
                    action: match &r.action {
                        ast::ValidateAction::Refine(rf) => IRValidateAction::Refine(lower_refine(rf)),
                        ast::ValidateAction::Raise(s) => IRValidateAction::Raise(s.clone()),
                        ast::ValidateAction::Warn(s) => IRValidateAction::Warn(s.clone()),
                        ast::ValidateAction::Pass => IRValidateAction::Pass,
                    },
                })
                .collect(),
            pos: v.pos,
        }),
        ast::Step::Refine(r) => IRStep::Refine(lower_refine(r)),
        ast::Step::UseTool(u) => IRStep::UseTool(IRUseTool {
            tool_name: u.tool_name.clone(),
            argument: u.argument.clone(),
            pos: u.pos,
        }),
        ast::Step::Remember(r) => IRStep::Remember(IRRemember {
            key: r.key.clone(),
            value: r.value.clone(),
            pos: r.pos,
        }),
        ast::Step::Recall(r) => IRStep::Recall(IRRecall {
            query: r.query.clone(),
            top_k: r.top_k.unwrap_or(5),
            pos: r.pos,
        }),
        ast::Step::Conditional(c) => IRStep::Conditional(IRConditional {
            condition: c.condition.clone(),
            then_body: c.then_body.iter().map(lower_step).collect(),
            else_body: c.else_body.iter().map(lower_step).collect(),
            pos: c.pos,
        }),
        ast::Step::Intent(i) => IRStep::Intent(IRIntentRef {
            name: i.name.clone(),
            pos: i.pos,
        }),
    }
}

pub fn generate(program: &Program) -> Result<IRProgram, CompileError> {
    IRGenerator::new().generate(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse;

    #[test]
    fn generates_program_with_resolved_flow() {
        let source = "flow F() { probe Doc for [title] } run F()";
        let ast_program = parse(source).unwrap();
        let ir = generate(&ast_program).unwrap();
        assert_eq!(ir.runs.len(), 1);
        assert!(ir.runs[0].resolved_flow.is_some());
    }

    #[test]
    fn dangling_anchor_reference_fails_with_descriptive_error() {
        let source = "flow F() { probe Doc for [title] } run F() constrained_by [GhostAnchor]";
        let ast_program = parse(source).unwrap();
        let err = generate(&ast_program).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("GhostAnchor"));
        assert!(msg.contains("(none)"));
    }

    #[test]
    fn dangling_tool_reference_in_flow_fails() {
        let source = r#"flow F() { use Ghost("q") } run F()"#;
        let ast_program = parse(source).unwrap();
        let err = generate(&ast_program).unwrap_err();
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn reason_given_normalizes_empty_single_and_many() {
        assert_eq!(normalize_given(&ast::ReasonGiven::None), Vec::<String>::new());
        assert_eq!(
            normalize_given(&ast::ReasonGiven::Single("x".into())),
            vec!["x".to_string()]
        );
        assert_eq!(
            normalize_given(&ast::ReasonGiven::Many(vec!["a".into(), "b".into()])),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    proptest::proptest! {
        #[test]
        fn reason_given_many_normalization_preserves_non_empty_items(items in proptest::collection::vec("[a-z]{1,8}", 0..6)) {
            let normalized = normalize_given(&ast::ReasonGiven::Many(items.clone()));
            proptest::prop_assert_eq!(normalized, items);
        }

        #[test]
        fn reason_given_single_normalization_is_idempotent_under_many_of_one(s in "[a-z]{1,8}") {
            let from_single = normalize_given(&ast::ReasonGiven::Single(s.clone()));
            let from_many = normalize_given(&ast::ReasonGiven::Many(vec![s]));
            proptest::prop_assert_eq!(from_single, from_many);
        }
    }

    #[test]
    fn run_with_empty_persona_name_skips_resolution() {
        let source = "flow F() { probe Doc for [title] } persona P { tone: precise } run F() as P";
        let ast_program = parse(source).unwrap();
        let ir = generate(&ast_program).unwrap();
        assert!(ir.runs[0].resolved_persona.is_some());
    }
}
