//! Provider-agnostic compiled-program shapes and the `Backend` trait.
//!
//! A backend turns an `IRProgram` into a `CompiledProgram`: one
//! `CompiledExecutionUnit` per `run` statement, each unit a flat ordered list
//! of `CompiledStep`s plus a system prompt. Everything here is data; the
//! prose framing differences between backends live in `bracket`/`markdown`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::ast::OnFailure;
use crate::ir::nodes::{AnchorId, IRAnchor, IRContext, IRPersona, IRProgram, IRRun, IRStep, IRTool};

/// Per-step metadata the executor switches on. Narrowed from a generic dict
/// to a typed sum so unknown steps can't silently carry nonsense fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepMetadata {
    None,
    UseTool { tool_name: String, argument: String },
    Refine(RefineConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    pub max_attempts: i64,
    pub pass_failure_context: bool,
    pub backoff: String,
    pub on_exhaustion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledStep {
    pub step_name: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub output_schema: Option<Value>,
    pub confidence_floor: Option<f64>,
    pub metadata: StepMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledExecutionUnit {
    pub flow_name: String,
    pub persona_name: Option<String>,
    pub context_name: Option<String>,
    pub anchor_names: Vec<String>,
    pub on_failure: Option<OnFailure>,
    pub output_to: Option<String>,
    pub steps: Vec<CompiledStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub backend_name: String,
    pub units: Vec<CompiledExecutionUnit>,
}

pub trait Backend {
    fn name(&self) -> &'static str;

    fn compile_program(&self, ir: &IRProgram) -> CompiledProgram {
        let tool_map: HashMap<String, &IRTool> =
            ir.tools.iter().map(|t| (t.name.clone(), t)).collect();

        let units = ir
            .runs
            .iter()
            .map(|run| self.compile_run(ir, run, &tool_map))
            .collect();

        CompiledProgram {
            backend_name: self.name().to_string(),
            units,
        }
    }

    fn compile_run(
        &self,
        ir: &IRProgram,
        run: &IRRun,
        tool_map: &HashMap<String, &IRTool>,
    ) -> CompiledExecutionUnit {
        let persona = run.resolved_persona.map(|id| ir.persona(id));
        let context = run.resolved_context.map(|id| ir.context(id));
        let anchors: Vec<&IRAnchor> = run
            .resolved_anchors
            .iter()
            .map(|id: &AnchorId| ir.anchor(*id))
            .collect();
        let flow = ir.flow(run.resolved_flow.expect("run compiled before resolution"));

        let system_prompt = self.compile_system_prompt(persona, context, &anchors);

        let mut prior_step_names = Vec::new();
        let mut steps = Vec::new();
        for step in &flow.steps {
            let compiled = self.compile_step(step, &system_prompt, &prior_step_names, run);
            if let Some(name) = step_name(step) {
                prior_step_names.push(name);
            }
            steps.push(compiled);
        }

        CompiledExecutionUnit {
            flow_name: run.flow_name.clone(),
            persona_name: run.persona_name.clone(),
            context_name: run.context_name.clone(),
            anchor_names: run.anchor_names.clone(),
            on_failure: run.on_failure.clone(),
            output_to: run.output_to.clone(),
            steps,
        }
    }

    fn compile_step(
        &self,
        step: &IRStep,
        system_prompt: &str,
        prior_step_names: &[String],
        run: &IRRun,
    ) -> CompiledStep;

    fn compile_system_prompt(
        &self,
        persona: Option<&IRPersona>,
        context: Option<&IRContext>,
        anchors: &[&IRAnchor],
    ) -> String;

    fn compile_tool_spec(&self, tool: &IRTool) -> Value {
        serde_json::json!({
            "name": tool.name,
            "max_results": tool.max_results,
        })
    }

    /// Default structured-text rendering; backends may override for a
    /// different prose register.
    fn compile_anchor_instruction(&self, anchor: &IRAnchor) -> String {
        let floor = anchor
            .confidence_floor
            .map(|f| format!(" (confidence floor {f})"))
            .unwrap_or_default();
        format!("Constraint '{}'{floor}: never violate.", anchor.name)
    }
}

fn step_name(step: &IRStep) -> Option<String> {
    match step {
        IRStep::Step(s) => Some(s.name.clone()),
        _ => None,
    }
}

/// `probe` output schema: an object describing the requested fields.
/// `type_name` lets bracket/markdown differ only in casing.
pub fn probe_output_schema(fields: &[String], type_name: &str) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| (f.clone(), serde_json::json!({"type": "string"})))
        .collect();
    serde_json::json!({
        "type": type_name,
        "properties": properties,
        "required": fields,
    })
}
