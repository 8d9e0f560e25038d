//! Markdown-framed backend: "Your identity is <name>." plus markdown
//! headers and bolded must/must-not rules.

use crate::ir::nodes::{IRAnchor, IRContext, IRPersona, IRReason, IRRun, IRStep};

use super::contract::{probe_output_schema, Backend, CompiledStep, RefineConfig, StepMetadata};

pub struct MarkdownBackend;

impl Backend for MarkdownBackend {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn compile_system_prompt(
        &self,
        persona: Option<&IRPersona>,
        context: Option<&IRContext>,
        anchors: &[&IRAnchor],
    ) -> String {
        let mut out = String::new();
        match persona {
            Some(p) => out.push_str(&format!("Your identity is {}.\n", p.name)),
            None => out.push_str("Your identity is a general assistant.\n"),
        }
        if let Some(tone) = persona.and_then(|p| p.tone.as_deref()) {
            out.push_str(&format!("## Tone\n{tone}\n"));
        }
        if let Some(ctx) = context {
            out.push_str("## Context\n");
            if let Some(depth) = &ctx.depth {
                out.push_str(&format!("- Depth: {depth}\n"));
            }
            if let Some(scope) = &ctx.memory_scope {
                out.push_str(&format!("- Memory scope: {scope}\n"));
            }
        }
        if !anchors.is_empty() {
            out.push_str("## Constraints\n");
            for anchor in anchors {
                out.push_str(&self.compile_anchor_instruction(anchor));
                out.push('\n');
            }
        }
        out
    }

    fn compile_anchor_instruction(&self, anchor: &IRAnchor) -> String {
        let floor = anchor
            .confidence_floor
            .map(|f| format!(" (floor {f})"))
            .unwrap_or_default();
        format!("- **must not** violate `{}`{floor}.", anchor.name)
    }

    fn compile_step(
        &self,
        step: &IRStep,
        system_prompt: &str,
        prior_step_names: &[String],
        run: &IRRun,
    ) -> CompiledStep {
        let _ = prior_step_names;
        match step {
            IRStep::Step(s) => {
                let mut body_out = Vec::new();
                for inner in &s.body {
                    body_out.push(self.compile_step(inner, system_prompt, prior_step_names, run));
                }
                CompiledStep {
                    step_name: s.name.clone(),
                    system_prompt: system_prompt.to_string(),
                    user_prompt: body_out
                        .iter()
                        .map(|c| c.user_prompt.clone())
                        .collect::<Vec<_>>()
                        .join("\n"),
                    output_schema: None,
                    confidence_floor: None,
                    metadata: StepMetadata::None,
                }
            }
            IRStep::Probe(p) => CompiledStep {
                step_name: format!("probe:{}", p.target),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!(
                    "## Probe\nExtract `{}` from **{}**.",
                    p.fields.join("`, `"),
                    p.target
                ),
                output_schema: Some(probe_output_schema(&p.fields, "object")),
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::Reason(r) => CompiledStep {
                step_name: format!("reason:{}", r.topic),
                system_prompt: system_prompt.to_string(),
                user_prompt: reason_prompt(r),
                output_schema: r.output.as_ref().map(|_| serde_json::json!({"type": "object"})),
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::Weave(w) => CompiledStep {
                step_name: format!("weave:{}", w.target),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!(
                    "## Weave\nSynthesize `{}` into **{}**.",
                    w.sources.join("`, `"),
                    w.target
                ),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::UseTool(u) => CompiledStep {
                step_name: format!("use_tool:{}", u.tool_name),
                system_prompt: system_prompt.to_string(),
                user_prompt: String::new(),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::UseTool {
                    tool_name: u.tool_name.clone(),
                    argument: u.argument.clone(),
                },
            },
            IRStep::Refine(r) => CompiledStep {
                step_name: "refine".to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: String::new(),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::Refine(RefineConfig {
                    max_attempts: r.max_attempts,
                    pass_failure_context: r.pass_failure_context,
                    backoff: r.backoff.clone(),
                    on_exhaustion: r.on_exhaustion.clone(),
                }),
            },
            IRStep::Validate(v) => CompiledStep {
                step_name: format!("validate:{}", v.target),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!("## Validate\n`{}` against `{}`.", v.target, v.schema),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::Remember(r) => CompiledStep {
                step_name: "remember".to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!("## Remember\n`{}` = `{}`", r.key, r.value),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::Recall(r) => CompiledStep {
                step_name: "recall".to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!("## Recall\n`{}` (top {})", r.query, r.top_k),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::Conditional(c) => CompiledStep {
                step_name: "if".to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!("## If\n`{}`", c.condition),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
            IRStep::Intent(i) => CompiledStep {
                step_name: format!("intent:{}", i.name),
                system_prompt: system_prompt.to_string(),
                user_prompt: format!("## Intent\n`{}`", i.name),
                output_schema: None,
                confidence_floor: None,
                metadata: StepMetadata::None,
            },
        }
    }
}

fn reason_prompt(r: &IRReason) -> String {
    let mut out = format!("## Reason\nAbout: **{}**.", r.topic);
    if !r.given.is_empty() {
        out.push_str(&format!(" Given: `{}`.", r.given.join("`, `")));
    }
    if let Some(depth) = r.depth {
        out.push_str(&format!(" Depth: {depth}."));
    }
    if r.show_work == Some(true) {
        out.push_str(" Show your work.");
    }
    if let Some(ask) = &r.ask {
        out.push_str(&format!(" {ask}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse;
    use crate::ir::generate;

    #[test]
    fn probe_step_compiles_with_lowercase_object_schema() {
        let program = parse("flow F() { probe Doc for [title] } run F()").unwrap();
        let ir = generate(&program).unwrap();
        let backend = MarkdownBackend;
        let compiled = backend.compile_program(&ir);
        let step = &compiled.units[0].steps[0];
        assert_eq!(step.output_schema.as_ref().unwrap()["type"], "object");
    }

    #[test]
    fn probe_step_matches_expected_compiled_step_exactly() {
        let program = parse("flow F() { probe Doc for [title] } run F()").unwrap();
        let ir = generate(&program).unwrap();
        let compiled = MarkdownBackend.compile_program(&ir);
        let step = compiled.units[0].steps[0].clone();
        let expected = CompiledStep {
            step_name: "probe:Doc".to_string(),
            system_prompt: step.system_prompt.clone(),
            user_prompt: "## Probe\nExtract `title` from **Doc**.".to_string(),
            output_schema: Some(probe_output_schema(&["title".to_string()], "object")),
            confidence_floor: None,
            metadata: StepMetadata::None,
        };
        pretty_assertions::assert_eq!(step, expected);
    }

    #[test]
    fn system_prompt_uses_your_identity_framing() {
        let program =
            parse("persona P { tone: precise } flow F() { probe Doc for [x] } run F() as P")
                .unwrap();
        let ir = generate(&program).unwrap();
        let backend = MarkdownBackend;
        let compiled = backend.compile_program(&ir);
        assert!(compiled.units[0].steps[0]
            .system_prompt
            .starts_with("Your identity is P."));
    }

    #[test]
    fn bracket_and_markdown_units_have_matching_step_counts() {
        use super::super::bracket::BracketBackend;
        let program = parse(
            "flow F() { probe Doc for [x] reason about y { depth: 2 } } run F()",
        )
        .unwrap();
        let ir = generate(&program).unwrap();
        let bracket = BracketBackend.compile_program(&ir);
        let markdown = MarkdownBackend.compile_program(&ir);
        assert_eq!(bracket.units[0].steps.len(), markdown.units[0].steps.len());
    }
}
