//! Two-pass semantic validator. Never raises — accumulates structured
//! findings so a caller sees every problem in one compilation.

use std::collections::{HashMap, HashSet};

use super::ast::*;
use super::errors::{Severity, TypeErrorEntry};
use super::tokens::Position;

/// Four mutually exclusive epistemic-lattice categories, restated from the
/// reference `semantic_validator.py` membership sets.
pub fn epistemic_types() -> HashSet<&'static str> {
    ["FactualClaim", "Opinion", "Uncertainty", "Speculation"].into_iter().collect()
}

pub fn content_types() -> HashSet<&'static str> {
    ["Document", "Chunk", "EntityMap", "Summary", "Translation"].into_iter().collect()
}

pub fn analysis_types() -> HashSet<&'static str> {
    ["RiskScore", "ConfidenceScore", "SentimentScore", "ReasoningChain", "Contradiction"]
        .into_iter()
        .collect()
}

pub fn compound_types() -> HashSet<&'static str> {
    ["StructuredReport"].into_iter().collect()
}

pub fn ranged_type_bounds() -> HashMap<&'static str, (f64, f64)> {
    HashMap::from([
        ("RiskScore", (0.0, 1.0)),
        ("ConfidenceScore", (0.0, 1.0)),
        ("SentimentScore", (-1.0, 1.0)),
    ])
}

pub fn builtin_types() -> HashSet<&'static str> {
    let mut set: HashSet<&'static str> = epistemic_types()
        .into_iter()
        .chain(content_types())
        .chain(analysis_types())
        .chain(compound_types())
        .collect();
    set.extend(["String", "Integer", "Float", "Boolean", "CitedFact"]);
    set
}

/// Applies the epistemic-lattice substitution rules in the order specified:
/// identity, Uncertainty-propagates-everywhere, hard incompatibility table,
/// explicit compatibility table, `StructuredReport` satisfies anything,
/// nominal fallback.
pub fn check_type_compatible(source: &str, target: &str) -> bool {
    if source == target {
        return true;
    }
    if source == "Uncertainty" {
        return true;
    }

    let hard_incompatible: &[(&str, &str)] = &[
        ("Opinion", "FactualClaim"),
        ("Opinion", "CitedFact"),
        ("Speculation", "FactualClaim"),
        ("Speculation", "CitedFact"),
        ("Float", "RiskScore"),
        ("Float", "ConfidenceScore"),
        ("Float", "SentimentScore"),
    ];
    if hard_incompatible.contains(&(source, target)) {
        return false;
    }

    let explicit_compatible: &[(&str, &str)] = &[
        ("FactualClaim", "String"),
        ("FactualClaim", "CitedFact"),
        ("RiskScore", "Float"),
        ("ConfidenceScore", "Float"),
        ("SentimentScore", "Float"),
    ];
    if explicit_compatible.contains(&(source, target)) {
        return true;
    }

    if source == "StructuredReport" {
        return true;
    }

    false
}

const TONE_SET: &[&str] = &[
    "precise", "friendly", "formal", "casual", "analytical", "diplomatic", "assertive", "empathetic",
];
const MEMORY_SCOPE_SET: &[&str] = &["session", "persistent", "none", "ephemeral"];
const DEPTH_SET: &[&str] = &["shallow", "standard", "deep", "exhaustive"];
const ON_VIOLATION_SET: &[&str] = &["raise", "warn", "log", "escalate", "fallback"];
const MEMORY_RETRIEVAL_SET: &[&str] = &["semantic", "exact", "hybrid"];
const BACKOFF_SET: &[&str] = &["none", "linear", "exponential"];
const EFFORT_SET: &[&str] = &["low", "medium", "high", "max"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SymbolKind {
    Persona,
    Context,
    Anchor,
    Memory,
    Tool,
    Type,
    Flow,
    Intent,
}

struct Symbol {
    kind: SymbolKind,
}

pub struct TypeChecker<'a> {
    program: &'a Program,
    symbols: HashMap<String, Symbol>,
    errors: Vec<TypeErrorEntry>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            symbols: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn check(mut self) -> Vec<TypeErrorEntry> {
        self.register_symbols();
        for decl in &self.program.declarations {
            self.check_decl(decl);
        }
        for warning in &self.program.warnings {
            self.errors.push(TypeErrorEntry::warning(
                format!("unrecognized field '{}'", warning.field),
                Position::new(warning.line, warning.column),
                "unknown-field",
            ));
        }
        self.errors
    }

    fn register_symbols(&mut self) {
        for decl in &self.program.declarations {
            let (name, kind) = match decl {
                Decl::Persona(d) => (d.name.clone(), SymbolKind::Persona),
                Decl::Context(d) => (d.name.clone(), SymbolKind::Context),
                Decl::Anchor(d) => (d.name.clone(), SymbolKind::Anchor),
                Decl::Memory(d) => (d.name.clone(), SymbolKind::Memory),
                Decl::Tool(d) => (d.name.clone(), SymbolKind::Tool),
                Decl::Type(d) => (d.name.clone(), SymbolKind::Type),
                Decl::Flow(d) => (d.name.clone(), SymbolKind::Flow),
                Decl::Intent(d) => (d.name.clone(), SymbolKind::Intent),
                Decl::Import(_) | Decl::Run(_) => continue,
            };
            if self.symbols.contains_key(&name) {
                self.errors.push(TypeErrorEntry::error(
                    format!("duplicate declaration '{name}'"),
                    Position::start(),
                    "duplicate-name",
                ));
                continue;
            }
            self.symbols.insert(name, Symbol { kind });
        }
    }

    fn err(&mut self, message: impl Into<String>, pos: Position, code: &str) {
        self.errors.push(TypeErrorEntry::error(message, pos, code));
    }

    fn resolves_to(&self, name: &str, kind: SymbolKind) -> bool {
        self.symbols.get(name).map(|s| s.kind == kind).unwrap_or(false)
    }

    fn check_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Persona(p) => self.check_persona(p),
            Decl::Context(c) => self.check_context(c),
            Decl::Anchor(a) => self.check_anchor(a),
            Decl::Memory(m) => self.check_memory(m),
            Decl::Tool(t) => self.check_tool(t),
            Decl::Type(t) => self.check_type_decl(t),
            Decl::Intent(i) => self.check_intent(i),
            Decl::Flow(f) => self.check_flow(f),
            Decl::Run(r) => self.check_run(r),
            Decl::Import(_) => {}
        }
    }

    fn check_persona(&mut self, p: &PersonaDecl) {
        if let Some(tone) = &p.tone {
            if !TONE_SET.contains(&tone.as_str()) {
                self.err(format!("persona '{}' has invalid tone '{tone}'", p.name), p.pos, "invalid-tone");
            }
        }
        if let Some(threshold) = p.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                self.err(
                    format!("persona '{}' confidence_threshold must be in [0,1]", p.name),
                    p.pos,
                    "range",
                );
            }
        }
    }

    fn check_context(&mut self, c: &ContextDecl) {
        if let Some(scope) = &c.memory_scope {
            if !MEMORY_SCOPE_SET.contains(&scope.as_str()) {
                self.err(format!("context '{}' has invalid memory_scope '{scope}'", c.name), c.pos, "invalid-enum");
            }
        }
        if let Some(depth) = &c.depth {
            if !DEPTH_SET.contains(&depth.as_str()) {
                self.err(format!("context '{}' has invalid depth '{depth}'", c.name), c.pos, "invalid-enum");
            }
        }
        if let Some(temp) = c.temperature {
            if !(0.0..=2.0).contains(&temp) {
                self.err(format!("context '{}' temperature must be in [0,2]", c.name), c.pos, "range");
            }
        }
        if let Some(max_tokens) = c.max_tokens {
            if max_tokens <= 0 {
                self.err(format!("context '{}' max_tokens must be > 0", c.name), c.pos, "range");
            }
        }
    }

    fn check_anchor(&mut self, a: &AnchorDecl) {
        if let Some(floor) = a.confidence_floor {
            if !(0.0..=1.0).contains(&floor) {
                self.err(format!("anchor '{}' confidence_floor must be in [0,1]", a.name), a.pos, "range");
            }
        }
        if let Some(violation) = &a.on_violation {
            if !ON_VIOLATION_SET.contains(&violation.as_str()) {
                self.err(format!("anchor '{}' has invalid on_violation '{violation}'", a.name), a.pos, "invalid-enum");
            }
            if violation == "raise" && a.target.as_deref().unwrap_or("").is_empty() {
                self.err(format!("anchor '{}' on_violation: raise requires a target", a.name), a.pos, "missing-target");
            }
        }
    }

    fn check_memory(&mut self, m: &MemoryDecl) {
        if let Some(store) = &m.store {
            if !MEMORY_SCOPE_SET.contains(&store.as_str()) {
                self.err(format!("memory '{}' has invalid store '{store}'", m.name), m.pos, "invalid-enum");
            }
        }
        if let Some(retrieval) = &m.retrieval {
            if !MEMORY_RETRIEVAL_SET.contains(&retrieval.as_str()) {
                self.err(format!("memory '{}' has invalid retrieval '{retrieval}'", m.name), m.pos, "invalid-enum");
            }
        }
    }

    fn check_tool(&mut self, t: &ToolDecl) {
        if let Some(max_results) = t.max_results {
            if max_results <= 0 {
                self.err(format!("tool '{}' max_results must be > 0", t.name), t.pos, "range");
            }
        }
    }

    fn check_type_decl(&mut self, t: &TypeDecl) {
        if let (Some(min), Some(max)) = (t.min, t.max) {
            if !(min < max) {
                self.err(format!("type '{}' requires min < max", t.name), t.pos, "range");
            }
        }
        // Unresolved field type names are permitted: late binding.
    }

    fn check_intent(&mut self, i: &IntentDecl) {
        if i.ask.is_empty() {
            self.err(format!("intent '{}' requires a non-empty ask", i.name), i.pos, "missing-field");
        }
        if let Some(output_type) = &i.output_type {
            if !builtin_types().contains(output_type.as_str()) && !self.symbols.contains_key(output_type) {
                // late binding permitted; unresolved is not itself an error
                let _ = output_type;
            }
        }
    }

    fn check_flow(&mut self, f: &FlowDecl) {
        let mut seen_steps = HashSet::new();
        self.check_step_sequence(&f.steps, &mut seen_steps);
    }

    fn check_step_sequence(&mut self, steps: &[Step], seen: &mut HashSet<String>) {
        for step in steps {
            match step {
                Step::Step(s) => {
                    if !seen.insert(s.name.clone()) {
                        self.err(format!("duplicate step name '{}'", s.name), s.pos, "duplicate-step");
                    }
                    self.check_step_sequence(&s.body, seen);
                }
                Step::Probe(p) => {
                    if p.fields.is_empty() {
                        self.err("probe requires a non-empty field list", p.pos, "missing-field");
                    }
                }
                Step::Reason(r) => {
                    if r.depth.is_some_and(|d| d < 1) {
                        self.err("reason depth must be >= 1", r.pos, "range");
                    }
                }
                Step::Weave(w) => {
                    if w.sources.len() < 2 {
                        self.err("weave requires at least 2 sources", w.pos, "range");
                    }
                }
                Step::Validate(v) => {
                    if v.rules.is_empty() {
                        self.err("validate requires a non-empty rule list", v.pos, "missing-field");
                    }
                    for rule in &v.rules {
                        if let ValidateAction::Refine(refine) = &rule.action {
                            self.check_refine(refine);
                        }
                    }
                }
                Step::Refine(r) => self.check_refine(r),
                Step::UseTool(u) => {
                    if !self.resolves_to(&u.tool_name, SymbolKind::Tool) {
                        // Late resolution is handled at IR generation (static
                        // tool verification); the type checker does not
                        // require tools to exist yet.
                    }
                }
                Step::Conditional(c) => {
                    self.check_step_sequence(&c.then_body, seen);
                    self.check_step_sequence(&c.else_body, seen);
                }
                Step::Remember(_) | Step::Recall(_) | Step::Intent(_) => {}
            }
        }
    }

    fn check_refine(&mut self, r: &RefineNode) {
        if r.max_attempts.is_some_and(|n| n < 1) {
            self.err("refine max_attempts must be >= 1", r.pos, "range");
        }
        if let Some(backoff) = &r.backoff {
            if !BACKOFF_SET.contains(&backoff.as_str()) {
                self.err(format!("refine has invalid backoff '{backoff}'"), r.pos, "invalid-enum");
            }
        }
    }

    fn check_run(&mut self, r: &RunDecl) {
        if !self.resolves_to(&r.flow_name, SymbolKind::Flow) {
            self.err(format!("run references unknown flow '{}'", r.flow_name), r.pos, "unresolved");
        }
        if let Some(persona) = &r.persona_name {
            if !persona.is_empty() && !self.resolves_to(persona, SymbolKind::Persona) {
                self.err(format!("run references unknown persona '{persona}'"), r.pos, "unresolved");
            }
        }
        if let Some(context) = &r.context_name {
            if !context.is_empty() && !self.resolves_to(context, SymbolKind::Context) {
                self.err(format!("run references unknown context '{context}'"), r.pos, "unresolved");
            }
        }
        for anchor in &r.anchor_names {
            if !self.resolves_to(anchor, SymbolKind::Anchor) {
                self.err(format!("run references unknown anchor '{anchor}'"), r.pos, "unresolved");
            }
        }
        if let Some(effort) = &r.effort {
            if !EFFORT_SET.contains(&effort.as_str()) {
                self.err(format!("run has invalid effort '{effort}'"), r.pos, "invalid-enum");
            }
        }
    }
}

pub fn check(program: &Program) -> Vec<TypeErrorEntry> {
    TypeChecker::new(program).check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse;

    #[test]
    fn check_type_compatible_is_reflexive() {
        for t in builtin_types() {
            assert!(check_type_compatible(t, t), "{t} should be compatible with itself");
        }
    }

    proptest::proptest! {
        #[test]
        fn check_type_compatible_reflexive_over_builtin_sample(idx in 0usize..builtin_types().len()) {
            let mut names: Vec<&'static str> = builtin_types().into_iter().collect();
            names.sort_unstable();
            let t = names[idx % names.len()];
            proptest::prop_assert!(check_type_compatible(t, t));
        }
    }

    #[test]
    fn opinion_cannot_substitute_for_factual_claim() {
        assert!(!check_type_compatible("Opinion", "FactualClaim"));
    }

    #[test]
    fn uncertainty_is_compatible_with_everything() {
        assert!(check_type_compatible("Uncertainty", "FactualClaim"));
        assert!(check_type_compatible("Uncertainty", "RiskScore"));
    }

    #[test]
    fn structured_report_satisfies_any_target() {
        assert!(check_type_compatible("StructuredReport", "FactualClaim"));
    }

    #[test]
    fn clean_persona_program_has_zero_errors() {
        let program = parse("persona Expert { tone: precise }").unwrap();
        let errors = check(&program);
        assert!(errors.iter().all(|e| e.severity != Severity::Error));
    }

    #[test]
    fn invalid_tone_is_flagged() {
        let program = parse("persona Expert { tone: grumpy }").unwrap();
        let errors = check(&program);
        assert!(errors.iter().any(|e| e.code == "invalid-tone"));
    }

    #[test]
    fn duplicate_step_names_are_flagged() {
        let source = "flow F() { step A { probe X for [f] } step A { probe X for [f] } }";
        let program = parse(source).unwrap();
        let errors = check(&program);
        assert!(errors.iter().any(|e| e.code == "duplicate-step"));
    }

    #[test]
    fn run_referencing_unknown_flow_is_flagged() {
        let program = parse("run Ghost()").unwrap();
        let errors = check(&program);
        assert!(errors.iter().any(|e| e.code == "unresolved"));
    }
}
