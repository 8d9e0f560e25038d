//! Hierarchical execution trace: a span stack plus convenience emitters.
//!
//! The tracer is an observer — `emit` silently drops events when no span is
//! open rather than raising, since tracing must never interrupt execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSpan {
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: f64,
    pub events: Vec<TraceEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TraceSpan {
    fn new(name: impl Into<String>, metadata: Option<Value>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            start_time: now,
            end_time: None,
            duration_ms: 0.0,
            events: Vec::new(),
            children: Vec::new(),
            metadata,
        }
    }

    fn close(&mut self, now: DateTime<Utc>) {
        if self.end_time.is_none() {
            self.end_time = Some(now);
            self.duration_ms = (now - self.start_time).num_milliseconds() as f64;
        }
        for child in &mut self.children {
            child.close(now);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub program_name: String,
    pub backend_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: f64,
    pub total_events: usize,
    pub spans: Vec<TraceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A stack of open spans; completed top-level spans accumulate in `roots`.
/// `now` is injected so the tracer stays deterministic under test.
pub struct Tracer {
    program_name: String,
    backend_name: String,
    start_time: DateTime<Utc>,
    roots: Vec<TraceSpan>,
    stack: Vec<TraceSpan>,
}

impl Tracer {
    pub fn new(program_name: impl Into<String>, backend_name: impl Into<String>) -> Self {
        Self::at(program_name, backend_name, Utc::now())
    }

    pub fn at(
        program_name: impl Into<String>,
        backend_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            program_name: program_name.into(),
            backend_name: backend_name.into(),
            start_time: now,
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn start_span(&mut self, name: impl Into<String>, metadata: Option<Value>) {
        self.stack.push(TraceSpan::new(name, metadata, Utc::now()));
    }

    pub fn start_span_at(
        &mut self,
        name: impl Into<String>,
        metadata: Option<Value>,
        now: DateTime<Utc>,
    ) {
        self.stack.push(TraceSpan::new(name, metadata, now));
    }

    pub fn emit(
        &mut self,
        event_type: impl Into<String>,
        step_name: Option<String>,
        data: Option<Value>,
        duration_ms: Option<f64>,
    ) {
        self.emit_at(event_type, step_name, data, duration_ms, Utc::now());
    }

    pub fn emit_at(
        &mut self,
        event_type: impl Into<String>,
        step_name: Option<String>,
        data: Option<Value>,
        duration_ms: Option<f64>,
        now: DateTime<Utc>,
    ) {
        if let Some(span) = self.stack.last_mut() {
            span.events.push(TraceEvent {
                event_type: event_type.into(),
                timestamp: now,
                step_name,
                data,
                duration_ms,
            });
        }
    }

    pub fn end_span(&mut self) {
        self.end_span_at(Utc::now());
    }

    pub fn end_span_at(&mut self, now: DateTime<Utc>) {
        if let Some(mut span) = self.stack.pop() {
            span.close(now);
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(span),
                None => self.roots.push(span),
            }
        }
    }

    pub fn finalize(mut self) -> ExecutionTrace {
        self.finalize_at(Utc::now())
    }

    pub fn finalize_at(mut self, now: DateTime<Utc>) -> ExecutionTrace {
        while !self.stack.is_empty() {
            self.end_span_at(now);
        }
        let total_events = count_events(&self.roots);
        ExecutionTrace {
            program_name: self.program_name,
            backend_name: self.backend_name,
            start_time: self.start_time,
            end_time: now,
            duration_ms: (now - self.start_time).num_milliseconds() as f64,
            total_events,
            spans: self.roots,
            metadata: None,
        }
    }

    // Convenience emitters.

    pub fn emit_model_call(&mut self, step_name: &str, system_prompt: &str, user_prompt: &str) {
        self.emit(
            "model_call",
            Some(step_name.to_string()),
            Some(serde_json::json!({
                "system_prompt": system_prompt,
                "user_prompt": user_prompt,
            })),
            None,
        );
    }

    pub fn emit_model_response(&mut self, step_name: &str, content: &str) {
        self.emit(
            "model_response",
            Some(step_name.to_string()),
            Some(serde_json::json!({ "content": content })),
            None,
        );
    }

    pub fn emit_anchor_check(&mut self, anchor_name: &str, passed: bool) {
        self.emit(
            "anchor_check",
            None,
            Some(serde_json::json!({ "anchor_name": anchor_name })),
            None,
        );
        let event_type = if passed { "anchor_pass" } else { "anchor_breach" };
        self.emit(
            event_type,
            None,
            Some(serde_json::json!({ "anchor_name": anchor_name })),
            None,
        );
    }

    pub fn emit_validation(&mut self, step_name: &str, passed: bool, violations: &[String]) {
        let event_type = if passed { "validation_pass" } else { "validation_fail" };
        self.emit(
            event_type,
            Some(step_name.to_string()),
            Some(serde_json::json!({ "violations": violations })),
            None,
        );
    }

    pub fn emit_retry_attempt(&mut self, step_name: &str, attempt: i64, error: &str) {
        self.emit(
            "retry_attempt",
            Some(step_name.to_string()),
            Some(serde_json::json!({ "attempt": attempt, "error": error })),
            None,
        );
    }

    pub fn emit_confidence_check(&mut self, step_name: &str, confidence: f64, floor: f64) {
        self.emit(
            "confidence_check",
            Some(step_name.to_string()),
            Some(serde_json::json!({ "confidence": confidence, "floor": floor })),
            None,
        );
    }
}

fn count_events(spans: &[TraceSpan]) -> usize {
    spans
        .iter()
        .map(|s| s.events.len() + count_events(&s.children))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_with_no_open_span_is_dropped_silently() {
        let mut tracer = Tracer::new("p", "bracket");
        tracer.emit("step_start", None, None, None);
        let trace = tracer.finalize();
        assert_eq!(trace.total_events, 0);
    }

    #[test]
    fn finalize_force_closes_remaining_spans() {
        let mut tracer = Tracer::new("p", "bracket");
        tracer.start_span("unit", None);
        tracer.start_span("step", None);
        tracer.emit("step_start", Some("s1".into()), None, None);
        let trace = tracer.finalize();
        assert_eq!(trace.spans.len(), 1);
        assert!(trace.spans[0].end_time.is_some());
        assert!(trace.spans[0].children[0].end_time.is_some());
        assert_eq!(trace.total_events, 1);
    }

    #[test]
    fn child_span_nests_under_parent() {
        let mut tracer = Tracer::new("p", "bracket");
        tracer.start_span("unit", None);
        tracer.start_span("step", None);
        tracer.end_span();
        tracer.end_span();
        let trace = tracer.finalize();
        assert_eq!(trace.spans[0].name, "unit");
        assert_eq!(trace.spans[0].children[0].name, "step");
    }
}
