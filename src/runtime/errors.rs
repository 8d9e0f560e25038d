//! Runtime error taxonomy: six `AxonRuntimeError` levels sharing a
//! structured `ErrorContext`, mirroring the teacher's `thiserror`-based
//! `Error` enum with helper constructors.

use serde::Serialize;
use thiserror::Error;

/// Optional context attached to every runtime error. Empty fields are
/// omitted from JSON serialization rather than emitted as `null`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn step(mut self, name: impl Into<String>) -> Self {
        self.step_name = Some(name.into());
        self
    }
    pub fn flow(mut self, name: impl Into<String>) -> Self {
        self.flow_name = Some(name.into());
        self
    }
    pub fn attempt(mut self, n: i64) -> Self {
        self.attempt = Some(n);
        self
    }
    pub fn expected_type(mut self, t: impl Into<String>) -> Self {
        self.expected_type = Some(t.into());
        self
    }
    pub fn actual_value(mut self, v: impl Into<String>) -> Self {
        self.actual_value = Some(v.into());
        self
    }
    pub fn anchor_name(mut self, name: impl Into<String>) -> Self {
        self.anchor_name = Some(name.into());
        self
    }
    pub fn details(mut self, d: impl Into<String>) -> Self {
        self.details = Some(d.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum AxonRuntimeError {
    #[error("output type contract violated: {message}")]
    Validation {
        message: String,
        context: ErrorContext,
    },
    #[error("confidence below floor: {message}")]
    Confidence {
        message: String,
        context: ErrorContext,
    },
    #[error("anchor breach: {message}")]
    AnchorBreach {
        message: String,
        context: ErrorContext,
    },
    #[error("refine exhausted after {attempts} attempts: {message}")]
    RefineExhausted {
        message: String,
        attempts: i64,
        context: ErrorContext,
    },
    #[error("model call failed: {message}")]
    ModelCall {
        message: String,
        context: ErrorContext,
    },
    #[error("execution timed out: {message}")]
    ExecutionTimeout {
        message: String,
        context: ErrorContext,
    },
}

impl AxonRuntimeError {
    /// The numeric severity level from 1 (validation) to 6 (timeout).
    pub fn level(&self) -> u8 {
        match self {
            AxonRuntimeError::Validation { .. } => 1,
            AxonRuntimeError::Confidence { .. } => 2,
            AxonRuntimeError::AnchorBreach { .. } => 3,
            AxonRuntimeError::RefineExhausted { .. } => 4,
            AxonRuntimeError::ModelCall { .. } => 5,
            AxonRuntimeError::ExecutionTimeout { .. } => 6,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            AxonRuntimeError::Validation { context, .. }
            | AxonRuntimeError::Confidence { context, .. }
            | AxonRuntimeError::AnchorBreach { context, .. }
            | AxonRuntimeError::RefineExhausted { context, .. }
            | AxonRuntimeError::ModelCall { context, .. }
            | AxonRuntimeError::ExecutionTimeout { context, .. } => context,
        }
    }

    pub fn validation(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Validation {
            message: message.into(),
            context,
        }
    }

    pub fn confidence(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Confidence {
            message: message.into(),
            context,
        }
    }

    pub fn anchor_breach(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::AnchorBreach {
            message: message.into(),
            context,
        }
    }

    pub fn refine_exhausted(
        message: impl Into<String>,
        attempts: i64,
        context: ErrorContext,
    ) -> Self {
        Self::RefineExhausted {
            message: message.into(),
            attempts,
            context,
        }
    }

    pub fn model_call(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ModelCall {
            message: message.into(),
            context,
        }
    }

    pub fn execution_timeout(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ExecutionTimeout {
            message: message.into(),
            context,
        }
    }
}

pub type RuntimeResult<T> = std::result::Result<T, AxonRuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_match_taxonomy_order() {
        let ctx = ErrorContext::default();
        assert_eq!(AxonRuntimeError::validation("x", ctx.clone()).level(), 1);
        assert_eq!(AxonRuntimeError::confidence("x", ctx.clone()).level(), 2);
        assert_eq!(AxonRuntimeError::anchor_breach("x", ctx.clone()).level(), 3);
        assert_eq!(
            AxonRuntimeError::refine_exhausted("x", 3, ctx.clone()).level(),
            4
        );
        assert_eq!(AxonRuntimeError::model_call("x", ctx.clone()).level(), 5);
        assert_eq!(AxonRuntimeError::execution_timeout("x", ctx).level(), 6);
    }

    #[test]
    fn empty_context_serializes_to_empty_object() {
        let ctx = ErrorContext::default();
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn populated_context_omits_absent_fields() {
        let ctx = ErrorContext::default().step("s1").attempt(2);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["step_name"], "s1");
        assert_eq!(json["attempt"], 2);
        assert!(json.get("flow_name").is_none());
    }
}
