//! Retry/backoff engine: runs an async operation up to `max_attempts`
//! times, injecting the previous failure into attempts after the first
//! when configured, and sleeping between failures per the chosen backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::runtime::errors::{AxonRuntimeError, ErrorContext};
use crate::runtime::tracer::Tracer;

const LINEAR_BASE_SECS: f64 = 1.0;
const EXPONENTIAL_BASE_SECS: f64 = 0.5;
const EXPONENTIAL_MULTIPLIER: f64 = 2.0;
const MAX_DELAY_SECS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Linear,
    Exponential,
}

impl Backoff {
    pub fn parse(s: &str) -> Self {
        match s {
            "linear" => Backoff::Linear,
            "exponential" => Backoff::Exponential,
            _ => Backoff::None,
        }
    }

    fn delay_secs(self, attempt: i64) -> f64 {
        match self {
            Backoff::None => 0.0,
            Backoff::Linear => (LINEAR_BASE_SECS * attempt as f64).min(MAX_DELAY_SECS),
            Backoff::Exponential => {
                (EXPONENTIAL_BASE_SECS * EXPONENTIAL_MULTIPLIER.powi(attempt as i32))
                    .min(MAX_DELAY_SECS)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: i64,
    pub backoff: Backoff,
    pub pass_failure_context: bool,
    pub on_exhaustion: String,
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt_number: i64,
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
    pub error_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetryResult {
    pub success: bool,
    pub exhausted: bool,
    pub attempts: Vec<AttemptRecord>,
    pub value: Option<String>,
}

/// Runs `op` up to `config.max_attempts` times. `op` receives the previous
/// failure's message as `failure_context` for every attempt after the
/// first, when `config.pass_failure_context` is set.
pub async fn execute_with_retry<F, Fut>(
    mut op: F,
    config: &RetryConfig,
    tracer: &mut Tracer,
    step_name: &str,
    flow_name: &str,
) -> Result<RetryResult, AxonRuntimeError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<String, String>>,
{
    if config.max_attempts > 1 {
        tracer.emit(
            "refine_start",
            Some(step_name.to_string()),
            Some(serde_json::json!({ "max_attempts": config.max_attempts })),
            None,
        );
    }

    let mut attempts = Vec::new();
    let mut last_failure: Option<String> = None;

    for attempt in 1..=config.max_attempts {
        let failure_context = if config.pass_failure_context && attempt > 1 {
            last_failure.clone()
        } else {
            None
        };

        match op(failure_context).await {
            Ok(value) => {
                attempts.push(AttemptRecord {
                    attempt_number: attempt,
                    success: true,
                    result: Some(value.clone()),
                    error: None,
                    error_type: None,
                });
                return Ok(RetryResult {
                    success: true,
                    exhausted: false,
                    attempts,
                    value: Some(value),
                });
            }
            Err(message) => {
                attempts.push(AttemptRecord {
                    attempt_number: attempt,
                    success: false,
                    result: None,
                    error: Some(message.clone()),
                    error_type: Some("operation_error".to_string()),
                });
                tracer.emit_retry_attempt(step_name, attempt, &message);
                last_failure = Some(message);

                if attempt < config.max_attempts {
                    let delay = config.backoff.delay_secs(attempt);
                    if delay > 0.0 {
                        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                    }
                }
            }
        }
    }

    if config.on_exhaustion == "skip" {
        warn!(step_name, flow_name, "refine exhausted, skipping per on_exhaustion=skip");
        return Ok(RetryResult {
            success: false,
            exhausted: true,
            attempts,
            value: None,
        });
    }

    Err(AxonRuntimeError::refine_exhausted(
        last_failure.unwrap_or_default(),
        config.max_attempts,
        ErrorContext::default()
            .step(step_name)
            .flow(flow_name)
            .attempt(config.max_attempts),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test]
    async fn single_successful_attempt_returns_immediately() {
        let mut tracer = Tracer::new("p", "bracket");
        let result = execute_with_retry(
            |_| async { Ok::<_, String>("ok".to_string()) },
            &RetryConfig {
                max_attempts: 3,
                backoff: Backoff::None,
                pass_failure_context: false,
                on_exhaustion: String::new(),
            },
            &mut tracer,
            "s1",
            "f1",
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(result.attempts.len(), 1);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let counter = AtomicI64::new(0);
        let mut tracer = Tracer::new("p", "bracket");
        let result = execute_with_retry(
            |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(format!("fail {n}"))
                    } else {
                        Ok("ok".to_string())
                    }
                }
            },
            &RetryConfig {
                max_attempts: 3,
                backoff: Backoff::None,
                pass_failure_context: false,
                on_exhaustion: String::new(),
            },
            &mut tracer,
            "s1",
            "f1",
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(result.attempts.len(), 3);
        assert!(!result.attempts[0].success);
        assert!(!result.attempts[1].success);
        assert!(result.attempts[2].success);
    }

    #[tokio::test]
    async fn exhaustion_with_skip_returns_failed_result_without_raising() {
        let mut tracer = Tracer::new("p", "bracket");
        let result = execute_with_retry(
            |_| async { Err::<String, _>("always fails".to_string()) },
            &RetryConfig {
                max_attempts: 2,
                backoff: Backoff::None,
                pass_failure_context: false,
                on_exhaustion: "skip".to_string(),
            },
            &mut tracer,
            "s1",
            "f1",
        )
        .await
        .unwrap();
        assert!(result.exhausted);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn exhaustion_without_skip_raises() {
        let mut tracer = Tracer::new("p", "bracket");
        let err = execute_with_retry(
            |_| async { Err::<String, _>("always fails".to_string()) },
            &RetryConfig {
                max_attempts: 2,
                backoff: Backoff::None,
                pass_failure_context: false,
                on_exhaustion: String::new(),
            },
            &mut tracer,
            "s1",
            "f1",
        )
        .await
        .unwrap_err();
        assert_eq!(err.level(), 4);
    }

    #[tokio::test]
    async fn failure_context_only_passed_from_second_attempt_onward() {
        let mut seen = Vec::new();
        let mut tracer = Tracer::new("p", "bracket");
        let _ = execute_with_retry(
            |ctx| {
                seen.push(ctx);
                async { Err::<String, _>("nope".to_string()) }
            },
            &RetryConfig {
                max_attempts: 2,
                backoff: Backoff::None,
                pass_failure_context: true,
                on_exhaustion: "skip".to_string(),
            },
            &mut tracer,
            "s1",
            "f1",
        )
        .await;
        assert_eq!(seen[0], None);
        assert_eq!(seen[1], Some("nope".to_string()));
    }

    #[test]
    fn backoff_delays_are_monotonically_nondecreasing() {
        let d1 = Backoff::Exponential.delay_secs(1);
        let d2 = Backoff::Exponential.delay_secs(2);
        assert!(d2 >= d1);
    }
}
