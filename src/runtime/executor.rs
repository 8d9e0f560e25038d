//! Executes a `CompiledProgram` unit by unit, step by step, wiring the
//! context manager, tracer, memory backend, retry engine, semantic
//! validator, and tool dispatcher together per the step lifecycle.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::backend::contract::{CompiledExecutionUnit, CompiledProgram, CompiledStep, StepMetadata};
use crate::runtime::context_manager::ContextManager;
use crate::runtime::errors::{AxonRuntimeError, ErrorContext};
use crate::runtime::memory_backend::{InMemoryBackend, MemoryBackend};
use crate::runtime::retry_engine::{execute_with_retry, Backoff, RetryConfig};
use crate::runtime::semantic_validator::{validate, ValidationSpec};
use crate::runtime::tools::{RuntimeToolRegistry, ToolDispatcher};
use crate::runtime::tracer::{ExecutionTrace, Tracer};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub structured: Option<Value>,
    pub tool_calls: Vec<Value>,
    pub confidence: Option<f64>,
    pub usage: ModelUsage,
    pub raw: Value,
}

/// The model client contract. Errors are wrapped by the executor into
/// `ModelCallError` with step/flow context.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        effort: Option<&str>,
        failure_context: Option<&str>,
    ) -> Result<ModelResponse, String>;
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_name: String,
    pub response: Option<ModelResponse>,
}

#[derive(Debug, Clone)]
pub struct UnitResult {
    pub flow_name: String,
    pub success: bool,
    pub error: Option<String>,
    pub step_results: Vec<StepResult>,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub unit_results: Vec<UnitResult>,
    pub duration_ms: f64,
}

pub struct Executor {
    model: Arc<dyn ModelClient>,
    tool_registry: Arc<Mutex<RuntimeToolRegistry>>,
    memory: Arc<dyn MemoryBackend>,
}

impl Executor {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tool_registry: Arc<Mutex<RuntimeToolRegistry>>,
        memory: Arc<dyn MemoryBackend>,
    ) -> Self {
        Self {
            model,
            tool_registry,
            memory,
        }
    }

    pub fn with_in_memory_backend(
        model: Arc<dyn ModelClient>,
        tool_registry: Arc<Mutex<RuntimeToolRegistry>>,
    ) -> Self {
        Self::new(model, tool_registry, Arc::new(InMemoryBackend::new()))
    }

    pub async fn execute(
        &self,
        program: &CompiledProgram,
        program_name: &str,
    ) -> (ExecutionResult, ExecutionTrace) {
        let start = Instant::now();
        let mut tracer = Tracer::new(program_name, &program.backend_name);
        let mut unit_results = Vec::new();

        for unit in &program.units {
            unit_results.push(self.execute_unit(unit, &mut tracer).await);
        }

        let success = unit_results.iter().all(|u| u.success);
        let trace = tracer.finalize();
        (
            ExecutionResult {
                success,
                unit_results,
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
            trace,
        )
    }

    async fn execute_unit(&self, unit: &CompiledExecutionUnit, tracer: &mut Tracer) -> UnitResult {
        tracer.start_span(format!("run:{}", unit.flow_name), None);
        let mut ctx = ContextManager::new(
            unit.steps
                .first()
                .map(|s| s.system_prompt.clone())
                .unwrap_or_default(),
        );

        let mut step_results = Vec::new();
        let mut failure = None;

        for step in &unit.steps {
            match self
                .execute_step(step, &mut ctx, tracer, &unit.flow_name, &unit.anchor_names)
                .await
            {
                Ok(result) => step_results.push(result),
                Err(err) => {
                    tracer.emit(
                        "runtime_error",
                        Some(step.step_name.clone()),
                        Some(serde_json::json!({ "message": err.to_string(), "level": err.level() })),
                        None,
                    );
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        tracer.end_span();
        UnitResult {
            flow_name: unit.flow_name.clone(),
            success: failure.is_none(),
            error: failure,
            step_results,
        }
    }

    async fn execute_step(
        &self,
        step: &CompiledStep,
        ctx: &mut ContextManager,
        tracer: &mut Tracer,
        flow_name: &str,
        anchor_names: &[String],
    ) -> Result<StepResult, AxonRuntimeError> {
        let start = Instant::now();
        tracer.emit("step_start", Some(step.step_name.clone()), None, None);
        ctx.set_current_step(&step.step_name)?;

        let response = if let StepMetadata::UseTool { tool_name, argument } = &step.metadata {
            let mut registry = self.tool_registry.lock().await;
            let result = ToolDispatcher::dispatch(&mut registry, tool_name, "{}", argument).await;
            let content = serde_json::to_string(&result.data).unwrap_or_default();
            ModelResponse {
                content,
                structured: result.data.clone(),
                tool_calls: Vec::new(),
                confidence: None,
                usage: ModelUsage::default(),
                raw: serde_json::to_value(&result).unwrap_or(Value::Null),
            }
        } else {
            let user_prompt = ctx.build_user_prompt(&step.user_prompt);
            let response = self
                .call_model_with_refine(step, &user_prompt, ctx, tracer, flow_name)
                .await?;
            response
        };

        self.run_anchor_checks(tracer, anchor_names);

        if step.output_schema.is_some() || step.confidence_floor.is_some() {
            let target = response.structured.clone().unwrap_or(Value::String(response.content.clone()));
            let spec = ValidationSpec {
                confidence_floor: step.confidence_floor,
                ..Default::default()
            };
            let result = validate(&target, &spec);
            tracer.emit_validation(&step.step_name, result.is_valid, &result.violations);
        }

        let effective = response
            .structured
            .clone()
            .map(|v| v.to_string())
            .unwrap_or_else(|| response.content.clone());
        ctx.record_step_result(&step.step_name, effective)?;

        tracer.emit(
            "step_end",
            Some(step.step_name.clone()),
            None,
            Some(start.elapsed().as_secs_f64() * 1000.0),
        );

        Ok(StepResult {
            step_name: step.step_name.clone(),
            response: Some(response),
        })
    }

    async fn call_model_with_refine(
        &self,
        step: &CompiledStep,
        user_prompt: &str,
        ctx: &mut ContextManager,
        tracer: &mut Tracer,
        flow_name: &str,
    ) -> Result<ModelResponse, AxonRuntimeError> {
        let refine = match &step.metadata {
            StepMetadata::Refine(cfg) if cfg.max_attempts > 1 => Some(cfg.clone()),
            _ => None,
        };

        match refine {
            None => {
                tracer.emit_model_call(&step.step_name, &step.system_prompt, user_prompt);
                let _ = ctx.push_message(crate::runtime::context_manager::Role::User, user_prompt);
                let response = self
                    .model
                    .call(&step.system_prompt, user_prompt, None, None)
                    .await
                    .map_err(|e| {
                        AxonRuntimeError::model_call(
                            e,
                            ErrorContext::default().step(&step.step_name).flow(flow_name),
                        )
                    })?;
                tracer.emit_model_response(&step.step_name, &response.content);
                Ok(response)
            }
            Some(cfg) => {
                let model = Arc::clone(&self.model);
                let system_prompt = step.system_prompt.clone();
                let prompt = user_prompt.to_string();
                let step_name = step.step_name.clone();
                let retry_cfg = RetryConfig {
                    max_attempts: cfg.max_attempts,
                    backoff: Backoff::parse(&cfg.backoff),
                    pass_failure_context: cfg.pass_failure_context,
                    on_exhaustion: cfg.on_exhaustion.clone(),
                };
                let last_response: Arc<Mutex<Option<ModelResponse>>> = Arc::new(Mutex::new(None));
                let last_response_clone = Arc::clone(&last_response);

                let result = execute_with_retry(
                    move |failure_context| {
                        let model = Arc::clone(&model);
                        let system_prompt = system_prompt.clone();
                        let prompt = prompt.clone();
                        let last_response = Arc::clone(&last_response_clone);
                        async move {
                            match model
                                .call(&system_prompt, &prompt, None, failure_context.as_deref())
                                .await
                            {
                                Ok(response) => {
                                    *last_response.lock().await = Some(response.clone());
                                    Ok(response.content)
                                }
                                Err(e) => Err(e),
                            }
                        }
                    },
                    &retry_cfg,
                    tracer,
                    &step_name,
                    flow_name,
                )
                .await?;

                if result.success {
                    let response = last_response.lock().await.clone().expect("success implies a recorded response");
                    tracer.emit_model_response(&step.step_name, &response.content);
                    Ok(response)
                } else {
                    Ok(ModelResponse {
                        content: String::new(),
                        structured: None,
                        tool_calls: Vec::new(),
                        confidence: None,
                        usage: ModelUsage::default(),
                        raw: Value::Null,
                    })
                }
            }
        }
    }

    /// Placeholder anchor checks: always pass. The full entailment-based
    /// check is future work; this still records the trace events a real
    /// check would.
    fn run_anchor_checks(&self, tracer: &mut Tracer, anchor_names: &[String]) {
        // TODO: replace with an NLI-based entailment check against each
        // declared anchor once a grounding model is available.
        for anchor_name in anchor_names {
            tracer.emit_anchor_check(anchor_name, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BracketBackend};
    use crate::compiler::parser::parse;
    use crate::ir::generate;

    struct EchoClient;

    #[async_trait]
    impl ModelClient for EchoClient {
        async fn call(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _effort: Option<&str>,
            _failure_context: Option<&str>,
        ) -> Result<ModelResponse, String> {
            Ok(ModelResponse {
                content: format!("Response to: {user_prompt}"),
                structured: None,
                tool_calls: Vec::new(),
                confidence: Some(0.95),
                usage: ModelUsage::default(),
                raw: Value::Null,
            })
        }
    }

    #[tokio::test]
    async fn full_compile_and_execute_smoke() {
        let source = r#"
            persona Expert { tone: precise }
            anchor NoSpeculation { confidence_floor: 0.5 }
            flow Answer() {
                step intro {
                    reason about "the question" { ask: "What is 2+2?" }
                }
            }
            run Answer() as Expert constrained_by [NoSpeculation]
        "#;
        let program = parse(source).unwrap();
        let ir = generate(&program).unwrap();
        let compiled = BracketBackend.compile_program(&ir);

        let registry = Arc::new(Mutex::new(crate::runtime::tools::create_default_registry(
            crate::runtime::tools::ToolMode::Stub,
            None,
        )));
        let executor = Executor::with_in_memory_backend(Arc::new(EchoClient), registry);
        let (result, trace) = executor.execute(&compiled, "smoke").await;

        assert!(result.success);
        assert_eq!(result.unit_results.len(), 1);
        let event_types: Vec<&str> = trace.spans[0]
            .children
            .iter()
            .flat_map(|c| c.events.iter())
            .map(|e| e.event_type.as_str())
            .collect();
        assert!(event_types.contains(&"step_start"));
        assert!(event_types.contains(&"model_call"));
        assert!(event_types.contains(&"model_response"));
        assert!(event_types.contains(&"anchor_check"));
        assert!(event_types.contains(&"anchor_pass"));
        assert!(event_types.contains(&"step_end"));
    }

    #[tokio::test]
    async fn use_tool_step_routes_around_the_model_client() {
        let source = r#"
            tool Calculator { max_results: 1 }
            flow Compute() {
                use Calculator("2 + 2")
            }
            run Compute()
        "#;
        let program = parse(source).unwrap();
        let ir = generate(&program).unwrap();
        let compiled = BracketBackend.compile_program(&ir);

        let registry = Arc::new(Mutex::new(crate::runtime::tools::create_default_registry(
            crate::runtime::tools::ToolMode::Stub,
            None,
        )));
        let executor = Executor::with_in_memory_backend(Arc::new(EchoClient), registry);
        let (result, _trace) = executor.execute(&compiled, "tool-smoke").await;
        assert!(result.success);
    }
}
