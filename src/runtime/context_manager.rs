//! Per-unit mutable execution state: step results, messages, variables,
//! and the `{{step_name}}` template substitution used to build later
//! prompts from earlier step results.

use std::collections::HashMap;

use crate::runtime::errors::{AxonRuntimeError, ErrorContext};

/// Insertion-ordered string map. Flows carry a handful of steps at most, so
/// a linear scan beats pulling in an ordered-map dependency for this.
#[derive(Debug, Clone, Default)]
struct OrderedMap(Vec<(String, String)>);

impl OrderedMap {
    fn insert(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.iter().map(|(k, _)| k)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub system_prompt: String,
    pub step_results: Vec<(String, String)>,
    pub variables: HashMap<String, String>,
    pub messages: Vec<Message>,
    pub current_step: Option<String>,
}

pub struct ContextManager {
    system_prompt: String,
    step_results: OrderedMap,
    variables: HashMap<String, String>,
    messages: Vec<Message>,
    current_step: Option<String>,
}

impl ContextManager {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            step_results: OrderedMap::default(),
            variables: HashMap::new(),
            messages: Vec::new(),
            current_step: None,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_current_step(&mut self, name: &str) -> Result<(), AxonRuntimeError> {
        if name.is_empty() {
            return Err(AxonRuntimeError::validation(
                "step name must not be empty",
                ErrorContext::default(),
            ));
        }
        self.current_step = Some(name.to_string());
        Ok(())
    }

    pub fn record_step_result(
        &mut self,
        name: &str,
        result: impl Into<String>,
    ) -> Result<(), AxonRuntimeError> {
        if name.is_empty() {
            return Err(AxonRuntimeError::validation(
                "step name must not be empty",
                ErrorContext::default(),
            ));
        }
        self.step_results.insert(name.to_string(), result.into());
        Ok(())
    }

    pub fn step_result(&self, name: &str) -> Result<&str, AxonRuntimeError> {
        self.step_results.get(name).ok_or_else(|| {
            AxonRuntimeError::validation(
                format!(
                    "unknown step '{name}'. known steps: {}",
                    known_names(self.step_results.keys())
                ),
                ErrorContext::default(),
            )
        })
    }

    pub fn set_variable(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), AxonRuntimeError> {
        if name.is_empty() {
            return Err(AxonRuntimeError::validation(
                "variable name must not be empty",
                ErrorContext::default(),
            ));
        }
        self.variables.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Result<&str, AxonRuntimeError> {
        self.variables.get(name).map(|s| s.as_str()).ok_or_else(|| {
            AxonRuntimeError::validation(
                format!(
                    "unknown variable '{name}'. known variables: {}",
                    known_names(self.variables.keys())
                ),
                ErrorContext::default(),
            )
        })
    }

    pub fn push_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<(), AxonRuntimeError> {
        let content = content.into();
        if content.is_empty() {
            return Err(AxonRuntimeError::validation(
                "message content must not be empty",
                ErrorContext::default(),
            ));
        }
        self.messages.push(Message { role, content });
        Ok(())
    }

    /// Substitutes every `{{step_name}}` occurrence in `template` with the
    /// stringified result of that step. Unknown placeholders are left as-is
    /// — only completed prior steps participate, matching source-order
    /// visibility (`build_user_prompt` sees only steps at index < current).
    pub fn build_user_prompt(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let bytes = template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
                if let Some(end) = template[i + 2..].find("}}") {
                    let name = &template[i + 2..i + 2 + end];
                    match self.step_results.get(name) {
                        Some(value) => {
                            out.push_str(value);
                            i += 2 + end + 2;
                            continue;
                        }
                        None => {
                            out.push_str(&template[i..i + 2 + end + 2]);
                            i += 2 + end + 2;
                            continue;
                        }
                    }
                }
            }
            out.push(bytes[i] as char);
            i += 1;
        }
        out
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            system_prompt: self.system_prompt.clone(),
            step_results: self.step_results.0.clone(),
            variables: self.variables.clone(),
            messages: self.messages.clone(),
            current_step: self.current_step.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.step_results.clear();
        self.variables.clear();
        self.messages.clear();
        self.current_step = None;
    }
}

fn known_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let mut v: Vec<&str> = names.map(|s| s.as_str()).collect();
    v.sort_unstable();
    if v.is_empty() {
        "(none)".to_string()
    } else {
        v.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_purity_with_no_prior_steps() {
        let ctx = ContextManager::new("sys");
        assert_eq!(ctx.build_user_prompt("raw prompt"), "raw prompt");
    }

    #[test]
    fn template_substitutes_completed_step_result() {
        let mut ctx = ContextManager::new("sys");
        ctx.record_step_result("s1", "result-one").unwrap();
        assert_eq!(
            ctx.build_user_prompt("prior: {{s1}}"),
            "prior: result-one"
        );
    }

    #[test]
    fn empty_step_name_raises() {
        let mut ctx = ContextManager::new("sys");
        assert!(ctx.record_step_result("", "x").is_err());
    }

    #[test]
    fn unknown_step_lookup_lists_known_names() {
        let mut ctx = ContextManager::new("sys");
        ctx.record_step_result("alpha", "x").unwrap();
        let err = ctx.step_result("ghost").unwrap_err();
        assert!(err.to_string().contains("unknown step 'ghost'") || format!("{err:?}").contains("alpha"));
    }

    #[test]
    fn reset_preserves_only_system_prompt() {
        let mut ctx = ContextManager::new("sys");
        ctx.record_step_result("s1", "x").unwrap();
        ctx.set_variable("v1", "y").unwrap();
        ctx.reset();
        assert_eq!(ctx.system_prompt(), "sys");
        assert!(ctx.step_result("s1").is_err());
    }
}
