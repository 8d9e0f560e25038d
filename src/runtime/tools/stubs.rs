//! Always-available stub tools returning realistic synthetic data, plus
//! `Calculator`, which needs no external dependency and so isn't a stub.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::runtime::errors::AxonRuntimeError;

use super::base_tool::{BaseTool, ToolResult};

pub struct WebSearch;

#[async_trait]
impl BaseTool for WebSearch {
    fn tool_name_const() -> &'static str { "WebSearch" }
    fn is_stub_const() -> bool { true }
    fn default_timeout_const() -> Duration { Duration::from_secs(10) }

    fn name(&self) -> &'static str {
        Self::tool_name_const()
    }
    fn is_stub(&self) -> bool {
        Self::is_stub_const()
    }
    fn default_timeout(&self) -> Duration {
        Self::default_timeout_const()
    }

    async fn execute(&self, query: &str) -> Result<ToolResult, AxonRuntimeError> {
        debug!(query, "stub web search");
        let results = (1..=3)
            .map(|i| {
                json!({
                    "title": format!("Result {i} for \"{query}\""),
                    "snippet": format!("Synthesized snippet {i} about {query}."),
                    "url": format!("https://example.invalid/search?q={query}&r={i}"),
                })
            })
            .collect::<Vec<_>>();
        Ok(ToolResult::ok(json!({ "results": results })))
    }
}

pub struct Calculator;

#[async_trait]
impl BaseTool for Calculator {
    fn tool_name_const() -> &'static str { "Calculator" }
    fn is_stub_const() -> bool { false }
    fn default_timeout_const() -> Duration { Duration::from_secs(2) }

    fn name(&self) -> &'static str {
        Self::tool_name_const()
    }
    fn is_stub(&self) -> bool {
        Self::is_stub_const()
    }
    fn default_timeout(&self) -> Duration {
        Self::default_timeout_const()
    }

    async fn execute(&self, query: &str) -> Result<ToolResult, AxonRuntimeError> {
        match eval_arithmetic(query) {
            Ok(value) => Ok(ToolResult::ok(json!({ "value": value }))),
            Err(message) => Ok(ToolResult::failed(message)),
        }
    }
}

pub struct FileReader;

#[async_trait]
impl BaseTool for FileReader {
    fn tool_name_const() -> &'static str { "FileReader" }
    fn is_stub_const() -> bool { true }
    fn default_timeout_const() -> Duration { Duration::from_secs(5) }

    fn name(&self) -> &'static str {
        Self::tool_name_const()
    }
    fn is_stub(&self) -> bool {
        Self::is_stub_const()
    }
    fn default_timeout(&self) -> Duration {
        Self::default_timeout_const()
    }

    async fn execute(&self, query: &str) -> Result<ToolResult, AxonRuntimeError> {
        debug!(query, "stub file listing");
        Ok(ToolResult::ok(json!({
            "path": query,
            "entries": [format!("{query}/a.txt"), format!("{query}/b.txt")],
        })))
    }
}

pub struct CodeExecutor;

#[async_trait]
impl BaseTool for CodeExecutor {
    fn tool_name_const() -> &'static str { "CodeExecutor" }
    fn is_stub_const() -> bool { true }
    fn default_timeout_const() -> Duration { Duration::from_secs(15) }

    fn name(&self) -> &'static str {
        Self::tool_name_const()
    }
    fn is_stub(&self) -> bool {
        Self::is_stub_const()
    }
    fn default_timeout(&self) -> Duration {
        Self::default_timeout_const()
    }

    async fn execute(&self, query: &str) -> Result<ToolResult, AxonRuntimeError> {
        debug!(query, "stub code execution");
        Ok(ToolResult::ok(json!({
            "output": format!("would execute: {query}"),
        })))
    }
}

/// Minimal recursive-descent evaluator over `+ - * /` and parens — enough
/// for the calculator's synthetic arithmetic queries, no `eval` needed.
fn eval_arithmetic(input: &str) -> Result<f64, String> {
    let tokens: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pos = 0;
    let value = parse_expr(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("unexpected trailing input in '{input}'"));
    }
    Ok(value)
}

fn parse_expr(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    let mut value = parse_term(tokens, pos)?;
    while let Some(&op) = tokens.get(*pos) {
        if op == '+' || op == '-' {
            *pos += 1;
            let rhs = parse_term(tokens, pos)?;
            value = if op == '+' { value + rhs } else { value - rhs };
        } else {
            break;
        }
    }
    Ok(value)
}

fn parse_term(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    let mut value = parse_factor(tokens, pos)?;
    while let Some(&op) = tokens.get(*pos) {
        if op == '*' || op == '/' {
            *pos += 1;
            let rhs = parse_factor(tokens, pos)?;
            if op == '/' && rhs == 0.0 {
                return Err("division by zero".to_string());
            }
            value = if op == '*' { value * rhs } else { value / rhs };
        } else {
            break;
        }
    }
    Ok(value)
}

fn parse_factor(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    match tokens.get(*pos) {
        Some('(') => {
            *pos += 1;
            let value = parse_expr(tokens, pos)?;
            match tokens.get(*pos) {
                Some(')') => {
                    *pos += 1;
                    Ok(value)
                }
                _ => Err("missing closing paren".to_string()),
            }
        }
        Some('-') => {
            *pos += 1;
            Ok(-parse_factor(tokens, pos)?)
        }
        _ => {
            let start = *pos;
            while tokens
                .get(*pos)
                .map(|c| c.is_ascii_digit() || *c == '.')
                .unwrap_or(false)
            {
                *pos += 1;
            }
            if *pos == start {
                return Err("expected a number".to_string());
            }
            let text: String = tokens[start..*pos].iter().collect();
            text.parse::<f64>().map_err(|_| format!("invalid number '{text}'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn web_search_returns_synthetic_results() {
        let result = WebSearch.execute("rust ownership").await.unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["results"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn calculator_evaluates_precedence_and_parens() {
        assert_eq!(eval_arithmetic("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(eval_arithmetic("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(eval_arithmetic("-2 + 5").unwrap(), 3.0);
    }

    #[test]
    fn calculator_rejects_division_by_zero() {
        assert!(eval_arithmetic("1 / 0").is_err());
    }

    #[tokio::test]
    async fn calculator_is_not_a_stub() {
        assert!(!Calculator.is_stub());
    }

    #[tokio::test]
    async fn file_reader_never_touches_the_filesystem() {
        let result = FileReader.execute("/etc").await.unwrap();
        assert!(result.success);
        assert!(result.data.unwrap()["entries"].as_array().unwrap().len() == 2);
    }
}
