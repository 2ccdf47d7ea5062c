//! Reduces expression ASTs to JSON values against a binding context.

use crate::ast::{ParsedExpression, Segment, Template, format_number};
use crate::dialect::Platform;
use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod builtins;
mod engine;

use engine::AstEngine;

/// Values visible to expressions, keyed by root name (`$json`, `env`, ...).
/// Positional roots are looked up by their decimal id, e.g. `"1"`.
pub type Bindings = Map<String, Value>;

/// Limits on how much work a single evaluation may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationBudget {
    pub max_depth: usize,
    pub max_steps: usize,
}

impl Default for EvaluationBudget {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_steps: 10_000,
        }
    }
}

/// Evaluates one expression written in `platform`'s dialect.
pub fn evaluate(
    expr: &crate::ast::Expression,
    platform: Platform,
    bindings: &Bindings,
    budget: EvaluationBudget,
) -> Result<Value, EvaluationError> {
    AstEngine::new(platform, bindings, budget).evaluate(expr)
}

/// Evaluates a whole parameter string.
///
/// A string that is exactly one expression yields that expression's native
/// value; anything else is spliced into a string.
pub fn evaluate_template(
    template: &Template,
    bindings: &Bindings,
    budget: EvaluationBudget,
) -> Result<Value, EvaluationError> {
    let engine = AstEngine::new(template.platform, bindings, budget);

    if let Some(segment) = template.sole_expression() {
        return engine.evaluate(parsed(segment.ast())?);
    }

    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Expression(e) => {
                let value = engine.evaluate(parsed(e.ast())?)?;
                out.push_str(&coerce_to_string(&value));
            }
        }
    }
    Ok(Value::String(out))
}

fn parsed(ast: &ParsedExpression) -> Result<&crate::ast::Expression, EvaluationError> {
    match ast {
        ParsedExpression::Parsed(expr) => Ok(expr),
        ParsedExpression::Unparsed { reason } => Err(EvaluationError::Unparsed(reason.to_string())),
    }
}

/// The text a value contributes to a concatenation.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_default(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// JavaScript-style truthiness, as both platforms use for conditions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
