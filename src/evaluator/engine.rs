use super::{Bindings, EvaluationBudget, builtins, coerce_to_string, is_truthy};
use crate::ast::{Accessor, Expression, IndexKey, Root};
use crate::dialect::{Builtin, Platform, RootKind};
use crate::error::EvaluationError;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cell::Cell;

/// The recursive engine for evaluating expressions of one dialect against a
/// fixed set of bindings. Steps are counted across every `evaluate` call on
/// the same engine.
pub(super) struct AstEngine<'a> {
    platform: Platform,
    bindings: &'a Bindings,
    budget: EvaluationBudget,
    steps: Cell<usize>,
}

impl<'a> AstEngine<'a> {
    pub(super) fn new(platform: Platform, bindings: &'a Bindings, budget: EvaluationBudget) -> Self {
        Self {
            platform,
            bindings,
            budget,
            steps: Cell::new(0),
        }
    }

    pub(super) fn evaluate(&self, expr: &Expression) -> Result<Value, EvaluationError> {
        self.evaluate_recursive(expr, 0)
    }

    fn evaluate_recursive(&self, expr: &Expression, depth: usize) -> Result<Value, EvaluationError> {
        self.tick(depth)?;

        match expr {
            Expression::Literal(lit) => Ok(lit.to_json()),
            Expression::VariableRoot(root) => Ok(self.lookup_root(root)),
            Expression::PropertyAccess { base, path } => {
                let mut current = self.evaluate_recursive(base, depth + 1)?;
                for accessor in path {
                    self.tick(depth + 1)?;
                    current = access(&current, accessor);
                }
                Ok(current)
            }
            Expression::FunctionCall { name, args } => {
                let builtin = Builtin::from_name(name, self.platform)
                    .ok_or_else(|| EvaluationError::UnknownFunction(name.clone()))?;

                if builtin == Builtin::If {
                    return self.evaluate_if(name, args, depth);
                }

                let values = args
                    .iter()
                    .map(|arg| self.evaluate_recursive(arg, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                builtins::call(builtin, name, &values)
            }
            Expression::Concatenation(parts) => {
                let mut out = String::new();
                for part in parts {
                    let value = self.evaluate_recursive(part, depth + 1)?;
                    out.push_str(&coerce_to_string(&value));
                }
                Ok(Value::String(out))
            }
        }
    }

    /// Only the chosen branch of a conditional is evaluated.
    fn evaluate_if(
        &self,
        name: &str,
        args: &[Expression],
        depth: usize,
    ) -> Result<Value, EvaluationError> {
        if !(2..=3).contains(&args.len()) {
            return Err(EvaluationError::ArityMismatch {
                function: name.to_string(),
                expected: "2 or 3".to_string(),
                found: args.len(),
            });
        }
        let condition = self.evaluate_recursive(&args[0], depth + 1)?;
        if is_truthy(&condition) {
            self.evaluate_recursive(&args[1], depth + 1)
        } else if let Some(otherwise) = args.get(2) {
            self.evaluate_recursive(otherwise, depth + 1)
        } else {
            Ok(Value::Null)
        }
    }

    fn lookup_root(&self, root: &Root) -> Value {
        let key = root.to_string();
        if let Some(value) = self.bindings.get(&key) {
            return value.clone();
        }
        match self.platform.classify_root(root) {
            RootKind::Now => Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            _ => Value::Null,
        }
    }

    fn tick(&self, depth: usize) -> Result<(), EvaluationError> {
        if depth > self.budget.max_depth {
            return Err(EvaluationError::BudgetExceeded {
                kind: "depth",
                limit: self.budget.max_depth,
            });
        }
        let steps = self.steps.get() + 1;
        if steps > self.budget.max_steps {
            return Err(EvaluationError::BudgetExceeded {
                kind: "step",
                limit: self.budget.max_steps,
            });
        }
        self.steps.set(steps);
        Ok(())
    }
}

/// One step of a property access. Anything missing reads as `null`.
fn access(value: &Value, accessor: &Accessor) -> Value {
    match (value, accessor) {
        (Value::Object(map), Accessor::Field(key))
        | (Value::Object(map), Accessor::Index(IndexKey::Key(key))) => {
            map.get(key).cloned().unwrap_or(Value::Null)
        }
        (Value::Array(items), Accessor::Field(key)) if key == "length" => {
            Value::from(items.len())
        }
        (Value::String(s), Accessor::Field(key)) if key == "length" => {
            Value::from(s.chars().count())
        }
        (Value::Array(items), Accessor::Index(IndexKey::Position(i))) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::Array(items), Accessor::Index(IndexKey::Key(key))) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::String(s), Accessor::Index(IndexKey::Position(i))) => usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
