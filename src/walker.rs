//! Applies the expression engine to every string in a parameter tree.

use crate::ast::{OutputSegment, ParsedExpression, Segment};
use crate::config::{ConversionOptions, ExpressionMode};
use crate::dialect::{Platform, render_segments};
use crate::error::WalkError;
use crate::evaluator::{Bindings, EvaluationBudget, evaluate_template};
use crate::parser::{is_node_graph_expression, parse_template};
use crate::review::ReviewReason;
use crate::translator::{TranslationContext, Translator};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub enum WalkMode<'a> {
    Translate,
    Evaluate(&'a Bindings),
}

/// One expression-bearing string found during a walk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionRecord {
    /// Dot-joined location of the string; array indices are numeric segments.
    pub path: String,
    pub issues: Vec<ReviewReason>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkReport {
    pub expressions: Vec<ExpressionRecord>,
    /// Evaluation failures that fell back to the translated form.
    pub warnings: Vec<String>,
}

impl WalkReport {
    pub fn flagged(&self) -> impl Iterator<Item = &ExpressionRecord> {
        self.expressions.iter().filter(|r| !r.issues.is_empty())
    }
}

pub struct ParameterWalker<'a> {
    translator: Translator,
    context: TranslationContext<'a>,
    mode: WalkMode<'a>,
    budget: EvaluationBudget,
    max_depth: usize,
    code_keys: &'a [String],
}

impl<'a> ParameterWalker<'a> {
    pub fn new(translator: Translator, context: TranslationContext<'a>) -> Self {
        Self {
            translator,
            context,
            mode: WalkMode::Translate,
            budget: EvaluationBudget::default(),
            max_depth: 64,
            code_keys: &[],
        }
    }

    /// A walker configured from conversion options.
    pub fn from_options(
        translator: Translator,
        context: TranslationContext<'a>,
        options: &'a ConversionOptions,
    ) -> Self {
        let mode = match options.mode {
            ExpressionMode::Translate => WalkMode::Translate,
            ExpressionMode::Evaluate => WalkMode::Evaluate(&options.evaluation_context),
        };
        Self::new(translator, context)
            .mode(mode)
            .budget(options.evaluation_budget)
            .max_depth(options.max_parameter_depth)
            .code_keys(&options.code_parameter_keys)
    }

    pub fn mode(mut self, mode: WalkMode<'a>) -> Self {
        self.mode = mode;
        self
    }

    pub fn budget(mut self, budget: EvaluationBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn code_keys(mut self, keys: &'a [String]) -> Self {
        self.code_keys = keys;
        self
    }

    /// Walks a parameter tree, returning the converted tree and what was found.
    pub fn walk(&self, value: &Value) -> Result<(Value, WalkReport), WalkError> {
        let mut report = WalkReport::default();
        let mut path = Vec::new();
        let converted = self.walk_value(value, None, &mut path, 0, &mut report)?;
        Ok((converted, report))
    }

    fn walk_value(
        &self,
        value: &Value,
        key: Option<&str>,
        path: &mut Vec<String>,
        depth: usize,
        report: &mut WalkReport,
    ) -> Result<Value, WalkError> {
        if depth > self.max_depth {
            return Err(WalkError::DepthExceeded {
                path: path.join("."),
                limit: self.max_depth,
            });
        }

        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    path.push(k.clone());
                    let converted = self.walk_value(v, Some(k), path, depth + 1, report)?;
                    path.pop();
                    out.insert(k.clone(), converted);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(i.to_string());
                    out.push(self.walk_value(item, key, path, depth + 1, report)?);
                    path.pop();
                }
                Ok(Value::Array(out))
            }
            Value::String(s) => Ok(self.walk_string(s, key, &path.join("."), report)),
            other => Ok(other.clone()),
        }
    }

    fn walk_string(&self, s: &str, key: Option<&str>, path: &str, report: &mut WalkReport) -> Value {
        let verbatim = || Value::String(s.to_string());

        if let Some(key) = key.filter(|k| self.code_keys.iter().any(|c| c == k)) {
            if !s.trim().is_empty() {
                report.expressions.push(ExpressionRecord {
                    path: path.to_string(),
                    issues: vec![ReviewReason::EmbeddedCode(key.to_string())],
                });
            }
            return verbatim();
        }

        let target = self.translator.target();
        if target == Platform::NodeGraph
            && self.translator.source() != Platform::NodeGraph
            && is_node_graph_expression(s)
        {
            return verbatim();
        }

        let template = parse_template(s, self.translator.source());
        if !template.has_expressions() {
            return verbatim();
        }

        let mut issues = Vec::new();
        let mut keep_verbatim = false;
        let mut output = Vec::with_capacity(template.segments.len());

        for segment in &template.segments {
            match segment {
                Segment::Literal(text) => output.push(OutputSegment::Literal(text.clone())),
                Segment::Expression(expr) => match expr.ast() {
                    ParsedExpression::Parsed(ast) => {
                        let translation = self.translator.to_target(ast, &self.context);
                        keep_verbatim |= translation.has_unknown_function();
                        push_unique(&mut issues, translation.issues);
                        output.push(OutputSegment::Expression(translation.expression));
                    }
                    ParsedExpression::Unparsed { reason } => {
                        keep_verbatim = true;
                        push_unique(&mut issues, vec![ReviewReason::ParseFailure(reason.to_string())]);
                    }
                },
            }
        }

        if keep_verbatim {
            report.expressions.push(ExpressionRecord {
                path: path.to_string(),
                issues,
            });
            return verbatim();
        }

        if let WalkMode::Evaluate(bindings) = self.mode {
            match evaluate_template(&template, bindings, self.budget) {
                Ok(value) => {
                    report.expressions.push(ExpressionRecord {
                        path: path.to_string(),
                        issues: Vec::new(),
                    });
                    return value;
                }
                Err(e) => report.warnings.push(format!(
                    "Could not evaluate '{}' at '{}': {}; kept the translated expression",
                    s, path, e
                )),
            }
        }

        report.expressions.push(ExpressionRecord {
            path: path.to_string(),
            issues,
        });
        Value::String(render_segments(&output, target))
    }
}

fn push_unique(issues: &mut Vec<ReviewReason>, new: Vec<ReviewReason>) {
    for issue in new {
        if !issues.contains(&issue) {
            issues.push(issue);
        }
    }
}
