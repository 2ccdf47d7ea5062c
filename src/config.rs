//! Per-call conversion options.

use crate::error::OptionsError;
use crate::evaluator::{Bindings, EvaluationBudget};
use serde::{Deserialize, Serialize};

/// What to do with expressions found in parameter strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionMode {
    /// Rewrite expressions into the target dialect.
    #[default]
    Translate,
    /// Replace expressions with their value under `evaluation_context`.
    Evaluate,
}

/// Options accepted by a conversion call. Every field has a default, so an
/// empty JSON object is a valid options document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    pub mode: ExpressionMode,
    /// Bindings used in `Evaluate` mode.
    pub evaluation_context: Bindings,
    pub max_parameter_depth: usize,
    pub evaluation_budget: EvaluationBudget,
    /// Name for the converted workflow; the source name is kept when unset.
    pub workflow_name: Option<String>,
    /// Parameter keys whose string values are code and are never translated.
    pub code_parameter_keys: Vec<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            mode: ExpressionMode::Translate,
            evaluation_context: Bindings::new(),
            max_parameter_depth: 64,
            evaluation_budget: EvaluationBudget::default(),
            workflow_name: None,
            code_parameter_keys: ["jsCode", "pythonCode", "functionCode", "code"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ConversionOptions {
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(json).map_err(|e| OptionsError::JsonParseError(e.to_string()))
    }

    /// Switches to evaluate mode with the given bindings.
    pub fn evaluate_with(mut self, context: Bindings) -> Self {
        self.mode = ExpressionMode::Evaluate;
        self.evaluation_context = context;
        self
    }

    pub fn is_code_key(&self, key: &str) -> bool {
        self.code_parameter_keys.iter().any(|k| k == key)
    }
}
