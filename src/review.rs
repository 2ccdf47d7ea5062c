//! Classifies converted parameters as safe or in need of manual review, and
//! groups the findings per node.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a converted parameter needs a human to look at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReviewReason {
    /// The expression body could not be parsed; the text was kept verbatim.
    ParseFailure(String),
    UnknownFunction(String),
    /// A variable root or node reference with no counterpart in the target.
    UnresolvedReference(String),
    /// `$json` with several producers; the first declared one was used.
    AmbiguousPredecessor { used: String, count: usize },
    /// Embedded code under the given parameter key, passed through verbatim.
    EmbeddedCode(String),
    /// The node was converted through a generic fallback template.
    FallbackTemplate(String),
    DepthLimit(usize),
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewReason::ParseFailure(detail) => {
                write!(f, "expression could not be parsed ({})", detail)
            }
            ReviewReason::UnknownFunction(name) => write!(f, "unrecognized function `{}`", name),
            ReviewReason::UnresolvedReference(reference) => {
                write!(f, "unresolved reference `{}`", reference)
            }
            ReviewReason::AmbiguousPredecessor { used, count } => write!(
                f,
                "ambiguous predecessor: {} upstream nodes, used `{}`",
                count, used
            ),
            ReviewReason::EmbeddedCode(key) => {
                write!(f, "embedded code in `{}` was not translated", key)
            }
            ReviewReason::FallbackTemplate(category) => {
                write!(f, "converted with the generic `{}` template", category)
            }
            ReviewReason::DepthLimit(limit) => {
                write!(f, "parameters nested deeper than {} levels", limit)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    NeedsReview,
}

impl Verdict {
    pub fn of(issues: &[ReviewReason]) -> Self {
        if issues.is_empty() {
            Verdict::Safe
        } else {
            Verdict::NeedsReview
        }
    }
}

/// One node's parameters that need attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterReview {
    pub node_id: String,
    pub parameter_paths: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
struct PendingReview {
    node_id: String,
    paths: Vec<String>,
    reasons: Vec<ReviewReason>,
}

/// Collects flags during a conversion and folds them into one
/// `ParameterReview` per node, in the order nodes were first flagged.
#[derive(Debug, Default)]
pub struct ReviewFlagger {
    pending: Vec<PendingReview>,
}

impl ReviewFlagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the issues found at one parameter path. Safe parameters are
    /// ignored.
    pub fn flag(&mut self, node_id: &str, path: &str, issues: &[ReviewReason]) -> Verdict {
        let verdict = Verdict::of(issues);
        if verdict == Verdict::Safe {
            return verdict;
        }
        let entry = self.entry(node_id);
        if !entry.paths.iter().any(|p| p == path) {
            entry.paths.push(path.to_string());
        }
        for issue in issues {
            if !entry.reasons.contains(issue) {
                entry.reasons.push(issue.clone());
            }
        }
        verdict
    }

    /// Records a node-level issue that is not tied to a parameter path.
    pub fn flag_node(&mut self, node_id: &str, reason: ReviewReason) {
        let entry = self.entry(node_id);
        if !entry.reasons.contains(&reason) {
            entry.reasons.push(reason);
        }
    }

    pub fn finish(self) -> Vec<ParameterReview> {
        self.pending
            .into_iter()
            .map(|p| ParameterReview {
                node_id: p.node_id,
                parameter_paths: p.paths,
                reason: p.reasons.iter().join("; "),
            })
            .collect()
    }

    fn entry(&mut self, node_id: &str) -> &mut PendingReview {
        let index = match self.pending.iter().position(|p| p.node_id == node_id) {
            Some(index) => index,
            None => {
                self.pending.push(PendingReview {
                    node_id: node_id.to_string(),
                    ..Default::default()
                });
                self.pending.len() - 1
            }
        };
        &mut self.pending[index]
    }
}
