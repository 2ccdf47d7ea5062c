use crate::dialect::Platform;
use crate::review::ParameterReview;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionLog {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The stages a conversion passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Validate,
    MapNodes,
    ConvertConnections,
    Assemble,
    Finalize,
}

/// Counters describing what a conversion did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDebug {
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub stages: Vec<Stage>,
    pub source_node_count: usize,
    /// Converted nodes with a source counterpart. Synthetic nodes are counted
    /// separately.
    pub converted_node_count: usize,
    pub synthetic_node_count: usize,
    pub mapped_count: usize,
    pub fallback_count: usize,
    pub stub_count: usize,
    pub restored_count: usize,
    pub source_connection_count: usize,
    pub converted_connection_count: usize,
    pub expression_count: usize,
    pub flagged_expression_count: usize,
}

impl ConversionDebug {
    pub fn new(source: Platform, target: Platform) -> Self {
        Self {
            source_platform: source,
            target_platform: target,
            stages: Vec::new(),
            source_node_count: 0,
            converted_node_count: 0,
            synthetic_node_count: 0,
            mapped_count: 0,
            fallback_count: 0,
            stub_count: 0,
            restored_count: 0,
            source_connection_count: 0,
            converted_connection_count: 0,
            expression_count: 0,
            flagged_expression_count: 0,
        }
    }
}

/// Everything a conversion call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub converted_workflow: Value,
    pub logs: Vec<ConversionLog>,
    pub parameters_needing_review: Vec<ParameterReview>,
    pub unmapped_nodes: Vec<String>,
    pub debug: ConversionDebug,
}

impl ConversionResult {
    pub fn has_errors(&self) -> bool {
        self.logs.iter().any(|l| l.level == LogLevel::Error)
    }

    pub fn logs_at(&self, level: LogLevel) -> impl Iterator<Item = &ConversionLog> {
        self.logs.iter().filter(move |l| l.level == level)
    }
}

/// Collects the logs of one conversion and mirrors each entry as a tracing
/// event.
#[derive(Debug, Default)]
pub struct LogSink {
    logs: Vec<ConversionLog>,
}

impl LogSink {
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.push(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.push(LogLevel::Error, message);
    }

    pub fn into_logs(self) -> Vec<ConversionLog> {
        self.logs
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.logs.push(ConversionLog {
            level,
            message,
            timestamp: Utc::now(),
        });
    }
}
