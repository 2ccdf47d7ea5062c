//! The two workflow platforms and the vocabulary of their expression dialects.

use crate::ast::Root;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod functions;
mod render;

pub use functions::Builtin;
pub use render::{render_expression, render_segments};

/// Stub type emitted for node-graph nodes that have no mapping.
pub const NODE_GRAPH_STUB_TYPE: &str = "n8n-nodes-base.noOp";
/// Stub type emitted for flow-graph modules that have no mapping.
pub const FLOW_GRAPH_STUB_TYPE: &str = "builtin:Placeholder";
/// Flow-graph module type that fans one chain out into several routes.
pub const FLOW_GRAPH_ROUTER_TYPE: &str = "builtin:BasicRouter";

/// A workflow platform, which fixes both the document shape and the
/// expression dialect used inside parameter strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// `{name, nodes, connections}` documents with `={{ ... }}` expressions.
    NodeGraph,
    /// `{name, flow, metadata}` documents with bare `{{ ... }}` expressions.
    FlowGraph,
}

impl Platform {
    pub fn stub_type(self) -> &'static str {
        match self {
            Platform::NodeGraph => NODE_GRAPH_STUB_TYPE,
            Platform::FlowGraph => FLOW_GRAPH_STUB_TYPE,
        }
    }

    /// Separator written between function arguments.
    pub fn argument_separator(self) -> &'static str {
        match self {
            Platform::NodeGraph => ", ",
            Platform::FlowGraph => "; ",
        }
    }

    /// Name of the root for a well-known root kind, if the dialect has one.
    pub fn root_name(self, kind: RootKind) -> Option<&'static str> {
        match (self, kind) {
            (Platform::NodeGraph, RootKind::JsonContext) => Some("$json"),
            (Platform::NodeGraph, RootKind::Environment) => Some("$env"),
            (Platform::NodeGraph, RootKind::Now) => Some("$now"),
            (Platform::NodeGraph, RootKind::NodeByName) => Some("$node"),
            (Platform::FlowGraph, RootKind::Environment) => Some("env"),
            (Platform::FlowGraph, RootKind::Now) => Some("now"),
            _ => None,
        }
    }

    /// Classifies a root as this dialect understands it.
    pub fn classify_root(self, root: &Root) -> RootKind {
        let name = match root {
            Root::Positional(_) => return RootKind::Positional,
            Root::Named(name) => name.as_str(),
        };
        match (self, name) {
            (Platform::NodeGraph, "$json") => RootKind::JsonContext,
            (Platform::NodeGraph, "$env") => RootKind::Environment,
            (Platform::NodeGraph, "$now") => RootKind::Now,
            (Platform::NodeGraph, "$node") => RootKind::NodeByName,
            (Platform::FlowGraph, "env") => RootKind::Environment,
            (Platform::FlowGraph, "now") => RootKind::Now,
            _ => RootKind::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::NodeGraph => write!(f, "node-graph"),
            Platform::FlowGraph => write!(f, "flow-graph"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "node-graph" | "nodegraph" | "n8n" => Ok(Platform::NodeGraph),
            "flow-graph" | "flowgraph" | "make" => Ok(Platform::FlowGraph),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

/// What a variable root refers to, independent of its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    /// The JSON output of the node's upstream producer.
    JsonContext,
    Environment,
    Now,
    /// `$node["Name"]`: an upstream node addressed by name.
    NodeByName,
    /// A numeric node reference such as `1`.
    Positional,
    Unknown,
}
