use crate::dialect::Platform;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marks a node that was synthesized from a node of the other platform, so a
/// later conversion back can restore the original type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub original_type: String,
    pub original_platform: Platform,
}

/// A node (node-graph) or module (flow-graph) in the platform-neutral model.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowNode {
    pub id: Option<String>,
    /// The reference the platform's edges use: the node name in node-graph
    /// documents, the module id in flow-graph documents.
    pub key: String,
    pub name: Option<String>,
    pub node_type: String,
    pub parameters: Value,
    pub position: Option<[f64; 2]>,
    pub type_version: Option<f64>,
    pub provenance: Option<Provenance>,
}

impl WorkflowNode {
    pub fn new(key: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            name: None,
            node_type: node_type.into(),
            parameters: Value::Object(Default::default()),
            position: None,
            type_version: None,
            provenance: None,
        }
    }

    /// The identifier used in logs and review entries.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.key)
    }
}

pub const MAIN_CONNECTION: &str = "main";

/// Highest output or input port a parsed edge may name. Node-graph documents
/// hold one array per output port, so larger values are rejected.
pub const MAX_PORT: usize = 64;

/// A directed edge between two node keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from: String,
    pub from_port: usize,
    pub to: String,
    pub to_port: usize,
    pub kind: String,
}

impl Connection {
    pub fn main(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            from_port: 0,
            to: to.into(),
            to_port: 0,
            kind: MAIN_CONNECTION.to_string(),
        }
    }
}

/// The canonical definition of a workflow that both formats parse into and
/// assemble from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    pub name: String,
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<Connection>,
}

/// A document produced from a `Workflow`, with anything the format could not
/// express.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub document: Value,
    pub warnings: Vec<String>,
    /// Nodes the format needed that have no source counterpart.
    pub synthetic_nodes: usize,
    /// Edges written into the document.
    pub connections: usize,
}

/// A workflow document format.
///
/// Implementations translate between their JSON documents and the canonical
/// `Workflow` model; everything else in a conversion works on that model.
pub trait WorkflowFormat: Sync {
    /// Checks the top-level shape of a document.
    fn validate(&self, document: &Value) -> Result<(), ValidationError>;

    fn parse(&self, document: &Value) -> Result<Workflow, ValidationError>;

    fn assemble(&self, workflow: &Workflow, converted_from: Platform) -> Assembled;

    /// An empty, valid document of this format.
    fn empty_skeleton(&self, name: &str, converted_from: Platform) -> Value {
        let workflow = Workflow {
            name: name.to_string(),
            ..Default::default()
        };
        self.assemble(&workflow, converted_from).document
    }
}

pub(super) fn require_object(document: &Value) -> Result<&serde_json::Map<String, Value>, ValidationError> {
    document.as_object().ok_or(ValidationError::NotAnObject)
}

pub(super) fn number_pair(value: &Value) -> Option<[f64; 2]> {
    match value.as_array()?.as_slice() {
        [x, y] => Some([x.as_f64()?, y.as_f64()?]),
        _ => None,
    }
}
