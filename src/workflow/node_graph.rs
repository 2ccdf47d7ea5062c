use super::model::{
    Assembled, Connection, Provenance, Workflow, WorkflowFormat, WorkflowNode, number_pair,
    require_object,
};
use crate::ast::number_to_json;
use crate::dialect::Platform;
use crate::error::ValidationError;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// `{name, nodes, connections}` documents. Edges are keyed by node name and
/// output port: `{"A": {"main": [[{"node": "B", "type": "main", "index": 0}]]}}`.
pub struct NodeGraphFormat;

impl WorkflowFormat for NodeGraphFormat {
    fn validate(&self, document: &Value) -> Result<(), ValidationError> {
        let root = require_object(document)?;
        match root.get("nodes") {
            None => {
                return Err(ValidationError::MissingField {
                    platform: Platform::NodeGraph,
                    field: "nodes",
                });
            }
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(ValidationError::WrongFieldType {
                    field: "nodes",
                    expected: "an array",
                });
            }
        }
        match root.get("connections") {
            None => Err(ValidationError::MissingField {
                platform: Platform::NodeGraph,
                field: "connections",
            }),
            Some(Value::Object(_)) => Ok(()),
            Some(_) => Err(ValidationError::WrongFieldType {
                field: "connections",
                expected: "an object",
            }),
        }
    }

    fn parse(&self, document: &Value) -> Result<Workflow, ValidationError> {
        self.validate(document)?;
        let root = require_object(document)?;
        let name = root
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let nodes = root
            .get("nodes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(index, raw)| parse_node(index, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut connections = Vec::new();
        let edges = root.get("connections").and_then(Value::as_object);
        for (from, outputs) in edges.into_iter().flatten() {
            for (kind, ports) in outputs.as_object().into_iter().flatten() {
                for (from_port, targets) in ports.as_array().into_iter().flatten().enumerate() {
                    for target in targets.as_array().into_iter().flatten() {
                        let Some(to) = target.get("node").and_then(Value::as_str) else {
                            return Err(ValidationError::Malformed(format!(
                                "connection from '{}' has no target node",
                                from
                            )));
                        };
                        connections.push(Connection {
                            from: from.clone(),
                            from_port,
                            to: to.to_string(),
                            to_port: target.get("index").and_then(Value::as_u64).unwrap_or(0)
                                as usize,
                            kind: kind.clone(),
                        });
                    }
                }
            }
        }

        Ok(Workflow {
            name,
            nodes,
            connections,
        })
    }

    fn assemble(&self, workflow: &Workflow, converted_from: Platform) -> Assembled {
        let nodes: Vec<Value> = workflow.nodes.iter().map(render_node).collect();

        let mut connections = Map::new();
        for edge in &workflow.connections {
            let outputs = connections
                .entry(edge.from.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(outputs) = outputs else {
                continue;
            };
            let ports = outputs
                .entry(edge.kind.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(ports) = ports else {
                continue;
            };
            while ports.len() <= edge.from_port {
                ports.push(Value::Array(Vec::new()));
            }
            if let Value::Array(targets) = &mut ports[edge.from_port] {
                targets.push(json!({
                    "node": edge.to,
                    "type": edge.kind,
                    "index": edge.to_port,
                }));
            }
        }

        let document = json!({
            "name": workflow.name,
            "nodes": nodes,
            "connections": connections,
            "active": false,
            "settings": { "executionOrder": "v1" },
            "pinData": {},
            "versionId": Uuid::new_v4().to_string(),
            "meta": { "convertedFrom": converted_from.to_string() },
        });

        Assembled {
            document,
            warnings: Vec::new(),
            synthetic_nodes: 0,
            connections: workflow.connections.len(),
        }
    }
}

fn parse_node(index: usize, raw: &Value) -> Result<WorkflowNode, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::Malformed(format!(
            "node #{} is not an object",
            index
        )));
    };
    let Some(node_type) = obj.get("type").and_then(Value::as_str) else {
        return Err(ValidationError::Malformed(format!(
            "node #{} has no 'type'",
            index
        )));
    };
    let id = obj.get("id").and_then(Value::as_str).map(String::from);
    let name = obj.get("name").and_then(Value::as_str).map(String::from);
    let key = name
        .clone()
        .or_else(|| id.clone())
        .unwrap_or_else(|| format!("node-{}", index));

    Ok(WorkflowNode {
        id,
        key,
        name,
        node_type: node_type.to_string(),
        parameters: obj
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        position: obj.get("position").and_then(number_pair),
        type_version: obj.get("typeVersion").and_then(Value::as_f64),
        provenance: obj
            .get("provenance")
            .and_then(|p| serde_json::from_value::<Provenance>(p.clone()).ok()),
    })
}

fn render_node(node: &WorkflowNode) -> Value {
    let mut out = Map::new();
    out.insert(
        "id".to_string(),
        Value::String(node.id.clone().unwrap_or_else(|| node.key.clone())),
    );
    out.insert(
        "name".to_string(),
        Value::String(node.name.clone().unwrap_or_else(|| node.key.clone())),
    );
    out.insert("type".to_string(), Value::String(node.node_type.clone()));
    out.insert(
        "typeVersion".to_string(),
        number_to_json(node.type_version.unwrap_or(1.0)),
    );
    let [x, y] = node.position.unwrap_or([0.0, 0.0]);
    out.insert(
        "position".to_string(),
        Value::Array(vec![number_to_json(x), number_to_json(y)]),
    );
    out.insert("parameters".to_string(), node.parameters.clone());
    if let Some(provenance) = &node.provenance {
        if let Ok(value) = serde_json::to_value(provenance) {
            out.insert("provenance".to_string(), value);
        }
    }
    Value::Object(out)
}
