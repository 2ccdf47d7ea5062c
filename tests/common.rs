//! Common test utilities for building workflow documents and mapping tables.
use honyaku::prelude::*;
use serde_json::{Map, Value, json};

/// A mapping database covering the node types used by the fixtures.
///
/// `n8n-nodes-base.if` maps onto the flow-graph router, so a branching
/// node-graph workflow keeps its branches as router routes.
#[allow(dead_code)]
pub const MAPPINGS_JSON: &str = r#"{
    "version": "2024.1",
    "lastUpdated": "2024-05-01",
    "mappings": {
        "n8n-nodes-base.manualTrigger": {
            "targetType": "builtin:Trigger"
        },
        "n8n-nodes-base.httpRequest": {
            "targetType": "http:ActionSendData",
            "parameterPathMap": { "url": "url", "method": "method" },
            "valueSubstitutions": { "method": { "GET": "get", "POST": "post" } },
            "passthroughUnmapped": true,
            "targetVersion": 3
        },
        "n8n-nodes-base.set": {
            "targetType": "util:SetVariables",
            "passthroughUnmapped": true
        },
        "n8n-nodes-base.if": {
            "targetType": "builtin:BasicRouter",
            "passthroughUnmapped": true
        },
        "n8n-nodes-base.code": {
            "targetType": "code:ExecuteCode",
            "passthroughUnmapped": true
        },
        "n8n-nodes-base.slack": {
            "targetType": "slack:CreateMessage",
            "parameterPathMap": { "text": "message.text" }
        }
    },
    "fallbacks": [
        {
            "category": "http",
            "targetPlatform": "flowGraph",
            "typeHints": ["http"],
            "mapping": {
                "targetType": "http:MakeRequest",
                "passthroughUnmapped": true
            }
        }
    ]
}"#;

#[allow(dead_code)]
pub fn mapping_table() -> MappingTable {
    MappingTable::from_json_str(MAPPINGS_JSON).expect("fixture mappings must load")
}

/// A node-graph node with a fixed id derived from its name.
#[allow(dead_code)]
pub fn node(name: &str, node_type: &str, parameters: Value) -> Value {
    json!({
        "id": format!("id-{}", name.to_lowercase().replace(' ', "-")),
        "name": name,
        "type": node_type,
        "typeVersion": 1,
        "position": [0, 0],
        "parameters": parameters,
    })
}

/// Builds a node-graph document. Edges are `(from, output port, to)`.
#[allow(dead_code)]
pub fn node_graph(name: &str, nodes: Vec<Value>, edges: &[(&str, usize, &str)]) -> Value {
    let mut connections = Map::new();
    for (from, port, to) in edges {
        let outputs = connections
            .entry(from.to_string())
            .or_insert_with(|| json!({ "main": [] }));
        let ports = outputs["main"].as_array_mut().expect("main is an array");
        while ports.len() <= *port {
            ports.push(json!([]));
        }
        ports[*port]
            .as_array_mut()
            .expect("port is an array")
            .push(json!({ "node": to, "type": "main", "index": 0 }));
    }
    json!({
        "name": name,
        "nodes": nodes,
        "connections": connections,
    })
}

/// Manual trigger feeding one node that upper-cases a field.
///
/// Logic: `Start -> Shout`
#[allow(dead_code)]
pub fn create_upper_workflow() -> Value {
    node_graph(
        "Shout",
        vec![
            node("Start", "n8n-nodes-base.manualTrigger", json!({})),
            node(
                "Shout",
                "n8n-nodes-base.set",
                json!({ "value": "={{ $str.upper($json.text) }}" }),
            ),
        ],
        &[("Start", 0, "Shout")],
    )
}

/// A three node chain: trigger, HTTP call, set.
///
/// Logic: `Start -> Fetch -> Store`
#[allow(dead_code)]
pub fn create_linear_workflow() -> Value {
    node_graph(
        "Fetch and store",
        vec![
            node("Start", "n8n-nodes-base.manualTrigger", json!({})),
            node(
                "Fetch",
                "n8n-nodes-base.httpRequest",
                json!({
                    "url": "={{ \"https://example.com/api/\" + $json.id }}",
                    "method": "GET",
                    "options": { "timeout": 5000 },
                }),
            ),
            node(
                "Store",
                "n8n-nodes-base.set",
                json!({
                    "fields": [
                        { "name": "title", "value": "={{ $json.title }}" },
                        { "name": "source", "value": "={{ $node[\"Start\"].json.origin }}" },
                    ],
                    "note": "plain text stays plain",
                }),
            ),
        ],
        &[("Start", 0, "Fetch"), ("Fetch", 0, "Store")],
    )
}

/// A condition with a true and a false branch.
///
/// Logic: `Start -> Check -> (Yes | No)`
#[allow(dead_code)]
pub fn create_branching_workflow() -> Value {
    node_graph(
        "Branching",
        vec![
            node("Start", "n8n-nodes-base.manualTrigger", json!({})),
            node("Check", "n8n-nodes-base.if", json!({ "value": "={{ $json.ok }}" })),
            node("Yes", "n8n-nodes-base.set", json!({ "value": "yes" })),
            node("No", "n8n-nodes-base.set", json!({ "value": "no" })),
        ],
        &[("Start", 0, "Check"), ("Check", 0, "Yes"), ("Check", 1, "No")],
    )
}

/// The flow-graph counterpart of a trigger, an HTTP call and a set.
#[allow(dead_code)]
pub fn create_flow_graph_workflow() -> Value {
    json!({
        "name": "Flow",
        "flow": [
            {
                "id": 1,
                "module": "builtin:Trigger",
                "version": 1,
                "mapper": {},
                "metadata": { "designer": { "x": 0, "y": 0, "name": "Start" } }
            },
            {
                "id": 2,
                "module": "http:ActionSendData",
                "version": 3,
                "parameters": {},
                "mapper": { "url": "https://example.com/{{1.id}}", "method": "post" },
                "metadata": { "designer": { "x": 300, "y": 0, "name": "Fetch" } }
            },
            {
                "id": 3,
                "module": "util:SetVariables",
                "version": 1,
                "mapper": {
                    "value": "{{upper(2.text)}}",
                    "first": "{{1.origin}}"
                },
                "metadata": { "designer": { "x": 600, "y": 0, "name": "Store" } }
            }
        ],
        "metadata": { "version": 1 }
    })
}

/// Converts with default options.
#[allow(dead_code)]
pub fn convert_default(
    table: &MappingTable,
    document: &Value,
    source: Platform,
    target: Platform,
) -> ConversionResult {
    Converter::builder(table).build().convert(document, source, target)
}

/// Finds a converted node-graph node by name.
#[allow(dead_code)]
pub fn find_node<'v>(document: &'v Value, name: &str) -> &'v Value {
    document["nodes"]
        .as_array()
        .and_then(|nodes| nodes.iter().find(|n| n["name"] == name))
        .unwrap_or_else(|| panic!("node '{}' not found", name))
}
