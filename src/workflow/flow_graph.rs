use super::model::{
    Assembled, Connection, MAIN_CONNECTION, MAX_PORT, Provenance, Workflow, WorkflowFormat,
    WorkflowNode,
    require_object,
};
use crate::ast::number_to_json;
use crate::dialect::{FLOW_GRAPH_ROUTER_TYPE, Platform};
use crate::error::ValidationError;
use ahash::{AHashMap, AHashSet};
use serde_json::{Map, Value, json};

/// `{name, flow, metadata}` documents. Modules run in list order; a router's
/// `routes[].flow` lists are the branches that follow it.
pub struct FlowGraphFormat;

impl WorkflowFormat for FlowGraphFormat {
    fn validate(&self, document: &Value) -> Result<(), ValidationError> {
        let root = require_object(document)?;
        match root.get("flow") {
            None => Err(ValidationError::MissingField {
                platform: Platform::FlowGraph,
                field: "flow",
            }),
            Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(ValidationError::WrongFieldType {
                field: "flow",
                expected: "an array",
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
        let flow = root.get("flow").and_then(Value::as_array);
        let designer = root.get("metadata").and_then(|m| m.get("designer"));
        let orphans = designer
            .and_then(|d| d.get("orphans"))
            .and_then(Value::as_array);

        let mut used = AHashSet::new();
        collect_ids(flow.into_iter().flatten(), &mut used);
        for chain in orphans.into_iter().flatten() {
            collect_ids(chain.as_array().into_iter().flatten(), &mut used);
        }

        let mut parser = ChainParser {
            used,
            next_free: 1,
            nodes: Vec::new(),
            connections: Vec::new(),
        };
        parser.parse_chain(flow.into_iter().flatten(), None)?;
        for chain in orphans.into_iter().flatten() {
            parser.parse_chain(chain.as_array().into_iter().flatten(), None)?;
        }

        // Edges an earlier assembly could not place into the module tree.
        let unresolved = root
            .get("metadata")
            .and_then(|m| m.get("unresolvedConnections"))
            .and_then(Value::as_array);
        for (index, entry) in unresolved.into_iter().flatten().enumerate() {
            let Some(edge) = connection_from_json(entry) else {
                continue;
            };
            if edge.from_port > MAX_PORT || edge.to_port > MAX_PORT {
                return Err(ValidationError::Malformed(format!(
                    "unresolved connection #{} uses a port above {}",
                    index, MAX_PORT
                )));
            }
            let known = |key: &str| parser.nodes.iter().any(|n| n.key == key);
            if known(&edge.from) && known(&edge.to) {
                parser.connections.push(edge);
            }
        }

        Ok(Workflow {
            name,
            nodes: parser.nodes,
            connections: parser.connections,
        })
    }

    fn assemble(&self, workflow: &Workflow, converted_from: Platform) -> Assembled {
        let mut assembler = Assembler::new(workflow);
        let chains = assembler.build();

        let mut chains = chains.into_iter();
        let flow = chains.next().unwrap_or_default();
        let orphans: Vec<Value> = chains.map(Value::Array).collect();
        if !orphans.is_empty() {
            assembler.warnings.push(format!(
                "{} disconnected chain(s) placed under metadata.designer.orphans",
                orphans.len()
            ));
        }

        let mut metadata = json!({
            "instant": false,
            "version": 1,
            "scenario": {
                "roundtrips": 1,
                "maxErrors": 3,
                "autoCommit": true,
                "autoCommitTriggerLast": true,
                "sequential": false,
                "confidential": false,
                "dataloss": false,
                "dlq": false,
                "freshVariables": false,
            },
            "designer": { "orphans": orphans },
            "convertedFrom": converted_from.to_string(),
        });
        if !assembler.unresolved.is_empty() {
            metadata["unresolvedConnections"] = Value::Array(assembler.unresolved.clone());
        }

        Assembled {
            document: json!({
                "name": workflow.name,
                "flow": flow,
                "metadata": metadata,
            }),
            warnings: assembler.warnings,
            synthetic_nodes: assembler.synthetic,
            connections: assembler.placed,
        }
    }
}

fn module_id(module: &Value) -> Option<u64> {
    match module.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn collect_ids<'v>(modules: impl Iterator<Item = &'v Value>, used: &mut AHashSet<u64>) {
    for module in modules {
        if let Some(id) = module_id(module) {
            used.insert(id);
        }
        let routes = module.get("routes").and_then(Value::as_array);
        for route in routes.into_iter().flatten() {
            let flow = route.get("flow").and_then(Value::as_array);
            collect_ids(flow.into_iter().flatten(), used);
        }
    }
}

fn connection_from_json(entry: &Value) -> Option<Connection> {
    let key = |field: &str| match entry.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    let port = |field: &str| {
        let raw = entry.get(field).and_then(Value::as_u64).unwrap_or(0);
        usize::try_from(raw).unwrap_or(usize::MAX)
    };
    Some(Connection {
        from: key("from")?,
        from_port: port("fromPort"),
        to: key("to")?,
        to_port: port("toPort"),
        kind: entry
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or(MAIN_CONNECTION)
            .to_string(),
    })
}

/// Flattens nested module chains into nodes and edges.
struct ChainParser {
    used: AHashSet<u64>,
    next_free: u64,
    nodes: Vec<WorkflowNode>,
    connections: Vec<Connection>,
}

impl ChainParser {
    fn parse_chain<'v>(
        &mut self,
        modules: impl Iterator<Item = &'v Value>,
        mut predecessor: Option<(String, usize)>,
    ) -> Result<(), ValidationError> {
        for module in modules {
            let node = self.parse_module(module)?;
            let key = node.key.clone();
            self.nodes.push(node);

            if let Some((from, from_port)) = predecessor.take() {
                self.connections.push(Connection {
                    from,
                    from_port,
                    to: key.clone(),
                    to_port: 0,
                    kind: MAIN_CONNECTION.to_string(),
                });
            }

            let routes = module.get("routes").and_then(Value::as_array);
            for (port, route) in routes.into_iter().flatten().enumerate() {
                let flow = route.get("flow").and_then(Value::as_array);
                self.parse_chain(flow.into_iter().flatten(), Some((key.clone(), port)))?;
            }
            predecessor = Some((key, 0));
        }
        Ok(())
    }

    fn parse_module(&mut self, module: &Value) -> Result<WorkflowNode, ValidationError> {
        let Some(obj) = module.as_object() else {
            return Err(ValidationError::Malformed(
                "flow entry is not an object".to_string(),
            ));
        };
        let Some(module_type) = obj.get("module").and_then(Value::as_str) else {
            return Err(ValidationError::Malformed(format!(
                "module {} has no 'module' type",
                obj.get("id").map(Value::to_string).unwrap_or_default()
            )));
        };
        let id = match module_id(module) {
            Some(id) => id,
            None => self.allocate_id(),
        };

        // Static parameters first, mapped fields on top.
        let mut parameters = Map::new();
        for section in ["parameters", "mapper"] {
            if let Some(Value::Object(values)) = obj.get(section) {
                for (k, v) in values {
                    parameters.insert(k.clone(), v.clone());
                }
            }
        }

        let metadata = obj.get("metadata");
        let designer = metadata.and_then(|m| m.get("designer"));
        let position = designer.and_then(|d| {
            Some([d.get("x")?.as_f64()?, d.get("y")?.as_f64()?])
        });

        Ok(WorkflowNode {
            id: Some(id.to_string()),
            key: id.to_string(),
            name: designer
                .and_then(|d| d.get("name"))
                .and_then(Value::as_str)
                .map(String::from),
            node_type: module_type.to_string(),
            parameters: Value::Object(parameters),
            position,
            type_version: obj.get("version").and_then(Value::as_f64),
            provenance: metadata
                .and_then(|m| m.get("provenance"))
                .and_then(|p| serde_json::from_value::<Provenance>(p.clone()).ok()),
        })
    }

    fn allocate_id(&mut self) -> u64 {
        while self.used.contains(&self.next_free) {
            self.next_free += 1;
        }
        self.used.insert(self.next_free);
        self.next_free
    }
}

/// Lays a node graph out as module chains.
///
/// Every node continues the chain of its first declared producer. Other
/// incoming edges (merges), self loops, cycles and edges to unknown modules
/// have no place in the format and end up in `unresolved`.
struct Assembler<'w> {
    workflow: &'w Workflow,
    children: Vec<Vec<(usize, usize)>>,
    has_parent: Vec<bool>,
    visited: Vec<bool>,
    next_id: u64,
    unresolved: Vec<Value>,
    warnings: Vec<String>,
    synthetic: usize,
    placed: usize,
}

impl<'w> Assembler<'w> {
    fn new(workflow: &'w Workflow) -> Self {
        let count = workflow.nodes.len();
        let next_id = workflow
            .nodes
            .iter()
            .filter_map(|n| n.key.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            workflow,
            children: vec![Vec::new(); count],
            has_parent: vec![false; count],
            visited: vec![false; count],
            next_id,
            unresolved: Vec::new(),
            warnings: Vec::new(),
            synthetic: 0,
            placed: 0,
        }
    }

    fn build(&mut self) -> Vec<Vec<Value>> {
        let workflow = self.workflow;
        let index: AHashMap<&str, usize> = workflow
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.key.as_str(), i))
            .collect();

        for edge in &workflow.connections {
            let from = index.get(edge.from.as_str()).copied();
            let to = index.get(edge.to.as_str()).copied();
            match (from, to) {
                (Some(from), Some(to)) if from == to => self.unresolve(edge, "self loop"),
                (Some(_), Some(to)) if self.has_parent[to] => {
                    self.unresolve(edge, "merge into a module that already has a producer")
                }
                (Some(from), Some(to)) => {
                    self.has_parent[to] = true;
                    self.children[from].push((edge.from_port, to));
                }
                _ => self.unresolve(edge, "unknown endpoint"),
            }
        }
        for children in &mut self.children {
            children.sort_by_key(|(port, _)| *port);
        }

        let mut chains = Vec::new();
        for start in 0..workflow.nodes.len() {
            if !self.has_parent[start] && !self.visited[start] {
                chains.push(self.chain(start));
            }
        }
        // Whatever is left is only reachable through a cycle.
        for start in 0..workflow.nodes.len() {
            if !self.visited[start] {
                self.warnings.push(format!(
                    "Module '{}' is part of a cycle; its chain was started separately",
                    workflow.nodes[start].key
                ));
                chains.push(self.chain(start));
            }
        }
        chains
    }

    fn chain(&mut self, start: usize) -> Vec<Value> {
        let workflow = self.workflow;
        let mut modules = Vec::new();
        let mut current = start;

        loop {
            self.visited[current] = true;
            let node = &workflow.nodes[current];
            let mut module = render_module(node);

            let mut next = Vec::new();
            for (port, child) in self.children[current].clone() {
                if self.visited[child] {
                    let edge = Connection {
                        from: node.key.clone(),
                        from_port: port,
                        to: workflow.nodes[child].key.clone(),
                        to_port: 0,
                        kind: MAIN_CONNECTION.to_string(),
                    };
                    self.unresolve(&edge, "cycle");
                } else {
                    next.push(child);
                }
            }
            self.placed += next.len();

            let is_router = node.node_type == FLOW_GRAPH_ROUTER_TYPE;
            match next.as_slice() {
                [] => {
                    modules.push(module);
                    break;
                }
                [only] if !is_router => {
                    modules.push(module);
                    current = *only;
                }
                _ => {
                    let routes: Vec<Value> = next
                        .iter()
                        .map(|&child| json!({ "flow": self.chain(child) }))
                        .collect();
                    if is_router {
                        module["routes"] = Value::Array(routes);
                        modules.push(module);
                    } else {
                        modules.push(module);
                        modules.push(self.synthetic_router(node, routes));
                    }
                    break;
                }
            }
        }
        modules
    }

    fn synthetic_router(&mut self, after: &WorkflowNode, routes: Vec<Value>) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.synthetic += 1;
        let [x, y] = after.position.unwrap_or([0.0, 0.0]);
        json!({
            "id": id,
            "module": FLOW_GRAPH_ROUTER_TYPE,
            "version": 1,
            "mapper": null,
            "metadata": { "designer": { "x": number_to_json(x + 150.0), "y": number_to_json(y) } },
            "routes": routes,
        })
    }

    fn unresolve(&mut self, edge: &Connection, reason: &str) {
        self.warnings.push(format!(
            "Connection {} -> {} cannot be expressed in a flow-graph document ({}); listed under metadata.unresolvedConnections",
            edge.from, edge.to, reason
        ));
        self.unresolved.push(json!({
            "from": edge.from,
            "fromPort": edge.from_port,
            "to": edge.to,
            "toPort": edge.to_port,
            "kind": edge.kind,
            "reason": reason,
        }));
    }
}

fn render_module(node: &WorkflowNode) -> Value {
    let id = match node.key.parse::<u64>() {
        Ok(id) => Value::from(id),
        Err(_) => Value::String(node.key.clone()),
    };
    let [x, y] = node.position.unwrap_or([0.0, 0.0]);
    let mut designer = Map::new();
    designer.insert("x".to_string(), number_to_json(x));
    designer.insert("y".to_string(), number_to_json(y));
    if let Some(name) = &node.name {
        designer.insert("name".to_string(), Value::String(name.clone()));
    }

    let mut metadata = Map::new();
    metadata.insert("designer".to_string(), Value::Object(designer));
    if let Some(provenance) = &node.provenance {
        if let Ok(value) = serde_json::to_value(provenance) {
            metadata.insert("provenance".to_string(), value);
        }
    }

    json!({
        "id": id,
        "module": node.node_type,
        "version": number_to_json(node.type_version.unwrap_or(1.0)),
        "parameters": {},
        "mapper": node.parameters,
        "metadata": metadata,
    })
}
