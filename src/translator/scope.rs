use ahash::AHashMap;

/// How a node in the workflow being converted is known on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    /// The reference used by the source platform's edges.
    pub source_key: String,
    /// The display name in the source document, if it has one.
    pub source_name: Option<String>,
    /// The numeric id in the source document (flow-graph sources only).
    pub source_position: Option<u64>,
    pub target_id: String,
    pub target_name: String,
    /// The numeric id in the target document (flow-graph targets only).
    pub target_position: Option<u64>,
}

/// The producers feeding a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upstream<'a> {
    None,
    Single(&'a NodeRef),
    /// Several producers; `first` is the one from the first declared edge.
    Ambiguous { first: &'a NodeRef, count: usize },
}

/// Answers the questions the translator asks about the surrounding workflow.
pub trait TranslationScope {
    fn upstream(&self, node_key: &str) -> Upstream<'_>;
    fn by_source_name(&self, name: &str) -> Option<&NodeRef>;
    fn by_source_position(&self, position: u64) -> Option<&NodeRef>;
}

/// A `TranslationScope` backed by plain lookup tables.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    nodes: Vec<NodeRef>,
    by_key: AHashMap<String, usize>,
    by_name: AHashMap<String, usize>,
    by_position: AHashMap<u64, usize>,
    upstream: AHashMap<String, Vec<usize>>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeRef) {
        let index = self.nodes.len();
        self.by_key.entry(node.source_key.clone()).or_insert(index);
        if let Some(name) = &node.source_name {
            self.by_name.entry(name.clone()).or_insert(index);
        }
        if let Some(position) = node.source_position {
            self.by_position.entry(position).or_insert(index);
        }
        self.nodes.push(node);
    }

    /// Records an edge between two source keys. Edges to or from unknown
    /// keys are ignored; repeated edges count once.
    pub fn add_edge(&mut self, from_key: &str, to_key: &str) {
        let Some(&from) = self.by_key.get(from_key) else {
            return;
        };
        if !self.by_key.contains_key(to_key) {
            return;
        }
        let producers = self.upstream.entry(to_key.to_string()).or_default();
        if !producers.contains(&from) {
            producers.push(from);
        }
    }

    pub fn by_key(&self, key: &str) -> Option<&NodeRef> {
        self.by_key.get(key).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }
}

impl TranslationScope for ReferenceTable {
    fn upstream(&self, node_key: &str) -> Upstream<'_> {
        match self.upstream.get(node_key).map(Vec::as_slice) {
            None | Some([]) => Upstream::None,
            Some([only]) => Upstream::Single(&self.nodes[*only]),
            Some(producers) => Upstream::Ambiguous {
                first: &self.nodes[producers[0]],
                count: producers.len(),
            },
        }
    }

    fn by_source_name(&self, name: &str) -> Option<&NodeRef> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    fn by_source_position(&self, position: u64) -> Option<&NodeRef> {
        self.by_position.get(&position).map(|&i| &self.nodes[i])
    }
}
