use super::database::{FallbackTemplate, MappingEntry};
use super::table::{MappingTable, Resolution};
use crate::dialect::Platform;
use crate::workflow::WorkflowNode;

/// How a source node becomes a target node.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<'a> {
    /// The node was synthesized by an earlier conversion from the target
    /// platform; it goes back to its original type.
    Restore { original_type: String },
    Mapped(&'a MappingEntry),
    Fallback(&'a FallbackTemplate),
    /// No mapping at all: a stub keeps the parameters verbatim.
    Stub,
}

/// Chooses a `Decision` for each node of one conversion direction.
#[derive(Debug, Clone, Copy)]
pub struct MappingResolver<'a> {
    table: &'a MappingTable,
    source: Platform,
    target: Platform,
}

impl<'a> MappingResolver<'a> {
    pub fn new(table: &'a MappingTable, source: Platform, target: Platform) -> Self {
        Self {
            table,
            source,
            target,
        }
    }

    pub fn decide(&self, node: &WorkflowNode) -> Decision<'a> {
        let resolution = self.table.resolve(&node.node_type);

        if let Some(provenance) = &node.provenance {
            let is_stub = node.node_type == self.source.stub_type();
            if provenance.original_platform == self.target
                && (is_stub || resolution == Resolution::NotFound)
            {
                return Decision::Restore {
                    original_type: provenance.original_type.clone(),
                };
            }
        }

        match resolution {
            Resolution::Mapped(entry) => Decision::Mapped(entry),
            Resolution::NotFound => {
                match self
                    .table
                    .fallback_for(&node.node_type, &node.parameters, self.target)
                {
                    Some(template) => Decision::Fallback(template),
                    None => Decision::Stub,
                }
            }
        }
    }
}
