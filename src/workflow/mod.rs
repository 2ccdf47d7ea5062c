pub mod flow_graph;
pub mod model;
pub mod node_graph;

pub use flow_graph::FlowGraphFormat;
pub use model::*;
pub use node_graph::NodeGraphFormat;

use crate::dialect::Platform;

/// The document format used by a platform.
pub fn format_for(platform: Platform) -> &'static dyn WorkflowFormat {
    match platform {
        Platform::NodeGraph => &NodeGraphFormat,
        Platform::FlowGraph => &FlowGraphFormat,
    }
}
