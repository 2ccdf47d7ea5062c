//! Node type mappings between the two platforms.

mod apply;
mod database;
mod paths;
mod resolver;
mod table;

pub use apply::{RemappedParameters, remap_parameters};
pub use database::{FallbackTemplate, MappingDatabase, MappingEntry};
pub use paths::{get_path, set_path};
pub use resolver::{Decision, MappingResolver};
pub use table::{MappingTable, Resolution};
