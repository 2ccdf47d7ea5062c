//! Prelude module for convenient imports
//!
//! Re-exports the types needed to run a conversion without importing each
//! module individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use honyaku::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let mappings = std::fs::read_to_string("path/to/mappings.json")?;
//! let table = MappingTable::from_json_str(&mappings)?;
//!
//! let document: serde_json::Value =
//!     serde_json::from_str(&std::fs::read_to_string("path/to/workflow.json")?)?;
//! let result = Converter::builder(&table)
//!     .build()
//!     .convert(&document, Platform::NodeGraph, Platform::FlowGraph);
//!
//! println!("{}", serde_json::to_string_pretty(&result.converted_workflow)?);
//! # Ok(())
//! # }
//! ```

// Conversion
pub use crate::config::{ConversionOptions, ExpressionMode};
pub use crate::orchestrator::{
    ConversionJob, ConversionLog, ConversionResult, Converter, LogLevel, convert,
};

// Dialects and expressions
pub use crate::ast::{Expression, Template};
pub use crate::dialect::Platform;
pub use crate::evaluator::{Bindings, EvaluationBudget};
pub use crate::parser::{parse_expression, parse_template};

// Mappings and review
pub use crate::mapping::{MappingDatabase, MappingEntry, MappingTable};
pub use crate::review::ParameterReview;

// Error types
pub use crate::error::{EvaluationError, MappingError, OptionsError, ParseError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
