//! # Honyaku - Workflow Conversion Engine
//!
//! **Honyaku** converts automation workflows between two JSON formats and
//! their expression dialects:
//!
//! - the **node-graph** format (`{name, nodes, connections}`), whose parameter
//!   strings carry expressions as `={{ $json.field }}`;
//! - the **flow-graph** format (`{name, flow, metadata}`), whose parameter
//!   strings carry expressions as `{{1.field}}`.
//!
//! ## Core Workflow
//!
//! 1.  **Load the mappings**: build a `MappingTable` once from a mapping
//!     database. The table is immutable and can be shared across threads.
//! 2.  **Convert**: use `Converter::builder` to configure a converter and call
//!     `convert` with the source document and the two platforms.
//! 3.  **Inspect the result**: the `ConversionResult` carries the converted
//!     document, the logs, the parameters that need a human to review them and
//!     the nodes that had no mapping.
//!
//! Expressions are parsed into an AST, rewritten into the target dialect and
//! rendered back. Anything that cannot be translated with confidence is kept
//! verbatim and flagged for review rather than guessed.
//!
//! ## Quick Start
//!
//! ```rust
//! use honyaku::prelude::*;
//! use serde_json::json;
//!
//! let table = MappingTable::from_json_str(r#"{
//!     "version": "1",
//!     "mappings": {
//!         "n8n-nodes-base.manualTrigger": { "targetType": "builtin:Trigger" },
//!         "n8n-nodes-base.httpRequest": {
//!             "targetType": "http:ActionSendData",
//!             "parameterPathMap": { "url": "url" }
//!         }
//!     }
//! }"#).unwrap();
//!
//! let document = json!({
//!     "name": "Fetch",
//!     "nodes": [
//!         { "name": "Start", "type": "n8n-nodes-base.manualTrigger", "parameters": {} },
//!         { "name": "Fetch", "type": "n8n-nodes-base.httpRequest",
//!           "parameters": { "url": "={{ \"https://example.com/\" + $json.id }}" } }
//!     ],
//!     "connections": { "Start": { "main": [[{ "node": "Fetch", "type": "main", "index": 0 }]] } }
//! });
//!
//! let result = Converter::builder(&table)
//!     .build()
//!     .convert(&document, Platform::NodeGraph, Platform::FlowGraph);
//!
//! assert_eq!(
//!     result.converted_workflow["flow"][1]["mapper"]["url"],
//!     "https://example.com/{{1.id}}"
//! );
//! assert!(result.unmapped_nodes.is_empty());
//! ```

pub mod ast;
pub mod config;
pub mod dialect;
pub mod error;
pub mod evaluator;
pub mod mapping;
pub mod orchestrator;
pub mod parser;
pub mod prelude;
pub mod review;
pub mod translator;
pub mod walker;
pub mod workflow;
