use crate::dialect::Platform;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The serialized form of a mapping database, as maintained by hand or by
/// catalog tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDatabase {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Entries keyed by the source node type they convert.
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub fallbacks: Vec<FallbackTemplate>,
}

/// How one node type converts into a node type of the other platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    /// Filled in from the database key when omitted.
    #[serde(default)]
    pub source_type: String,
    pub target_type: String,
    /// Source parameter path to target parameter path. Paths are dot
    /// separated and numeric segments index arrays.
    #[serde(default)]
    pub parameter_path_map: BTreeMap<String, String>,
    /// Per source path, replacements for specific values (e.g. enum members
    /// that are spelled differently on each platform).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_substitutions: Option<BTreeMap<String, BTreeMap<String, Value>>>,
    /// Static target parameters, written before anything is copied over.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    /// Copy top-level parameters that no path in `parameter_path_map` covers.
    #[serde(default)]
    pub passthrough_unmapped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<f64>,
}

impl MappingEntry {
    /// The replacement for `value` found at `source_path`, if one is listed.
    pub fn substitution(&self, source_path: &str, value: &Value) -> Option<&Value> {
        let table = self.value_substitutions.as_ref()?.get(source_path)?;
        match value {
            Value::String(s) => table.get(s),
            Value::Number(_) | Value::Bool(_) | Value::Null => table.get(&value.to_string()),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Whether any mapped source path starts at the top-level key `key`.
    pub fn covers_top_level(&self, key: &str) -> bool {
        self.parameter_path_map
            .keys()
            .any(|path| path.split('.').next() == Some(key))
    }
}

/// A generic conversion used when a node type has no entry of its own, chosen
/// by hints about the node's type or parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackTemplate {
    pub category: String,
    pub target_platform: Platform,
    /// Case-insensitive substrings of the source node type.
    #[serde(default)]
    pub type_hints: Vec<String>,
    /// Parameter paths that must all be present.
    #[serde(default)]
    pub parameter_hints: Vec<String>,
    pub mapping: MappingEntry,
}
