use super::database::MappingEntry;
use super::paths::{get_path, set_path};
use serde_json::{Map, Value};

/// Parameters rewritten through a mapping entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RemappedParameters {
    pub parameters: Value,
    /// Top-level source keys that were neither mapped nor passed through.
    pub dropped: Vec<String>,
}

/// Rewrites source parameters into the target node's shape: defaults first,
/// then mapped paths, with value substitutions applied on the way, then
/// unmapped top-level keys when the entry passes them through.
pub fn remap_parameters(entry: &MappingEntry, source: &Value) -> RemappedParameters {
    let mut parameters = Value::Object(entry.defaults.clone());
    let mut dropped = Vec::new();

    for (from, to) in &entry.parameter_path_map {
        if let Some(value) = get_path(source, from) {
            let value = entry.substitution(from, value).unwrap_or(value).clone();
            set_path(&mut parameters, to, value);
        }
    }

    let empty = Map::new();
    let source_map = source.as_object().unwrap_or(&empty);
    for (key, value) in source_map {
        if entry.covers_top_level(key) {
            continue;
        }
        if !entry.passthrough_unmapped {
            dropped.push(key.clone());
            continue;
        }
        let value = entry.substitution(key, value).unwrap_or(value).clone();
        if let Value::Object(out) = &mut parameters {
            out.entry(key.clone()).or_insert(value);
        }
    }

    RemappedParameters {
        parameters,
        dropped,
    }
}
