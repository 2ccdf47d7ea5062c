use super::database::{FallbackTemplate, MappingDatabase, MappingEntry};
use super::paths::get_path;
use crate::dialect::Platform;
use crate::error::MappingError;
use ahash::AHashMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// The outcome of looking a node type up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Mapped(&'a MappingEntry),
    NotFound,
}

/// Immutable lookup table built once from a `MappingDatabase` and shared by
/// every conversion.
///
/// Entries are keyed by source type. For each explicit entry `S -> T` whose
/// target has no explicit entry of its own, the inverse `T -> S` is derived,
/// so a single database serves both directions.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    version: String,
    entries: AHashMap<String, MappingEntry>,
    fallbacks: Vec<FallbackTemplate>,
}

impl MappingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        let database: MappingDatabase =
            serde_json::from_str(json).map_err(|e| MappingError::JsonParseError(e.to_string()))?;
        Self::from_database(database)
    }

    pub fn from_database(database: MappingDatabase) -> Result<Self, MappingError> {
        let mut explicit: BTreeMap<String, MappingEntry> = BTreeMap::new();
        for (key, mut entry) in database.mappings {
            if entry.source_type.is_empty() {
                entry.source_type = key.clone();
            } else if entry.source_type != key {
                return Err(MappingError::KeyMismatch {
                    key,
                    source_type: entry.source_type,
                });
            }
            if entry.target_type.trim().is_empty() {
                return Err(MappingError::EmptyTargetType(key));
            }
            explicit.insert(key, entry);
        }

        let mut entries: AHashMap<String, MappingEntry> = AHashMap::with_capacity(explicit.len() * 2);
        for entry in explicit.values() {
            if explicit.contains_key(&entry.target_type) || entries.contains_key(&entry.target_type) {
                continue;
            }
            entries.insert(entry.target_type.clone(), invert(entry));
        }
        entries.extend(explicit);

        Ok(Self {
            version: database.version,
            entries,
            fallbacks: database.fallbacks,
        })
    }

    pub fn resolve(&self, source_type: &str) -> Resolution<'_> {
        match self.entries.get(source_type) {
            Some(entry) => Resolution::Mapped(entry),
            None => Resolution::NotFound,
        }
    }

    /// The first fallback template for `target` whose type hints match the
    /// node type, or whose parameter hints are all present.
    pub fn fallback_for(
        &self,
        node_type: &str,
        parameters: &Value,
        target: Platform,
    ) -> Option<&FallbackTemplate> {
        let lowered = node_type.to_lowercase();
        self.fallbacks
            .iter()
            .filter(|t| t.target_platform == target)
            .find(|t| {
                let type_match = t
                    .type_hints
                    .iter()
                    .any(|hint| !hint.is_empty() && lowered.contains(&hint.to_lowercase()));
                let parameter_match = !t.parameter_hints.is_empty()
                    && t.parameter_hints
                        .iter()
                        .all(|path| get_path(parameters, path).is_some());
                type_match || parameter_match
            })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives `T -> S` from `S -> T`. Defaults cannot be inverted, and only
/// substitutions producing strings can be read backwards.
fn invert(entry: &MappingEntry) -> MappingEntry {
    let parameter_path_map = entry
        .parameter_path_map
        .iter()
        .map(|(from, to)| (to.clone(), from.clone()))
        .collect();

    let value_substitutions = entry.value_substitutions.as_ref().map(|subs| {
        subs.iter()
            .map(|(source_path, table)| {
                let target_path = entry
                    .parameter_path_map
                    .get(source_path)
                    .cloned()
                    .unwrap_or_else(|| source_path.clone());
                let inverted = table
                    .iter()
                    .filter_map(|(from, to)| {
                        to.as_str()
                            .map(|to| (to.to_string(), Value::String(from.clone())))
                    })
                    .collect();
                (target_path, inverted)
            })
            .collect()
    });

    MappingEntry {
        source_type: entry.target_type.clone(),
        target_type: entry.source_type.clone(),
        parameter_path_map,
        value_substitutions,
        defaults: Default::default(),
        passthrough_unmapped: entry.passthrough_unmapped,
        target_version: None,
    }
}
