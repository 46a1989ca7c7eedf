use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{BindError, BindErrorKind, BindResult};

/// Metadata for one generated binding class, keyed by layout name in
/// [GenClassInfoLog]. Persisted between invocations so incremental builds can
/// tell which classes to keep, regenerate, or delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenClass {
    pub qualified_name: String,
    pub module_package: String,
    /// variable name -> declared type, for data binding layouts.
    pub variables: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenClassInfoLog {
    mappings: BTreeMap<String, GenClass>,
}

impl GenClassInfoLog {
    pub fn new() -> GenClassInfoLog {
        GenClassInfoLog::default()
    }

    pub fn add_mapping(&mut self, layout_name: &str, info: GenClass) {
        self.mappings.insert(layout_name.to_owned(), info);
    }

    pub fn add_all(&mut self, other: GenClassInfoLog) {
        self.mappings.extend(other.mappings);
    }

    pub fn get(&self, layout_name: &str) -> Option<&GenClass> {
        self.mappings.get(layout_name)
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&String, &GenClass)> {
        self.mappings.iter()
    }

    /// Qualified names present in `previous` but no longer generated by this
    /// invocation; the caller deletes the corresponding sources.
    pub fn deletions_since(&self, previous: &GenClassInfoLog) -> Vec<String> {
        previous
            .mappings
            .iter()
            .filter(|(layout, _)| !self.mappings.contains_key(*layout))
            .map(|(_, info)| info.qualified_name.clone())
            .collect()
    }

    pub fn load(path: &Path) -> BindResult<GenClassInfoLog> {
        let file = File::open(path)?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| BindError {
            msg: format!("failed to read class info log {}: {}", path.display(), e),
            src: vec![],
            kind: BindErrorKind::IO,
        })
    }

    pub fn save(&self, path: &Path) -> BindResult {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| BindError {
            msg: format!("failed to write class info log {}: {}", path.display(), e),
            src: vec![],
            kind: BindErrorKind::IO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> GenClass {
        GenClass {
            qualified_name: format!("com.example.databinding.{}", name),
            module_package: "com.example".into(),
            variables: BTreeMap::new(),
        }
    }

    #[test]
    fn deletions_are_computed_against_previous_log() {
        let mut previous = GenClassInfoLog::new();
        previous.add_mapping("removed", info("RemovedBinding"));
        previous.add_mapping("kept", info("KeptBinding"));

        let mut current = GenClassInfoLog::new();
        current.add_mapping("kept", info("KeptBinding"));

        assert_eq!(
            current.deletions_since(&previous),
            vec!["com.example.databinding.RemovedBinding".to_string()]
        );
    }

    #[test]
    fn merge_forward_keeps_unchanged_mappings() {
        let mut unchanged = GenClassInfoLog::new();
        unchanged.add_mapping("old", info("OldBinding"));

        let mut log = GenClassInfoLog::new();
        log.add_all(unchanged);
        log.add_mapping("new", info("NewBinding"));

        assert!(log.get("old").is_some());
        assert!(log.get("new").is_some());
    }
}
