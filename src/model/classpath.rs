//! Production class-model backend.
//!
//! The surrounding build scans the compile classpath and serializes every
//! class the layouts can reference, together with `@BindingAdapter` and
//! `@InverseMethod` registrations, into one index file. The compiler only
//! deserializes and queries it.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{BindError, BindErrorKind, BindResult};

use super::{BindingAdapterRecord, ClassModelProvider, ClassRecord, InverseMethodRecord};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClasspathIndex {
    classes: FnvHashMap<String, ClassRecord>,
    adapters: Vec<BindingAdapterRecord>,
    inverse_methods: Vec<InverseMethodRecord>,
}

impl ClasspathIndex {
    pub fn new() -> ClasspathIndex {
        ClasspathIndex::default()
    }

    pub fn add_class(&mut self, record: ClassRecord) {
        self.classes.insert(record.name.clone(), record);
    }

    pub fn add_adapter(&mut self, record: BindingAdapterRecord) {
        self.adapters.push(record);
    }

    pub fn add_inverse_method(&mut self, record: InverseMethodRecord) {
        self.inverse_methods.push(record);
    }

    pub fn load(path: &Path) -> BindResult<ClasspathIndex> {
        log::debug!("loading classpath index from {}", path.display());
        let file = File::open(path)?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| BindError {
            msg: format!("malformed classpath index {}: {}", path.display(), e),
            src: vec![],
            kind: BindErrorKind::IO,
        })
    }

    pub fn save(&self, path: &Path) -> BindResult {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| BindError {
            msg: format!("cannot write classpath index {}: {}", path.display(), e),
            src: vec![],
            kind: BindErrorKind::IO,
        })
    }
}

impl ClassModelProvider for ClasspathIndex {
    fn class_record(&self, fqcn: &str) -> Option<&ClassRecord> {
        self.classes.get(fqcn)
    }

    fn adapters(&self) -> &[BindingAdapterRecord] {
        &self.adapters
    }

    fn inverse_methods(&self) -> &[InverseMethodRecord] {
        &self.inverse_methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> ClasspathIndex {
        let mut index = ClasspathIndex::new();
        index.add_class(ClassRecord {
            name: "com.example.User".into(),
            superclass: Some("java.lang.Object".into()),
            interfaces: vec![],
            is_interface: false,
            methods: vec![],
            fields: vec![],
        });
        index.add_adapter(BindingAdapterRecord {
            attribute: "android:text".into(),
            view_type: "android.widget.TextView".into(),
            value_type: "java.lang.CharSequence".into(),
            declaring_class: "com.example.Adapters".into(),
            method: "setText".into(),
        });
        index
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = std::env::temp_dir().join("databind-classpath-index-test.bin");
        let index = sample_index();
        index.save(&path).unwrap();
        let loaded = ClasspathIndex::load(&path).unwrap();
        assert!(loaded.class_record("com.example.User").is_some());
        assert_eq!(loaded.adapters().len(), 1);
        assert_eq!(loaded.adapters()[0].method, "setText");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_index_is_io_error() {
        let err = ClasspathIndex::load(Path::new("/nonexistent/index.bin")).unwrap_err();
        assert_eq!(err.kind, BindErrorKind::IO);
    }
}
