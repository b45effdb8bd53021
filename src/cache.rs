use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::codec::ParsedDocument;

/// One parsed, currently valid document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub path: PathBuf,
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// When this record was last (re)indexed.
    pub last_modified: SystemTime,
}

impl DocumentRecord {
    pub fn from_parsed(path: impl Into<PathBuf>, parsed: ParsedDocument) -> DocumentRecord {
        DocumentRecord {
            path: path.into(),
            title: parsed.frontmatter.title,
            tags: parsed.frontmatter.tags,
            body: parsed.body,
            metadata: parsed.frontmatter.metadata,
            last_modified: SystemTime::now(),
        }
    }
}

/// Keyed store of [`DocumentRecord`]s. Holds no validation logic; whatever is inserted is
/// considered valid.
#[derive(Debug, Clone, Default)]
pub struct DocumentCache {
    records: HashMap<PathBuf, DocumentRecord>,
}

impl DocumentCache {
    /// Insert or wholesale replace the record at `record.path`, returning the previous record.
    pub fn insert(&mut self, record: DocumentRecord) -> Option<DocumentRecord> {
        self.records.insert(record.path.clone(), record)
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.records.remove(path).is_some()
    }

    /// Remove and return the record at `path`.
    pub fn take(&mut self, path: &Path) -> Option<DocumentRecord> {
        self.records.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&DocumentRecord> {
        self.records.get(path)
    }

    pub fn has(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// All records, sorted by path.
    pub fn get_all(&self) -> Vec<&DocumentRecord> {
        let mut all: Vec<&DocumentRecord> = self.records.values().collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    /// Paths of every cached record under `dir`, sorted.
    pub fn paths_under(&self, dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .records
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
