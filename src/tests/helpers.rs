//! Shared test utilities for index and synchronization testing

use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    diagnostic::CollectingSink, error::TagbaseError, source::FileSource, sync::SyncService,
};

/// A YAML-fronted document with the given title, tags and body.
pub fn doc(title: &str, tags: &[&str], body: &str) -> String {
    let mut text = format!("---\ntitle: {title}\ntags:\n");
    for tag in tags {
        text.push_str(&format!("  - {tag}\n"));
    }
    text.push_str("---\n");
    text.push_str(body);
    text
}

/// A document whose header is missing the required `tags` field.
pub fn doc_without_tags(title: &str) -> String {
    format!("---\ntitle: {title}\n---\nNo tags here.\n")
}

/// In-memory [`FileSource`]. Content is captured when a read starts, so a configured delay
/// simulates a slow read of the file as it was at that moment.
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    delays: RwLock<HashMap<PathBuf, Duration>>,
    unreadable: RwLock<HashSet<PathBuf>>,
    reads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn write(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .write()
            .insert(path.into(), content.into().into_bytes());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files.write().remove(path.as_ref());
    }

    pub fn set_delay(&self, path: impl Into<PathBuf>, delay: Duration) {
        self.delays.write().insert(path.into(), delay);
    }

    /// Reads of `path` fail with a non-"not found" I/O error.
    pub fn set_unreadable(&self, path: impl Into<PathBuf>, unreadable: bool) {
        let path = path.into();
        if unreadable {
            self.unreadable.write().insert(path);
        } else {
            self.unreadable.write().remove(&path);
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, TagbaseError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let unreadable = self.unreadable.read().contains(path);
        let content = self.files.read().get(path).cloned();
        let delay = self.delays.read().get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unreadable {
            return Err(TagbaseError::Io("IOError: simulated read failure".to_string()));
        }
        content.ok_or_else(|| TagbaseError::NotFound(format!("{path:?}")))
    }

    async fn list(&self, root: &Path) -> Result<Vec<PathBuf>, TagbaseError> {
        Ok(self
            .files
            .read()
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect())
    }
}

/// A sync service over a fresh [`MemorySource`], collecting its diagnostics.
pub fn memory_sync() -> (SyncService, Arc<MemorySource>, Arc<CollectingSink>) {
    let source = MemorySource::new();
    let sink = Arc::new(CollectingSink::new());
    let sync = SyncService::new(source.clone(), sink.clone());
    (sync, source, sink)
}

pub fn paths(list: &[&str]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = list.iter().map(PathBuf::from).collect();
    paths.sort();
    paths
}

pub fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
