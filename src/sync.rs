//! Reconciliation of the document cache and tag trie against file changes.
//!
//! Every document is either absent from the index or present with its tags installed. There is
//! no tracked "invalid" state: [`SyncService::reconcile`] installs a document when it parses and
//! validates, and evicts it otherwise, regardless of what was there before. A broken file that
//! gets fixed is picked up again by the next change notification with no extra bookkeeping.

use parking_lot::{RwLock, RwLockReadGuard};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    cache::{DocumentCache, DocumentRecord},
    codec::{parse_document, ParsedDocument},
    diagnostic::{Diagnostic, DiagnosticSink},
    error::{ErrorKind, TagbaseError},
    event::IndexEvent,
    source::FileSource,
    tags::TagTrie,
};

/// The cache and the trie, always mutated together under one write lock.
#[derive(Debug, Clone, Default)]
pub struct IndexState {
    trie: TagTrie,
    cache: DocumentCache,
}

impl IndexState {
    pub fn trie(&self) -> &TagTrie {
        &self.trie
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Replace whatever is indexed at `record.path` with `record`.
    fn install(&mut self, record: DocumentRecord) {
        if let Some(previous) = self.cache.take(&record.path) {
            self.trie.remove(&previous.path, &previous.tags);
        }
        self.trie.add(&record.path, &record.tags);
        self.cache.insert(record);
    }

    fn evict(&mut self, path: &Path) -> bool {
        match self.cache.take(path) {
            Some(previous) => {
                self.trie.remove(path, &previous.tags);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.trie.clear();
        self.cache.clear();
    }
}

/// Outcome of [`SyncService::synchronize_batch`]. Every input path lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub indexed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct SyncService {
    state: Arc<RwLock<IndexState>>,
    source: Arc<dyn FileSource>,
    diagnostics: Arc<dyn DiagnosticSink>,
    events: Option<UnboundedSender<IndexEvent>>,
}

impl SyncService {
    pub fn new(source: Arc<dyn FileSource>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        SyncService {
            state: Arc::new(RwLock::new(IndexState::default())),
            source,
            diagnostics,
            events: None,
        }
    }

    /// Emit an [`IndexEvent`] for every completed change.
    pub fn with_events(mut self, events: UnboundedSender<IndexEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn source(&self) -> Arc<dyn FileSource> {
        self.source.clone()
    }

    pub fn diagnostics(&self) -> Arc<dyn DiagnosticSink> {
        self.diagnostics.clone()
    }

    /// Read access to the current index. Do not hold the guard across an `.await`.
    pub fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read()
    }

    /// Read, parse and validate `path`, then install or evict it. Returns true if the document is
    /// indexed afterwards. Failures are reported, never returned.
    pub async fn on_create_or_change(&self, path: &Path) -> bool {
        match self.source.read_string(path).await {
            Ok(raw) => self.reconcile(path, parse_document(&raw)),
            Err(e) => {
                self.report_failure(path, &e);
                self.evict(path);
                false
            }
        }
    }

    /// Like [`on_create_or_change`](Self::on_create_or_change), except that a file which no
    /// longer exists is treated as deleted rather than reported.
    pub async fn refresh(&self, path: &Path) -> bool {
        match self.source.read_string(path).await {
            Ok(raw) => self.reconcile(path, parse_document(&raw)),
            Err(e) if e.is_not_found() => {
                tracing::debug!("[SyncService] {:?} is gone, evicting", path);
                self.on_delete(path);
                false
            }
            Err(e) => {
                self.report_failure(path, &e);
                self.evict(path);
                false
            }
        }
    }

    /// The single state transition: success installs, failure reports and evicts.
    pub fn reconcile(&self, path: &Path, parsed: Result<ParsedDocument, TagbaseError>) -> bool {
        match parsed {
            Ok(parsed) => {
                let record = DocumentRecord::from_parsed(path, parsed);
                let tags = record.tags.clone();
                self.state.write().install(record);
                tracing::debug!("[SyncService] Indexed {:?} with tags {:?}", path, tags);
                self.emit(IndexEvent::DocumentIndexed {
                    path: path.to_path_buf(),
                    tags,
                });
                true
            }
            Err(e) => {
                self.report_failure(path, &e);
                self.evict(path);
                false
            }
        }
    }

    /// Evict `path`. Returns true if it was indexed.
    pub fn on_delete(&self, path: &Path) -> bool {
        self.evict(path)
    }

    /// Evict `path`, or when `path` is not itself indexed, every document below it. Used for
    /// deletions whose target may have been a directory. Returns how many documents were removed.
    pub fn on_delete_tree(&self, path: &Path) -> usize {
        let removed: Vec<PathBuf> = {
            let mut state = self.state.write();
            if state.evict(path) {
                vec![path.to_path_buf()]
            } else {
                let under = state.cache.paths_under(path);
                under
                    .into_iter()
                    .filter(|p| state.evict(p))
                    .collect()
            }
        };
        for path in removed.iter() {
            tracing::debug!("[SyncService] Evicted {:?}", path);
            self.emit(IndexEvent::DocumentEvicted { path: path.clone() });
        }
        removed.len()
    }

    /// Run [`on_create_or_change`](Self::on_create_or_change) for each path in order. One path's
    /// failure never stops the rest.
    #[tracing::instrument(skip_all, fields(count = paths.len()))]
    pub async fn synchronize_batch(&self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            if self.on_create_or_change(path).await {
                report.indexed.push(path.clone());
            } else {
                report.failed.push(path.clone());
            }
        }
        tracing::info!(
            "[SyncService] Batch complete: {} indexed, {} failed",
            report.indexed.len(),
            report.failed.len()
        );
        report
    }

    pub fn clear(&self) {
        self.state.write().clear();
        tracing::debug!("[SyncService] Index cleared");
        self.emit(IndexEvent::Cleared);
    }

    pub fn query_exact(&self, tag: &str) -> Vec<PathBuf> {
        self.state.read().trie.query_exact(tag)
    }

    pub fn query_wildcard(&self, pattern: &str) -> Vec<PathBuf> {
        self.state.read().trie.query_wildcard(pattern)
    }

    pub fn get_document(&self, path: &Path) -> Option<DocumentRecord> {
        self.state.read().cache.get(path).cloned()
    }

    pub fn has(&self, path: &Path) -> bool {
        self.state.read().cache.has(path)
    }

    pub fn get_all_tags(&self) -> Vec<String> {
        self.state.read().trie.all_tags()
    }

    pub fn get_tags_for_document(&self, path: &Path) -> Vec<String> {
        self.state.read().trie.tags_for_document(path)
    }

    pub fn document_count(&self) -> usize {
        self.state.read().cache.len()
    }

    fn evict(&self, path: &Path) -> bool {
        let removed = self.state.write().evict(path);
        if removed {
            tracing::debug!("[SyncService] Evicted {:?}", path);
            self.emit(IndexEvent::DocumentEvicted {
                path: path.to_path_buf(),
            });
        }
        removed
    }

    fn report_failure(&self, path: &Path, error: &TagbaseError) {
        let message = match error.kind() {
            ErrorKind::StructuralParse => "Document frontmatter could not be parsed",
            ErrorKind::Validation => "Document frontmatter failed validation",
            ErrorKind::Io => "Document could not be read",
            ErrorKind::Resolution | ErrorKind::Other => "Document could not be indexed",
        };
        self.diagnostics
            .report(Diagnostic::from_error(message, path, error));
    }

    fn emit(&self, event: IndexEvent) {
        if let Some(tx) = self.events.as_ref() {
            if let Err(e) = tx.send(event) {
                tracing::debug!("[SyncService] Event receiver dropped: {}", e);
            }
        }
    }
}
