//! # Tagbase Service - Live Tag Index over a Document Folder
//!
//! The `watch` module provides [`TagbaseService`], a long-running service that populates the tag
//! index from a document root and then keeps it synchronized with the file system.
//!
//! ## Overview
//!
//! - **Initial population**: [`TagbaseService::start`] lists every matching file and indexes it
//!   before any live change is processed
//! - **Live synchronization**: change notifications are turned into work items on a
//!   [`SyncQueue`], so reconciliations never interleave
//! - **Silent recovery**: invalid documents are reported and left out; once fixed, the next
//!   change notification brings them back
//! - **Queries**: exact and wildcard tag queries, document lookup, and single-level link
//!   expansion through [`TagbaseService::resolve_and_assemble`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagbase::{config::TagbaseConfig, watch::TagbaseService};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tagbase::TagbaseError> {
//!     let config = TagbaseConfig::default().with_root("./Memory");
//!     let service = TagbaseService::new(config)?;
//!     let report = service.start(Path::new("./Memory"), "**/*.md").await?;
//!     println!("indexed {} documents", report.indexed.len());
//!
//!     for path in service.query_wildcard("backend.*") {
//!         println!("{}", path.display());
//!     }
//!
//!     service.dispose()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Collaborators
//!
//! [`TagbaseService::with_parts`] accepts any [`FileSource`], [`ChangeNotifier`] and
//! [`DiagnosticSink`]. Hosts that already receive file notifications from elsewhere can use an
//! [`ExternalNotifier`](crate::notifier::ExternalNotifier) and push events into it.
//!
//! ## Threading Model
//!
//! - Notifier callbacks run on the notifier's own thread and only enqueue work
//! - The queue worker runs on the tokio runtime captured at construction
//! - Queries take a short read lock on the index and never wait on queued work

use parking_lot::{Mutex, RwLock};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{mpsc::UnboundedSender, oneshot};

#[cfg(feature = "service")]
use std::time::Duration;

#[cfg(feature = "service")]
use crate::{diagnostic::TracingSink, notifier::DebouncedNotifier, source::FsSource};

use crate::{
    cache::DocumentRecord,
    config::TagbaseConfig,
    diagnostic::DiagnosticSink,
    error::TagbaseError,
    event::IndexEvent,
    notifier::{ChangeHandlers, ChangeNotifier},
    queue::SyncQueue,
    resolve::{AssembledDocument, LinkResolver},
    source::{FileSource, PathFilter},
    sync::{BatchReport, SyncService},
};

pub struct TagbaseService {
    config: TagbaseConfig,
    sync: SyncService,
    queue: SyncQueue,
    resolver: LinkResolver,
    notifier: Mutex<Box<dyn ChangeNotifier>>,
    filter: Arc<RwLock<Option<PathFilter>>>,
}

impl TagbaseService {
    /// A service over the local file system, watched with a debounced notifier. Must be called
    /// from within a tokio runtime.
    #[cfg(feature = "service")]
    pub fn new(config: TagbaseConfig) -> Result<Self, TagbaseError> {
        let notifier = DebouncedNotifier::new(Duration::from_millis(config.debounce_ms));
        Ok(Self::with_parts(
            config,
            Arc::new(FsSource),
            Box::new(notifier),
            Arc::new(TracingSink),
            None,
            SyncQueue::current()?,
        ))
    }

    pub fn with_parts(
        config: TagbaseConfig,
        source: Arc<dyn FileSource>,
        notifier: Box<dyn ChangeNotifier>,
        diagnostics: Arc<dyn DiagnosticSink>,
        events: Option<UnboundedSender<IndexEvent>>,
        queue: SyncQueue,
    ) -> Self {
        let mut sync = SyncService::new(source.clone(), diagnostics.clone());
        if let Some(events) = events {
            sync = sync.with_events(events);
        }
        TagbaseService {
            config,
            sync,
            queue,
            resolver: LinkResolver::new(source, diagnostics),
            notifier: Mutex::new(notifier),
            filter: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &TagbaseConfig {
        &self.config
    }

    pub fn sync(&self) -> &SyncService {
        &self.sync
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// The root being watched, if started.
    pub fn root(&self) -> Option<PathBuf> {
        self.filter.read().as_ref().map(|f| f.root().to_path_buf())
    }

    pub fn is_started(&self) -> bool {
        self.filter.read().is_some()
    }

    /// Index every file under `root` matching `glob`, then subscribe to live changes.
    ///
    /// Returns the outcome of the initial batch. Fails if the service is already started, the
    /// glob is invalid, the root cannot be listed, or the notifier cannot watch the root.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, root: &Path, glob: &str) -> Result<BatchReport, TagbaseError> {
        let root = match tokio::fs::canonicalize(root).await {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::debug!("[Watcher] Using {:?} as given ({})", root, e);
                root.to_path_buf()
            }
        };
        let filter = PathFilter::new(&root, glob, self.config.ignore_hidden)?;
        {
            let mut current = self.filter.write();
            if let Some(existing) = current.as_ref() {
                return Err(TagbaseError::Custom(format!(
                    "service is already watching {:?}",
                    existing.root()
                )));
            }
            *current = Some(filter.clone());
        }

        match self.populate_and_subscribe(&root, filter).await {
            Ok(report) => Ok(report),
            Err(e) => {
                *self.filter.write() = None;
                Err(e)
            }
        }
    }

    async fn populate_and_subscribe(
        &self,
        root: &Path,
        filter: PathFilter,
    ) -> Result<BatchReport, TagbaseError> {
        let paths = list_documents(self.sync.source().as_ref(), &filter).await?;
        tracing::info!("[Watcher] Initial sync of {} documents", paths.len());
        let report = self.sync.synchronize_batch(&paths).await;

        let handlers = self.change_handlers(filter);
        self.notifier.lock().watch(root, handlers)?;
        Ok(report)
    }

    fn change_handlers(&self, filter: PathFilter) -> ChangeHandlers {
        let filter = Arc::new(filter);
        let refresh = {
            let (sync, queue, filter) = (self.sync.clone(), self.queue.clone(), filter.clone());
            Arc::new(move |path: PathBuf| {
                if filter.matches(&path) {
                    tracing::debug!("[Watcher] Enqueuing refresh of {:?}", path);
                    let sync = sync.clone();
                    queue.enqueue(async move {
                        sync.refresh(&path).await;
                        Ok(())
                    });
                } else if filter.contains(&path) {
                    // Possibly a directory moved or renamed into the root; notify reports only
                    // the directory itself.
                    tracing::debug!("[Watcher] Enqueuing scan of {:?}", path);
                    let (sync, filter) = (sync.clone(), filter.clone());
                    queue.enqueue(async move {
                        sync_directory(&sync, &filter, &path).await;
                        Ok(())
                    });
                }
            })
        };
        let delete = {
            let (sync, queue) = (self.sync.clone(), self.queue.clone());
            Arc::new(move |path: PathBuf| {
                if !filter.contains(&path) {
                    return;
                }
                tracing::debug!("[Watcher] Enqueuing delete of {:?}", path);
                let sync = sync.clone();
                queue.enqueue(async move {
                    sync.on_delete_tree(&path);
                    Ok(())
                });
            })
        };
        ChangeHandlers {
            on_created: refresh.clone(),
            on_changed: refresh,
            on_deleted: delete,
        }
    }

    /// Unsubscribe from changes and drop queued work that has not started. The index is kept.
    pub fn stop(&self) -> Result<(), TagbaseError> {
        if self.filter.write().take().is_none() {
            return Ok(());
        }
        let dropped = self.queue.clear();
        tracing::info!("[Watcher] Stopped; dropped {} pending work items", dropped);
        self.notifier.lock().unwatch()
    }

    /// Stop, then empty the index.
    pub fn dispose(&self) -> Result<(), TagbaseError> {
        let stopped = self.stop();
        self.sync.clear();
        stopped
    }

    /// Re-read one document through the queue. Returns true if it is indexed afterwards.
    pub async fn refresh_one(&self, path: &Path) -> Result<bool, TagbaseError> {
        let sync = self.sync.clone();
        let path = path.to_path_buf();
        self.run_queued(async move { sync.refresh(&path).await }).await
    }

    /// Index `paths` through the queue, each independently.
    pub async fn synchronize_batch(
        &self,
        paths: Vec<PathBuf>,
    ) -> Result<BatchReport, TagbaseError> {
        let sync = self.sync.clone();
        self.run_queued(async move { sync.synchronize_batch(&paths).await })
            .await
    }

    /// Clear the index and rebuild it from the watched root, serialized with live work.
    pub async fn reindex(&self) -> Result<BatchReport, TagbaseError> {
        let Some(filter) = self.filter.read().clone() else {
            return Err(TagbaseError::Custom(
                "service must be started before reindexing".to_string(),
            ));
        };
        let sync = self.sync.clone();
        self.run_queued(async move {
            sync.clear();
            let paths = list_documents(sync.source().as_ref(), &filter).await?;
            Ok::<_, TagbaseError>(sync.synchronize_batch(&paths).await)
        })
        .await?
    }

    /// Resolves once all queued work has completed.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await
    }

    async fn run_queued<T, F>(&self, work: F) -> Result<T, TagbaseError>
    where
        T: Send + 'static,
        F: std::future::Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.queue.enqueue(async move {
            let _ = tx.send(work.await);
            Ok(())
        });
        rx.await.map_err(|_| {
            TagbaseError::Custom("queued work was dropped before completing".to_string())
        })
    }

    pub fn query_exact(&self, tag: &str) -> Vec<PathBuf> {
        self.sync.query_exact(tag)
    }

    pub fn query_wildcard(&self, pattern: &str) -> Vec<PathBuf> {
        self.sync.query_wildcard(pattern)
    }

    /// Exact query unless `pattern` contains a wildcard segment.
    pub fn query(&self, pattern: &str) -> Vec<PathBuf> {
        if crate::tags::is_wildcard_pattern(pattern) {
            self.query_wildcard(pattern)
        } else {
            self.query_exact(pattern)
        }
    }

    pub fn get_document(&self, path: &Path) -> Option<DocumentRecord> {
        self.sync.get_document(path)
    }

    pub fn get_all_tags(&self) -> Vec<String> {
        self.sync.get_all_tags()
    }

    pub fn get_tags_for_document(&self, path: &Path) -> Vec<String> {
        self.sync.get_tags_for_document(path)
    }

    pub fn document_count(&self) -> usize {
        self.sync.document_count()
    }

    /// Expand each indexed document in `paths`. Paths that are not indexed are skipped.
    pub async fn resolve_and_assemble(&self, paths: &[PathBuf]) -> Vec<AssembledDocument> {
        let mut assembled = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(record) = self.sync.get_document(path) else {
                tracing::debug!("[Watcher] {:?} is not indexed, skipping", path);
                continue;
            };
            assembled.push(
                self.resolver
                    .assemble(&record, &self.config.link_separator)
                    .await,
            );
        }
        assembled
    }
}

impl Drop for TagbaseService {
    fn drop(&mut self) {
        if let Err(e) = self.notifier.get_mut().unwatch() {
            tracing::debug!("[Watcher] Unwatch on drop failed: {}", e);
        }
    }
}

/// Index every document below `dir`. A `dir` that is not a directory lists nothing.
async fn sync_directory(sync: &SyncService, filter: &PathFilter, dir: &Path) -> BatchReport {
    let mut paths = match sync.source().list(dir).await {
        Ok(paths) => paths,
        Err(e) => {
            tracing::debug!("[Watcher] Nothing to scan under {:?}: {}", dir, e);
            return BatchReport::default();
        }
    };
    paths.retain(|p| filter.matches(p));
    if paths.is_empty() {
        return BatchReport::default();
    }
    tracing::info!("[Watcher] Indexing {} documents under {:?}", paths.len(), dir);
    sync.synchronize_batch(&paths).await
}

async fn list_documents(
    source: &dyn FileSource,
    filter: &PathFilter,
) -> Result<Vec<PathBuf>, TagbaseError> {
    let mut paths = source.list(filter.root()).await?;
    paths.retain(|p| filter.matches(p));
    Ok(paths)
}
