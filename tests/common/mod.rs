//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tagbase::{
    config::TagbaseConfig, diagnostic::CollectingSink, notifier::ExternalNotifier,
    queue::SyncQueue, source::FsSource, watch::TagbaseService,
};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A YAML-fronted markdown document.
#[allow(dead_code)]
pub fn doc(title: &str, tags: &[&str], body: &str) -> String {
    let tags = tags
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("---\ntitle: {title}\ntags: [{tags}]\n---\n{body}")
}

#[allow(dead_code)]
pub fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Create a `Memory/` folder with two tagged documents, one untagged draft, and a non-document.
///
/// Returns the canonical path of the folder.
///
/// - `db.md` is tagged `backend.database.postgres` and links to `auth.md` and an external site
/// - `auth.md` is tagged `backend.auth`
/// - `drafts/wip.md` has no `tags` field and is excluded from the index
/// - `readme.txt` does not match `**/*.md`
#[allow(dead_code)]
pub fn create_memory_folder(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("Memory");
    std::fs::create_dir(&root).unwrap();
    let root = root.canonicalize().unwrap();

    write(
        &root,
        "db.md",
        &doc(
            "Postgres",
            &["backend.database.postgres"],
            "Tuning notes. See [auth](./auth.md) and [docs](https://www.postgresql.org).\n",
        ),
    );
    write(
        &root,
        "auth.md",
        &doc("Auth", &["backend.auth"], "Token rotation.\n"),
    );
    write(
        &root,
        "drafts/wip.md",
        "---\ntitle: Work in progress\n---\nNot ready.\n",
    );
    write(&root, "readme.txt", "ignored");
    root
}

/// A file-system backed service with a notifier the test drives by hand.
#[allow(dead_code)]
pub fn manual_service(root: &Path) -> (TagbaseService, ExternalNotifier, Arc<CollectingSink>) {
    init_logging();
    let notifier = ExternalNotifier::new();
    let sink = Arc::new(CollectingSink::new());
    let service = TagbaseService::with_parts(
        TagbaseConfig::default().with_root(root),
        Arc::new(FsSource),
        Box::new(notifier.clone()),
        sink.clone(),
        None,
        SyncQueue::current().unwrap(),
    );
    (service, notifier, sink)
}
