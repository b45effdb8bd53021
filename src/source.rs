use async_trait::async_trait;
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::TagbaseError;

/// Where document bytes come from.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the full contents of `path`. A missing file is [`TagbaseError::NotFound`].
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, TagbaseError>;

    /// Every file below `root`, sorted. Callers filter with a [`PathFilter`].
    async fn list(&self, root: &Path) -> Result<Vec<PathBuf>, TagbaseError>;

    /// Read `path` as UTF-8 text.
    async fn read_string(&self, path: &Path) -> Result<String, TagbaseError> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes)
            .map_err(|e| TagbaseError::Io(format!("{path:?} is not valid UTF-8: {e}")))
    }
}

/// Reads from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

#[async_trait]
impl FileSource for FsSource {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, TagbaseError> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn list(&self, root: &Path) -> Result<Vec<PathBuf>, TagbaseError> {
        let root = root.to_path_buf();
        let listed = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, TagbaseError> {
            if !root.is_dir() {
                return Err(TagbaseError::NotFound(format!(
                    "document root {root:?} is not a directory"
                )));
            }
            let mut files = Vec::new();
            for entry in WalkDir::new(&root).follow_links(false) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        files.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("[FsSource] Skipping unreadable entry: {}", e);
                    }
                }
            }
            files.sort();
            Ok(files)
        })
        .await??;
        Ok(listed)
    }
}

/// Decides which paths under a document root are candidate documents.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    matcher: GlobMatcher,
    ignore_hidden: bool,
}

impl PathFilter {
    pub fn new(root: &Path, glob: &str, ignore_hidden: bool) -> Result<Self, TagbaseError> {
        let matcher = Glob::new(glob)?.compile_matcher();
        Ok(PathFilter {
            root: root.to_path_buf(),
            matcher,
            ignore_hidden,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if `path` lies under the root, matches the glob relative to the root, and (when
    /// hidden files are ignored) has no component starting with `.`.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if self.ignore_hidden && is_hidden(relative) {
            return false;
        }
        self.matcher.is_match(relative)
    }

    /// True if `path` lies under the root and is not hidden, whether or not it matches the glob.
    /// Deleted directories are recognised this way.
    pub fn contains(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(relative) => !(self.ignore_hidden && is_hidden(relative)),
            Err(_) => false,
        }
    }
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
    })
}
