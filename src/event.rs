use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;

/// Changes to the index, emitted by the synchronization service after each completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexEvent {
    /// A document passed validation and its tags are installed.
    DocumentIndexed { path: PathBuf, tags: Vec<String> },
    /// A previously indexed document was removed, by deletion or failed re-validation.
    DocumentEvicted { path: PathBuf },
    Diagnostic(Diagnostic),
    /// The whole index was emptied.
    Cleared,
}

/// A file system change as seen by a [`ChangeNotifier`](crate::notifier::ChangeNotifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileEvent {
    Created(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Created(path) | FileEvent::Changed(path) | FileEvent::Deleted(path) => path,
        }
    }
}
