use std::{fmt, io};

use globset::Error as GlobError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;

#[cfg(feature = "service")]
use notify::{Error as NotifyError, ErrorKind as NotifyErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TagbaseError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Frontmatter parse error: {0}")]
    Parse(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Document validation error: {0}")]
    Validation(String),
    #[error("File watcher error: {0}")]
    Watch(String),
}

/// Coarse classification used when reporting failures to a diagnostics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    StructuralParse,
    Validation,
    Io,
    Resolution,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::StructuralParse => "structural-parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Io => "io",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

impl TagbaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TagbaseError::Parse(_) => ErrorKind::StructuralParse,
            TagbaseError::Validation(_) => ErrorKind::Validation,
            TagbaseError::Io(_) | TagbaseError::NotFound(_) | TagbaseError::PermissionDenied => {
                ErrorKind::Io
            }
            TagbaseError::Config(_)
            | TagbaseError::Custom(_)
            | TagbaseError::Serialization(_)
            | TagbaseError::Watch(_) => ErrorKind::Other,
        }
    }

    /// True when the error means the file is simply gone, as opposed to unreadable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TagbaseError::NotFound(_))
    }
}

impl From<io::Error> for TagbaseError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => TagbaseError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => TagbaseError::PermissionDenied,
            _ => TagbaseError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<serde_yaml::Error> for TagbaseError {
    fn from(src: serde_yaml::Error) -> TagbaseError {
        TagbaseError::Parse(format!("YAML frontmatter is malformed: {src}"))
    }
}

impl From<toml::ser::Error> for TagbaseError {
    fn from(src: toml::ser::Error) -> TagbaseError {
        TagbaseError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<GlobError> for TagbaseError {
    fn from(src: GlobError) -> TagbaseError {
        TagbaseError::Config(format!("Invalid glob pattern: {src}"))
    }
}

impl From<JoinError> for TagbaseError {
    fn from(x: JoinError) -> Self {
        if x.is_panic() {
            TagbaseError::Custom(format!("Task panicked: {x}"))
        } else {
            TagbaseError::Custom(format!("Task was cancelled: {x}"))
        }
    }
}

#[cfg(feature = "service")]
impl From<NotifyError> for TagbaseError {
    fn from(notify_error: NotifyError) -> Self {
        match notify_error.kind {
            NotifyErrorKind::Generic(msg) => TagbaseError::Watch(format!(
                "notify-debouncer: {}, paths: {:?}",
                msg, notify_error.paths
            )),
            NotifyErrorKind::Io(io_error) => TagbaseError::Watch(format!(
                "notify-debouncer: io error {}, paths: {:?}",
                io_error.kind(),
                notify_error.paths
            )),
            NotifyErrorKind::PathNotFound => TagbaseError::NotFound(format!(
                "notify-debouncer: path(s) not found: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::WatchNotFound => TagbaseError::NotFound(format!(
                "notify-debouncer: watch not found, paths: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::InvalidConfig(_) => {
                TagbaseError::Watch("notify-debouncer invalid config".to_string())
            }
            NotifyErrorKind::MaxFilesWatch => {
                TagbaseError::Watch("notify-debouncer max file watch limit reached".to_string())
            }
        }
    }
}
