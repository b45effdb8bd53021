//! Diagnostics reporting.
//!
//! Every failure the synchronization service or the link resolver swallows is handed to a
//! [`DiagnosticSink`] first. The core never depends on how a sink displays what it receives.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::{ErrorKind, TagbaseError},
    event::IndexEvent,
};

/// A reported failure: what went wrong, where, and the underlying error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub path: PathBuf,
    pub details: String,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        details: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic {
            kind,
            message: message.into(),
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn from_error(message: impl Into<String>, path: &Path, error: &TagbaseError) -> Diagnostic {
        Diagnostic::new(error.kind(), message, path, error.to_string())
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Writes each diagnostic as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            path = %diagnostic.path.display(),
            kind = %diagnostic.kind,
            details = %diagnostic.details,
            "{}",
            diagnostic.message
        );
    }
}

/// Keeps diagnostics in memory until taken.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reported: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.reported.lock())
    }

    pub fn len(&self) -> usize {
        self.reported.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.reported.lock().push(diagnostic);
    }
}

/// Forwards diagnostics into an [`IndexEvent`] stream.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<IndexEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<IndexEvent>) -> Self {
        ChannelSink { tx }
    }
}

impl DiagnosticSink for ChannelSink {
    fn report(&self, diagnostic: Diagnostic) {
        if let Err(e) = self.tx.send(IndexEvent::Diagnostic(diagnostic)) {
            tracing::debug!("Diagnostic receiver dropped: {}", e);
        }
    }
}
