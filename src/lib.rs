//! # tagbase
//!
//! A Rust library for indexing a folder of markdown documents by hierarchical tags and keeping
//! that index synchronized with the file system.
//!
//! ## Overview
//!
//! Every document carries a frontmatter header with a `title` and a list of dot-separated
//! `tags` (`backend.database.postgres`). tagbase parses those headers into an in-memory
//! [`cache::DocumentCache`] and a [`tags::TagTrie`], then answers exact and wildcard tag
//! queries against them. File changes are reconciled incrementally, one at a time, through a
//! sequential work queue.
//!
//! ### Key Features
//!
//! - **Hierarchical tags**: asking for `backend` also finds documents tagged `backend.auth`
//! - **Wildcards**: `*` matches one segment, `**` matches zero or more
//! - **Silent recovery**: invalid documents are reported and left out; fixing the file is enough
//!   to bring them back
//! - **Ordered synchronization**: overlapping file events are never processed concurrently
//! - **Single-level link expansion**: linked documents are appended to a body on demand, without
//!   following links inside them
//!
//! ## Architecture
//!
//! - **[`codec`]**: frontmatter and inline link parsing
//! - **[`tags`]**: the tag trie and its flat exact-tag index
//! - **[`cache`]**: the document cache
//! - **[`sync`]**: the reconciliation state machine
//! - **[`queue`]**: the sequential work queue
//! - **[`resolve`]**: single-level link resolution and body assembly
//! - **[`source`]** / **[`notifier`]** / **[`diagnostic`]**: collaborators for reading files,
//!   receiving change notifications, and reporting failures
//! - **[`watch`]**: [`watch::TagbaseService`], the facade wiring all of the above together
//!
//! ## Quick Start
//!
//! ### One-shot indexing
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tagbase::{diagnostic::TracingSink, source::FsSource, sync::SyncService};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sync = SyncService::new(Arc::new(FsSource), Arc::new(TracingSink));
//!     sync.synchronize_batch(&["./Memory/db.md".into(), "./Memory/auth.md".into()])
//!         .await;
//!
//!     for path in sync.query_wildcard("backend.*") {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Document format
//!
//! ```markdown
//! ---
//! title: Postgres tuning
//! tags:
//!   - backend.database.postgres
//!   - ops.performance
//! priority: 2
//! ---
//! Body text, possibly with [links](./related.md).
//! ```
//!
//! TOML headers delimited by `+++` are accepted too. Fields other than `title` and `tags` are
//! kept as opaque metadata.
//!
//! ### Live service (requires `service` feature)
//!
//! See [`watch`] for [`watch::TagbaseService`], which populates the index from a root folder and
//! then follows file changes.
//!
//! ## Features
//!
//! - **service** (default): file watching through `notify` and `notify-debouncer-full`
//! - **bin**: the `tagbase` command line tool

pub mod cache;
pub mod codec;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod event;
pub mod notifier;
pub mod queue;
pub mod resolve;
pub mod source;
pub mod sync;
pub mod tags;
pub mod watch;

pub use error::*;
