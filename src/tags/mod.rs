//! Hierarchical tag index.
//!
//! Tags are dot-separated paths (`backend.database.postgres`). The [`TagTrie`] stores one node
//! per segment, and every node accumulates the documents tagged at *or below* it, so asking for
//! `backend` also returns a document tagged `backend.database.postgres`.
//!
//! # Module Organization
//!
//! - [`trie`]: the [`TagTrie`] and its [`TagNode`]s, plus the flat exact-tag index kept in
//!   lockstep with the trie
//!
//! # Wildcards
//!
//! [`TagTrie::query_wildcard`] accepts patterns where `*` matches exactly one segment and `**`
//! matches zero or more segments:
//!
//! ```rust
//! use std::path::PathBuf;
//! use tagbase::tags::TagTrie;
//!
//! let mut trie = TagTrie::default();
//! trie.add("/m/db.md", &["backend.database.postgres".to_string()]);
//! trie.add("/m/auth.md", &["backend.auth".to_string()]);
//!
//! assert_eq!(trie.query_wildcard("*.auth"), vec![PathBuf::from("/m/auth.md")]);
//! assert_eq!(trie.query_wildcard("**.postgres"), vec![PathBuf::from("/m/db.md")]);
//! assert_eq!(trie.query_wildcard("backend.*").len(), 2);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

mod trie;

#[cfg(test)]
mod tests;

pub use trie::{TagNode, TagTrie};

/// Separator between the segments of a tag path.
pub const TAG_SEPARATOR: char = '.';

/// Pattern segment matching exactly one trie level.
pub const SINGLE_WILDCARD: &str = "*";

/// Pattern segment matching zero or more trie levels.
pub const MULTI_WILDCARD: &str = "**";

static TAG_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s.*]+(\.[^\s.*]+)*$").expect("tag path regex is a valid literal")
});

/// Returns true if `tag` is a well-formed tag path: one or more non-empty segments joined by
/// `.`, with no whitespace and no wildcard characters inside a segment.
pub fn is_valid_tag_path(tag: &str) -> bool {
    TAG_PATH.is_match(tag)
}

/// Returns true if `pattern` contains a wildcard segment and so needs a trie walk rather than a
/// direct lookup.
pub fn is_wildcard_pattern(pattern: &str) -> bool {
    pattern
        .split(TAG_SEPARATOR)
        .any(|segment| segment == SINGLE_WILDCARD || segment == MULTI_WILDCARD)
}
