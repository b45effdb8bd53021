//! Document parsing.
//!
//! Two pure parsers live here, neither of which touches the file system:
//!
//! - [`frontmatter`] splits a document into its structured header and body, then validates the
//!   header's `title` and `tags` fields. Structural problems surface as
//!   [`TagbaseError::Parse`](crate::TagbaseError::Parse) and never reach validation; field
//!   problems surface as [`TagbaseError::Validation`](crate::TagbaseError::Validation).
//! - [`links`] finds inline `[text](target)` links in a body (image links excluded), recording the
//!   byte span of each match so callers can substitute it in place.
//!
//! ```rust
//! use tagbase::codec::{parse_document, parse_links};
//!
//! let doc = parse_document("---\ntitle: Notes\ntags: [ops.deploy]\n---\nSee [runbook](./run.md).\n")?;
//! assert_eq!(doc.frontmatter.title, "Notes");
//!
//! let links = parse_links(&doc.body);
//! assert_eq!(links[0].target, "./run.md");
//! assert_eq!(&doc.body[links[0].span.clone()], "[runbook](./run.md)");
//! # Ok::<(), tagbase::TagbaseError>(())
//! ```

pub mod frontmatter;
pub mod links;

pub use frontmatter::{
    parse_document, split_frontmatter, validate_header, Frontmatter, FrontmatterSplit,
    MetadataFormat, ParsedDocument,
};
pub use links::{parse_links, LinkRecord};
