//! Single-level link expansion.
//!
//! [`LinkResolver::assemble`] renders a document's body with every inline link replaced by its
//! display text, then appends the content of each locally resolvable link target. Content read
//! from a target is never scanned for further links.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use url::Url;

use crate::{
    cache::DocumentRecord,
    codec::{parse_links, split_frontmatter, LinkRecord},
    diagnostic::{Diagnostic, DiagnosticSink},
    error::{ErrorKind, TagbaseError},
    source::FileSource,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionFailure {
    /// Remote URL or a target with no local path component.
    NotResolved,
    NotFound,
    Unreadable(String),
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::NotResolved => f.write_str("not resolved"),
            ResolutionFailure::NotFound => f.write_str("not found"),
            ResolutionFailure::Unreadable(reason) => write!(f, "unreadable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionOutcome {
    Resolved { path: PathBuf, content: String },
    Failed { reason: ResolutionFailure },
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved { .. })
    }
}

/// A document as handed to callers: links flattened to text, linked content appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub path: PathBuf,
    pub title: String,
    pub expanded_body: String,
}

#[derive(Clone)]
pub struct LinkResolver {
    source: Arc<dyn FileSource>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl LinkResolver {
    pub fn new(source: Arc<dyn FileSource>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        LinkResolver {
            source,
            diagnostics,
        }
    }

    /// Resolve each distinct target in `links` relative to the directory holding `base`.
    ///
    /// Remote targets fail with [`ResolutionFailure::NotResolved`] without a read attempt and
    /// without a diagnostic; local failures are reported to the diagnostics sink.
    pub async fn resolve(
        &self,
        base: &Path,
        links: &[LinkRecord],
    ) -> BTreeMap<String, ResolutionOutcome> {
        let mut outcomes = BTreeMap::new();
        for link in links {
            if outcomes.contains_key(&link.target) {
                continue;
            }
            let outcome = self.resolve_one(base, &link.target).await;
            outcomes.insert(link.target.clone(), outcome);
        }
        outcomes
    }

    async fn resolve_one(&self, base: &Path, target: &str) -> ResolutionOutcome {
        if is_remote(target) {
            tracing::debug!("Skipping remote link target {}", target);
            return ResolutionOutcome::Failed {
                reason: ResolutionFailure::NotResolved,
            };
        }
        let Some(path) = resolve_target(base, target) else {
            self.report(base, target, &ResolutionFailure::NotResolved);
            return ResolutionOutcome::Failed {
                reason: ResolutionFailure::NotResolved,
            };
        };

        match self.source.read_string(&path).await {
            Ok(raw) => ResolutionOutcome::Resolved {
                content: strip_header(&raw).to_string(),
                path,
            },
            Err(e) => {
                let reason = match e {
                    TagbaseError::NotFound(_) => ResolutionFailure::NotFound,
                    other => ResolutionFailure::Unreadable(other.to_string()),
                };
                self.report(base, target, &reason);
                ResolutionOutcome::Failed { reason }
            }
        }
    }

    fn report(&self, base: &Path, target: &str, reason: &ResolutionFailure) {
        self.diagnostics.report(Diagnostic::new(
            ErrorKind::Resolution,
            format!("Link target '{target}' could not be resolved"),
            base,
            reason.to_string(),
        ));
    }

    /// Expand one cached document. `separator` precedes each appended linked document.
    pub async fn assemble(&self, record: &DocumentRecord, separator: &str) -> AssembledDocument {
        let links = parse_links(&record.body);
        let outcomes = self.resolve(&record.path, &links).await;

        let mut expanded_body = render_body(&record.body, &links);
        let mut appended = HashSet::new();
        for link in links.iter() {
            if !appended.insert(link.target.as_str()) {
                continue;
            }
            if let Some(ResolutionOutcome::Resolved { content, .. }) = outcomes.get(&link.target) {
                expanded_body.push_str(separator);
                expanded_body.push_str(content);
            }
        }

        AssembledDocument {
            path: record.path.clone(),
            title: record.title.clone(),
            expanded_body,
        }
    }
}

/// True if `target` is an absolute URL. Single-letter schemes are Windows drive letters.
pub fn is_remote(target: &str) -> bool {
    Url::parse(target)
        .map(|url| url.scheme().len() > 1)
        .unwrap_or(false)
}

/// Resolve a local link target against the directory containing `base`. Fragments are dropped;
/// a fragment-only target resolves to nothing.
pub fn resolve_target(base: &Path, target: &str) -> Option<PathBuf> {
    let local = target.split('#').next().unwrap_or_default().trim();
    if local.is_empty() {
        return None;
    }
    let local = Path::new(local);
    let joined = if local.is_absolute() {
        local.to_path_buf()
    } else {
        base.parent().unwrap_or_else(|| Path::new("")).join(local)
    };
    Some(normalize(&joined))
}

/// Lexically fold `.` and `..` components without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// `body` with each link's span replaced by its display text.
pub fn render_body(body: &str, links: &[LinkRecord]) -> String {
    let mut rendered = body.to_string();
    for link in links.iter().rev() {
        if rendered.is_char_boundary(link.span.start) && rendered.is_char_boundary(link.span.end) {
            rendered.replace_range(link.span.clone(), &link.display_text);
        }
    }
    rendered
}

fn strip_header(raw: &str) -> &str {
    split_frontmatter(raw).map(|split| split.body).unwrap_or(raw)
}
