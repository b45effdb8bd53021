use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    path::{Path, PathBuf},
};

use super::{MULTI_WILDCARD, SINGLE_WILDCARD, TAG_SEPARATOR};

/// One segment of a hierarchical tag path.
///
/// `documents` holds every document tagged with the path ending here or with any longer
/// extension of it. A node whose `documents` set becomes empty is pruned from its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagNode {
    segment: String,
    children: BTreeMap<String, TagNode>,
    documents: BTreeSet<PathBuf>,
}

impl TagNode {
    fn new(segment: &str) -> Self {
        TagNode {
            segment: segment.to_string(),
            ..Default::default()
        }
    }

    /// The path component this node represents. Empty for the root.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn children(&self) -> impl Iterator<Item = &TagNode> {
        self.children.values()
    }

    pub fn child(&self, segment: &str) -> Option<&TagNode> {
        self.children.get(segment)
    }

    pub fn documents(&self) -> &BTreeSet<PathBuf> {
        &self.documents
    }
}

/// A trie of tag segments paired with a flat index of full tag strings.
///
/// The flat index (`tag -> documents`) and its reverse (`document -> tags`) are updated in the
/// same call as the trie, so the three structures never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTrie {
    root: TagNode,
    by_tag: HashMap<String, BTreeSet<PathBuf>>,
    by_document: HashMap<PathBuf, BTreeSet<String>>,
}

impl TagTrie {
    /// Attach `document` to every node along each tag's path, creating nodes as needed.
    pub fn add(&mut self, document: impl AsRef<Path>, tags: &[String]) {
        let document = document.as_ref();
        for tag in tags {
            let mut node = &mut self.root;
            node.documents.insert(document.to_path_buf());
            for segment in tag.split(TAG_SEPARATOR) {
                node = node
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(|| TagNode::new(segment));
                node.documents.insert(document.to_path_buf());
            }
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(document.to_path_buf());
            self.by_document
                .entry(document.to_path_buf())
                .or_default()
                .insert(tag.clone());
        }
    }

    /// Detach `document` from each of `tags`. Tags the document does not carry are skipped.
    ///
    /// A node keeps the document while some *other* remaining tag of the same document still
    /// passes through it, so removing `a.b` from a document also tagged `a.c` leaves it under `a`.
    pub fn remove(&mut self, document: impl AsRef<Path>, tags: &[String]) {
        let document = document.as_ref();
        let mut detached = Vec::new();
        for tag in tags {
            let Some(owners) = self.by_tag.get_mut(tag) else {
                continue;
            };
            if !owners.remove(document) {
                continue;
            }
            if owners.is_empty() {
                self.by_tag.remove(tag);
            }
            detached.push(tag.as_str());
        }
        if detached.is_empty() {
            return;
        }

        let remaining = match self.by_document.get_mut(document) {
            Some(doc_tags) => {
                for tag in detached.iter() {
                    doc_tags.remove(*tag);
                }
                doc_tags.clone()
            }
            None => BTreeSet::new(),
        };
        if remaining.is_empty() {
            self.by_document.remove(document);
        }

        for tag in detached {
            let segments: Vec<&str> = tag.split(TAG_SEPARATOR).collect();
            detach(&mut self.root, "", &segments, document, &remaining);
        }
    }

    /// Documents tagged with `tag` or any descendant of it.
    pub fn query_exact(&self, tag: &str) -> Vec<PathBuf> {
        self.node(tag)
            .map(|node| node.documents.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Documents matching a tag pattern where `*` is one segment and `**` is zero or more.
    ///
    /// Each document appears once no matter how many branches of the pattern reach it.
    pub fn query_wildcard(&self, pattern: &str) -> Vec<PathBuf> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let mut segments: Vec<&str> = pattern.split(TAG_SEPARATOR).collect();
        // `a.**.**.b` matches exactly what `a.**.b` does.
        segments.dedup_by(|next, prev| *next == MULTI_WILDCARD && *prev == MULTI_WILDCARD);
        let mut found = BTreeSet::new();
        let mut visited = HashSet::new();
        collect_matches(&self.root, &segments, 0, &mut visited, &mut found);
        found.into_iter().cloned().collect()
    }

    /// Every full tag string currently carried by at least one document, sorted.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.by_tag.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// The full tags carried by `document`, sorted.
    pub fn tags_for_document(&self, document: impl AsRef<Path>) -> Vec<String> {
        self.by_document
            .get(document.as_ref())
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True if some document carries exactly `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Segment names directly below `prefix` (the top-level segments for an empty prefix).
    /// Intended for incremental tag completion.
    pub fn child_segments(&self, prefix: &str) -> Vec<String> {
        let node = if prefix.is_empty() {
            Some(&self.root)
        } else {
            self.node(prefix)
        };
        node.map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn root(&self) -> &TagNode {
        &self.root
    }

    /// The node for a full tag path, if present.
    pub fn node(&self, tag: &str) -> Option<&TagNode> {
        if tag.is_empty() {
            return None;
        }
        tag.split(TAG_SEPARATOR)
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    /// Number of distinct documents in the index.
    pub fn document_count(&self) -> usize {
        self.root.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    pub fn clear(&mut self) {
        *self = TagTrie::default();
    }
}

/// True if any of `remaining` is `prefix` or lies below it. The empty prefix is the root.
fn covers(remaining: &BTreeSet<String>, prefix: &str) -> bool {
    if prefix.is_empty() {
        return !remaining.is_empty();
    }
    remaining.iter().any(|tag| {
        tag == prefix
            || (tag.len() > prefix.len()
                && tag.starts_with(prefix)
                && tag[prefix.len()..].starts_with(TAG_SEPARATOR))
    })
}

fn detach(
    node: &mut TagNode,
    prefix: &str,
    rest: &[&str],
    document: &Path,
    remaining: &BTreeSet<String>,
) {
    if let Some((head, tail)) = rest.split_first() {
        let child_prefix = if prefix.is_empty() {
            head.to_string()
        } else {
            format!("{prefix}{TAG_SEPARATOR}{head}")
        };
        if let Some(child) = node.children.get_mut(*head) {
            detach(child, &child_prefix, tail, document, remaining);
            if child.documents.is_empty() {
                node.children.remove(*head);
            }
        }
    }
    if !covers(remaining, prefix) {
        node.documents.remove(document);
    }
}

/// Walks the trie against `pattern` from `idx`. Each `(node, idx)` pair is expanded at most once,
/// so the cost is bounded by trie size times pattern length however the `**` segments branch.
fn collect_matches<'a>(
    node: &'a TagNode,
    pattern: &[&str],
    idx: usize,
    visited: &mut HashSet<(*const TagNode, usize)>,
    found: &mut BTreeSet<&'a PathBuf>,
) {
    if !visited.insert((node as *const TagNode, idx)) {
        return;
    }
    let Some(head) = pattern.get(idx) else {
        found.extend(node.documents.iter());
        return;
    };
    match *head {
        MULTI_WILDCARD => {
            // Consume zero levels here, or descend one level and retry the same segment.
            collect_matches(node, pattern, idx + 1, visited, found);
            for child in node.children.values() {
                collect_matches(child, pattern, idx, visited, found);
            }
        }
        SINGLE_WILDCARD => {
            for child in node.children.values() {
                collect_matches(child, pattern, idx + 1, visited, found);
            }
        }
        literal => {
            if let Some(child) = node.children.get(literal) {
                collect_matches(child, pattern, idx + 1, visited, found);
            }
        }
    }
}
