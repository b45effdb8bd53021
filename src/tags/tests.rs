use super::*;
use std::path::PathBuf;
use test_log::test;

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = list.iter().map(PathBuf::from).collect();
    paths.sort();
    paths
}

fn sample_trie() -> TagTrie {
    let mut trie = TagTrie::default();
    trie.add("/m/db.md", &tags(&["backend.database.postgres"]));
    trie.add("/m/auth.md", &tags(&["backend.auth"]));
    trie
}

#[test]
fn test_sample_scenario() {
    let trie = sample_trie();

    assert_eq!(
        trie.query_wildcard("backend.*"),
        paths(&["/m/db.md", "/m/auth.md"])
    );
    assert_eq!(
        trie.query_exact("backend.database.postgres"),
        paths(&["/m/db.md"])
    );
    assert_eq!(trie.query_wildcard("*.auth"), paths(&["/m/auth.md"]));
}

#[test]
fn test_ancestor_queries_include_descendants() {
    let mut trie = TagTrie::default();
    trie.add("/d.md", &tags(&["a.b.c"]));

    for query in ["a", "a.b", "a.b.c"] {
        assert_eq!(trie.query_exact(query), paths(&["/d.md"]), "query {query}");
    }
    assert!(trie.query_exact("a.b.c.d").is_empty());
    assert!(trie.query_exact("b").is_empty());
    assert!(trie.query_exact("").is_empty());
}

#[test]
fn test_single_wildcard_equals_union_of_children() {
    let mut trie = TagTrie::default();
    trie.add("/one.md", &tags(&["a.x", "a.y"]));
    trie.add("/two.md", &tags(&["a.y.deep"]));
    trie.add("/three.md", &tags(&["a"]));
    trie.add("/four.md", &tags(&["b.x"]));

    let mut union: Vec<PathBuf> = trie
        .child_segments("a")
        .iter()
        .flat_map(|child| trie.query_exact(&format!("a.{child}")))
        .collect();
    union.sort();
    union.dedup();

    assert_eq!(trie.query_wildcard("a.*"), union);
    assert_eq!(trie.query_wildcard("a.*"), paths(&["/one.md", "/two.md"]));
}

#[test]
fn test_wildcard_never_duplicates() {
    let mut trie = TagTrie::default();
    trie.add("/x.md", &tags(&["x.1", "x.2", "x.3"]));

    assert_eq!(trie.query_wildcard("x.*"), paths(&["/x.md"]));
    assert_eq!(trie.query_wildcard("**"), paths(&["/x.md"]));
    assert_eq!(trie.query_wildcard("x.**"), paths(&["/x.md"]));
}

#[test]
fn test_multi_wildcard_matches_zero_or_more_levels() {
    let mut trie = TagTrie::default();
    trie.add("/shallow.md", &tags(&["auth"]));
    trie.add("/mid.md", &tags(&["backend.auth"]));
    trie.add("/deep.md", &tags(&["backend.services.auth.tokens"]));
    trie.add("/other.md", &tags(&["frontend.login"]));

    assert_eq!(
        trie.query_wildcard("**.auth"),
        paths(&["/shallow.md", "/mid.md", "/deep.md"])
    );
    assert_eq!(
        trie.query_wildcard("backend.**.auth"),
        paths(&["/mid.md", "/deep.md"])
    );
    assert_eq!(trie.query_wildcard("**.tokens"), paths(&["/deep.md"]));
    assert_eq!(trie.query_wildcard("*.*.auth"), paths(&["/deep.md"]));
    assert!(trie.query_wildcard("frontend.*.login").is_empty());
}

#[test]
fn test_repeated_multi_wildcards_collapse() {
    let mut trie = TagTrie::default();
    trie.add("/x.md", &tags(&["x"]));
    trie.add("/deep.md", &tags(&["a.b.x"]));
    trie.add("/other.md", &tags(&["a.y"]));

    assert_eq!(trie.query_wildcard("**.**.x"), trie.query_wildcard("**.x"));
    assert_eq!(trie.query_wildcard("**.x"), paths(&["/x.md", "/deep.md"]));
    assert_eq!(
        trie.query_wildcard("a.**.**.**.x"),
        trie.query_wildcard("a.**.x")
    );
}

#[test]
fn test_many_multi_wildcards_stay_bounded() {
    let mut trie = TagTrie::default();
    for i in 0..8 {
        let tag = format!("a{i}.b.c.d.e.f.g.h.i.j");
        trie.add(format!("/d{i}.md"), &tags(&[tag.as_str()]));
    }

    let consecutive = format!("{}.nomatch", vec!["**"; 20].join("."));
    let interleaved = format!("{}.nomatch", vec!["**.*"; 10].join("."));
    let started = std::time::Instant::now();
    assert!(trie.query_wildcard(&consecutive).is_empty());
    assert!(trie.query_wildcard(&interleaved).is_empty());
    assert_eq!(trie.query_wildcard(&vec!["**"; 20].join(".")).len(), 8);
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[test]
fn test_literal_pattern_matches_exact_query() {
    let trie = sample_trie();
    assert_eq!(
        trie.query_wildcard("backend.database"),
        trie.query_exact("backend.database")
    );
    assert!(trie.query_wildcard("").is_empty());
    assert!(trie.query_wildcard("nothing.*").is_empty());
}

#[test]
fn test_add_remove_inverse() {
    let before = sample_trie();
    let mut trie = before.clone();
    let added = tags(&["backend.database.mysql", "ops.deploy"]);

    trie.add("/m/new.md", &added);
    assert_ne!(trie, before);
    trie.remove("/m/new.md", &added);

    assert_eq!(trie, before);
    assert_eq!(trie.all_tags(), before.all_tags());
}

#[test]
fn test_add_remove_inverse_from_empty() {
    let mut trie = TagTrie::default();
    let added = tags(&["a.b.c", "a.d"]);
    trie.add("/doc.md", &added);
    trie.remove("/doc.md", &added);

    assert_eq!(trie, TagTrie::default());
    assert!(trie.is_empty());
    assert_eq!(trie.root().children().count(), 0);
}

#[test]
fn test_partial_removal_keeps_shared_ancestors() {
    let mut trie = TagTrie::default();
    trie.add("/doc.md", &tags(&["a.b", "a.c"]));
    trie.remove("/doc.md", &tags(&["a.b"]));

    assert_eq!(trie.query_exact("a"), paths(&["/doc.md"]));
    assert_eq!(trie.query_exact("a.c"), paths(&["/doc.md"]));
    assert!(trie.query_exact("a.b").is_empty());
    assert!(trie.node("a.b").is_none(), "empty node should be pruned");
    assert_eq!(trie.tags_for_document("/doc.md"), tags(&["a.c"]));
}

#[test]
fn test_removal_keeps_prefix_tag() {
    let mut trie = TagTrie::default();
    trie.add("/doc.md", &tags(&["a", "a.b"]));
    trie.remove("/doc.md", &tags(&["a.b"]));

    assert_eq!(trie.query_exact("a"), paths(&["/doc.md"]));
    assert!(trie.node("a.b").is_none());
}

#[test]
fn test_remove_unknown_is_noop() {
    let mut trie = sample_trie();
    let before = trie.clone();

    trie.remove("/m/missing.md", &tags(&["backend.auth"]));
    trie.remove("/m/auth.md", &tags(&["not.a.tag"]));
    trie.remove("/m/auth.md", &[]);

    assert_eq!(trie, before);
}

#[test]
fn test_shared_tag_survives_one_owner_leaving() {
    let mut trie = TagTrie::default();
    trie.add("/a.md", &tags(&["shared.tag"]));
    trie.add("/b.md", &tags(&["shared.tag"]));
    trie.remove("/a.md", &tags(&["shared.tag"]));

    assert_eq!(trie.all_tags(), tags(&["shared.tag"]));
    assert_eq!(trie.query_exact("shared.tag"), paths(&["/b.md"]));
    assert_eq!(trie.document_count(), 1);
}

#[test]
fn test_tag_listing() {
    let mut trie = sample_trie();
    trie.add("/m/both.md", &tags(&["backend.auth", "ops"]));

    assert_eq!(
        trie.all_tags(),
        tags(&["backend.auth", "backend.database.postgres", "ops"])
    );
    assert_eq!(
        trie.tags_for_document("/m/both.md"),
        tags(&["backend.auth", "ops"])
    );
    assert!(trie.tags_for_document("/m/none.md").is_empty());
    assert!(trie.has_tag("backend.auth"));
    assert!(!trie.has_tag("backend"));
    assert_eq!(trie.child_segments(""), tags(&["backend", "ops"]));
    assert_eq!(trie.child_segments("backend"), tags(&["auth", "database"]));
    assert_eq!(trie.document_count(), 3);
}

#[test]
fn test_clear() {
    let mut trie = sample_trie();
    trie.clear();
    assert!(trie.is_empty());
    assert!(trie.all_tags().is_empty());
    assert!(trie.query_wildcard("**").is_empty());
    assert_eq!(trie, TagTrie::default());
}

#[test]
fn test_tag_path_validation() {
    for valid in ["a", "a.b", "backend.database.postgres", "v2.api-docs", "c++.std"] {
        assert!(is_valid_tag_path(valid), "{valid} should be valid");
    }
    for invalid in ["", ".", "a..b", ".a", "a.", "a b", "a.*", "**", " a"] {
        assert!(!is_valid_tag_path(invalid), "{invalid:?} should be invalid");
    }
}

#[test]
fn test_wildcard_detection() {
    assert!(is_wildcard_pattern("a.*"));
    assert!(is_wildcard_pattern("**.b"));
    assert!(!is_wildcard_pattern("a.b"));
    assert!(!is_wildcard_pattern("a*b"));
}
