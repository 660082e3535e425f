//! Wildcard tree search and remap over JSON documents
//!
//! REST responses nest the interesting data several levels deep
//! (`Trip[0].LegList.Leg`, `...Stops.Stop`). A [`PathPattern`] such as
//! `**.Stops.Stop` matches such positions at any depth; [`remap`] then exposes
//! every match as a shallow, semantically named field on the match's
//! grandparent.
//!
//! Pattern syntax: dot-separated segments, each either `**` (zero or more
//! path segments), a literal object key, or a literal key followed by an
//! array index (`ServiceDays[0]`).

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;

/// One step from a node to one of its children
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    AnyDepth,
    Key(String),
    Index(usize),
}

/// Parsed wildcard path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parse a pattern
    ///
    /// Segments that are not `**` and carry no well-formed `[n]` suffix are
    /// taken as literal keys, so parsing never fails.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        for part in pattern.split('.') {
            if part == "**" {
                segments.push(PatternSegment::AnyDepth);
                continue;
            }
            match split_index(part) {
                Some((key, index)) => {
                    if !key.is_empty() {
                        segments.push(PatternSegment::Key(key.to_string()));
                    }
                    segments.push(PatternSegment::Index(index));
                }
                None => segments.push(PatternSegment::Key(part.to_string())),
            }
        }
        Self {
            source: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether a node at `path` (root first) matches this pattern
    #[must_use]
    pub fn matches(&self, path: &[PathSegment]) -> bool {
        matches_from(&self.segments, path)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn split_index(part: &str) -> Option<(&str, usize)> {
    let open = part.rfind('[')?;
    let index = part[open + 1..].strip_suffix(']')?.parse().ok()?;
    Some((&part[..open], index))
}

fn matches_from(pattern: &[PatternSegment], path: &[PathSegment]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((PatternSegment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| matches_from(rest, &path[skip..]))
        }
        Some((PatternSegment::Key(key), rest)) => matches!(
            path.split_first(),
            Some((PathSegment::Key(k), tail)) if k == key && matches_from(rest, tail)
        ),
        Some((PatternSegment::Index(index), rest)) => matches!(
            path.split_first(),
            Some((PathSegment::Index(i), tail)) if i == index && matches_from(rest, tail)
        ),
    }
}

/// A node found by [`find_in_tree`]
#[derive(Debug, Clone, PartialEq)]
pub struct TreeMatch {
    /// Copy of the matched node
    pub node: Value,
    /// Location of the node, root first
    pub path: Vec<PathSegment>,
}

impl TreeMatch {
    /// Ancestors of the matched node in `root`, nearest first
    ///
    /// `ancestors[0]` is the node's container, `ancestors[1]` its grandparent.
    #[must_use]
    pub fn ancestors<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut chain = Vec::with_capacity(self.path.len());
        let mut node = root;
        for segment in &self.path {
            chain.push(node);
            match child(node, segment) {
                Some(next) => node = next,
                None => break,
            }
        }
        chain.reverse();
        chain
    }
}

fn child<'a>(node: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match segment {
        PathSegment::Key(key) => node.get(key.as_str()),
        PathSegment::Index(index) => node.get(*index),
    }
}

fn get<'a>(root: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(root, child)
}

fn get_mut<'a>(root: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |node, segment| match segment {
        PathSegment::Key(key) => node.get_mut(key.as_str()),
        PathSegment::Index(index) => node.get_mut(*index),
    })
}

/// Single pre-order traversal; records the path of every match per pattern
fn collect_paths(patterns: &[PathPattern], root: &Value) -> Vec<Vec<Vec<PathSegment>>> {
    fn visit(
        node: &Value,
        path: &mut Vec<PathSegment>,
        patterns: &[PathPattern],
        found: &mut [Vec<Vec<PathSegment>>],
    ) {
        for (pattern, hits) in patterns.iter().zip(found.iter_mut()) {
            if pattern.matches(path) {
                hits.push(path.clone());
            }
        }
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    path.push(PathSegment::Key(key.clone()));
                    visit(value, path, patterns, found);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    visit(value, path, patterns, found);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    let mut found = vec![Vec::new(); patterns.len()];
    visit(root, &mut Vec::new(), patterns, &mut found);
    found
}

/// Find every node matching any of the patterns, in document order
#[must_use]
pub fn find_in_tree(patterns: &[PathPattern], root: &Value) -> HashMap<String, Vec<TreeMatch>> {
    let found = collect_paths(patterns, root);
    let mut result: HashMap<String, Vec<TreeMatch>> = HashMap::new();
    for (pattern, paths) in patterns.iter().zip(found) {
        let matches = result.entry(pattern.as_str().to_string()).or_default();
        matches.extend(paths.into_iter().filter_map(|path| {
            get(root, &path).map(|node| TreeMatch {
                node: node.clone(),
                path,
            })
        }));
    }
    result
}

/// Expose every match of `mapping`'s patterns on the match's grandparent
///
/// `mapping` pairs a pattern with the field name to set. All matches are
/// collected before anything is rewritten. Rewrites are then applied deepest
/// first, so a copied node already carries the fields added below it. The
/// original nested structure is kept. Matches without an object grandparent
/// are skipped. When several matches target the same field of the same
/// grandparent, the last one (in mapping order, then document order) wins.
#[must_use]
pub fn remap(mut root: Value, mapping: &[(&str, &str)]) -> Value {
    let patterns: Vec<PathPattern> = mapping
        .iter()
        .map(|(pattern, _)| PathPattern::parse(pattern))
        .collect();
    let found = collect_paths(&patterns, &root);

    let mut rewrites: Vec<(&str, Vec<PathSegment>)> = mapping
        .iter()
        .zip(found)
        .flat_map(|((_, name), paths)| paths.into_iter().map(move |path| (*name, path)))
        .collect();
    rewrites.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    for (name, path) in rewrites {
        let Some(parent_len) = path.len().checked_sub(2) else {
            debug!(field = name, "Match has no grandparent, skipping");
            continue;
        };
        let Some(node) = get(&root, &path).cloned() else {
            continue;
        };
        match get_mut(&mut root, &path[..parent_len]) {
            Some(Value::Object(grandparent)) => {
                grandparent.insert(name.to_string(), node);
            }
            _ => debug!(field = name, "Grandparent is not an object, skipping"),
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn test_parse_and_match() {
        let pattern = PathPattern::parse("**.Stops.Stop");
        assert!(pattern.matches(&[key("Stops"), key("Stop")]));
        assert!(pattern.matches(&[key("A"), PathSegment::Index(3), key("Stops"), key("Stop")]));
        assert!(!pattern.matches(&[key("Stops")]));
        assert!(!pattern.matches(&[key("Stops"), key("Stop"), PathSegment::Index(0)]));
        assert_eq!(pattern.as_str(), "**.Stops.Stop");
    }

    #[test]
    fn test_index_segment() {
        let pattern = PathPattern::parse("**.ServiceDays[0]");
        assert!(pattern.matches(&[key("ServiceDays"), PathSegment::Index(0)]));
        assert!(!pattern.matches(&[key("ServiceDays"), PathSegment::Index(1)]));
        assert!(!pattern.matches(&[key("ServiceDays")]));
    }

    #[test]
    fn test_malformed_index_is_literal() {
        let pattern = PathPattern::parse("a[x]");
        assert!(pattern.matches(&[key("a[x]")]));
    }

    #[test]
    fn test_find_in_tree_records_ancestors() {
        let root = json!({"A": {"B": {"Stops": {"Stop": [{"id": 1}]}}}});
        let patterns = [PathPattern::parse("**.Stops.Stop")];
        let found = find_in_tree(&patterns, &root);

        let matches = &found["**.Stops.Stop"];
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node, json!([{"id": 1}]));

        let ancestors = matches[0].ancestors(&root);
        assert_eq!(ancestors.len(), 4);
        assert_eq!(ancestors[0], &json!({"Stop": [{"id": 1}]}));
        assert_eq!(ancestors[1], &root["A"]["B"]);
        assert_eq!(ancestors[3], &root);
    }

    #[test]
    fn test_find_in_tree_document_order() {
        let root = json!({"List": [{"Notes": {"Note": 1}}, {"Notes": {"Note": 2}}]});
        let found = find_in_tree(&[PathPattern::parse("**.Notes.Note")], &root);
        let nodes: Vec<_> = found["**.Notes.Note"].iter().map(|m| m.node.clone()).collect();
        assert_eq!(nodes, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_remap_sets_field_on_grandparent() {
        let root = json!({"A": {"B": {"Stops": {"Stop": [{"id": 1}]}}}});
        let remapped = remap(root, &[("**.Stops.Stop", "stops")]);

        assert_eq!(remapped["A"]["B"]["stops"], json!([{"id": 1}]));
        assert_eq!(remapped["A"]["B"]["Stops"]["Stop"], json!([{"id": 1}]));
    }

    #[test]
    fn test_remap_first_service_day() {
        let root = json!({"Trip": [{"ServiceDays": [{"day": "mon"}, {"day": "tue"}]}]});
        let remapped = remap(root, &[("**.ServiceDays[0]", "serviceDays")]);
        assert_eq!(remapped["Trip"][0]["serviceDays"], json!({"day": "mon"}));
    }

    #[test]
    fn test_remap_deepest_first() {
        let root = json!({
            "LegList": {"Leg": [{"Stops": {"Stop": [{"id": 1}]}}]}
        });
        let remapped = remap(root, &[("**.LegList.Leg", "legs"), ("**.Stops.Stop", "stops")]);

        assert_eq!(remapped["LegList"]["Leg"][0]["stops"], json!([{"id": 1}]));
        assert_eq!(remapped["legs"][0]["stops"], json!([{"id": 1}]));
    }

    #[test]
    fn test_remap_skips_non_object_grandparent() {
        let root = json!([{"Stop": [1]}]);
        let remapped = remap(root.clone(), &[("**.Stop", "stops")]);
        assert_eq!(remapped, root);
    }

    #[test]
    fn test_remap_without_matches_is_identity() {
        let root = json!({"a": [1, 2, {"b": null}]});
        assert_eq!(remap(root.clone(), &[("**.Stops.Stop", "stops")]), root);
    }
}
