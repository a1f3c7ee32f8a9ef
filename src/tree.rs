//! Search over the schema tree: flat pre-order index and expand-path computation.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::schema::SchemaNode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatIndexEntry {
    pub key: String,
    pub title: String,
}

/// Flatten the tree in pre-order, one entry per node.
pub fn build_flat_index(tree: &[SchemaNode]) -> Vec<FlatIndexEntry> {
    let mut entries = Vec::new();
    push_preorder(tree, &mut entries);
    entries
}

fn push_preorder(nodes: &[SchemaNode], entries: &mut Vec<FlatIndexEntry>) {
    for node in nodes {
        entries.push(FlatIndexEntry {
            key: node.key.clone(),
            title: node.title.clone(),
        });
        push_preorder(node.children(), entries);
    }
}

/// Key of the node whose direct children include `key`.
///
/// Scans every subtree. Returns `None` for root-level keys and for keys that
/// are not in the tree.
pub fn find_parent_key<'a>(key: &str, tree: &'a [SchemaNode]) -> Option<&'a str> {
    for node in tree {
        let children = node.children();
        if children.iter().any(|child| child.key == key) {
            return Some(&node.key);
        }
        if let Some(parent) = find_parent_key(key, children) {
            return Some(parent);
        }
    }
    None
}

/// Keys to expand so that every entry whose title contains `search_term`
/// is visible: the match's parent and that parent's ancestors.
///
/// Matching is a case-sensitive substring test. A database-level match has
/// no parent and expands nothing. The result holds each key once, in the
/// order first discovered. An empty term expands nothing.
pub fn compute_expanded_keys(
    search_term: &str,
    tree: &[SchemaNode],
    flat_index: &[FlatIndexEntry],
) -> Vec<String> {
    if search_term.is_empty() {
        return Vec::new();
    }
    let mut expanded = ExpandedKeys::default();
    for entry in flat_index.iter().filter(|e| e.title.contains(search_term)) {
        let mut parent = find_parent_key(&entry.key, tree);
        while let Some(key) = parent {
            if !expanded.insert(key) {
                break;
            }
            parent = find_parent_key(key, tree);
        }
    }
    expanded.keys
}

#[derive(Default)]
struct ExpandedKeys {
    seen: HashSet<String>,
    keys: Vec<String>,
}

impl ExpandedKeys {
    /// Returns false if the key was already present, in which case its
    /// ancestors are present too.
    fn insert(&mut self, key: &str) -> bool {
        if !self.seen.insert(key.to_string()) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }
}

/// Flat index plus a key → parent map, built once per schema load.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    entries: Vec<FlatIndexEntry>,
    parents: HashMap<String, String>,
}

impl TreeIndex {
    pub fn build(tree: &[SchemaNode]) -> Self {
        let entries = build_flat_index(tree);
        let mut parents = HashMap::with_capacity(entries.len());
        collect_parents(tree, &mut parents);

        debug!(
            "indexed {} schema nodes ({} with a parent)",
            entries.len(),
            parents.len()
        );

        Self { entries, parents }
    }

    pub fn entries(&self) -> &[FlatIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parent_of(&self, key: &str) -> Option<&str> {
        self.parents.get(key).map(String::as_str)
    }

    /// Same result as [`compute_expanded_keys`] without rescanning the tree.
    pub fn expanded_keys(&self, search_term: &str) -> Vec<String> {
        if search_term.is_empty() {
            return Vec::new();
        }
        let mut expanded = ExpandedKeys::default();
        for entry in self.entries.iter().filter(|e| e.title.contains(search_term)) {
            let mut parent = self.parent_of(&entry.key);
            while let Some(key) = parent {
                if !expanded.insert(key) {
                    break;
                }
                parent = self.parent_of(key);
            }
        }
        expanded.keys
    }
}

fn collect_parents(nodes: &[SchemaNode], parents: &mut HashMap<String, String>) {
    for node in nodes {
        for child in node.children() {
            parents.insert(child.key.clone(), node.key.clone());
        }
        collect_parents(node.children(), parents);
    }
}
