//! PrefixIndex: an ordered-key trie mapping key sequences to value multisets.
//!
//! Values are attached to the node reached by the exact key sequence used at
//! insertion. Two query shapes are supported:
//!
//! - exact: follow one ordered key path (`get`);
//! - order-independent containment (`find_all`): starting at the root, descend
//!   into every child whose key belongs to the query set, collecting values
//!   along the way. With sorted insertion keys this returns every value whose
//!   key sequence is a subset of the query.
//!
//! Nodes live in an arena and refer to each other by index.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: Option<K>,
    values: Vec<V>,
    children: BTreeMap<K, NodeId>,
}

impl<K, V> Node<K, V> {
    fn new(key: Option<K>) -> Self {
        Self {
            key,
            values: Vec::new(),
            children: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrefixIndex<K, V> {
    nodes: Vec<Node<K, V>>,
    value_count: usize,
}

impl<K: Ord + Clone, V> Default for PrefixIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> PrefixIndex<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(None)],
            value_count: 0,
        }
    }

    /// Attach `value` to the node addressed by `keys`, creating the path as needed.
    pub fn insert(&mut self, keys: &[K], value: V) {
        let mut current = NodeId::ROOT;
        for key in keys {
            current = match self.nodes[current.index()].children.get(key) {
                Some(&child) => child,
                None => {
                    let child = NodeId(self.nodes.len() as u32);
                    self.nodes.push(Node::new(Some(key.clone())));
                    self.nodes[current.index()]
                        .children
                        .insert(key.clone(), child);
                    child
                }
            };
        }
        self.nodes[current.index()].values.push(value);
        self.value_count += 1;
    }

    /// Values stored at exactly `keys` (empty when the path is absent).
    pub fn get(&self, keys: &[K]) -> &[V] {
        match self.find_node(keys) {
            Some(node) => &self.nodes[node.index()].values,
            None => &[],
        }
    }

    /// Whether `keys` is a path in the index (with or without values).
    pub fn contains_prefix(&self, keys: &[K]) -> bool {
        self.find_node(keys).is_some()
    }

    /// Every value whose insertion path uses only keys from `query`.
    pub fn find_all(&self, query: &BTreeSet<K>) -> Vec<&V> {
        let mut out = Vec::new();
        self.for_each_match(query, |value| out.push(value));
        out
    }

    /// Visit matches of an order-independent query without collecting them.
    ///
    /// Root values (inserted with an empty key) match every query. Children are
    /// visited in key order, values in insertion order.
    pub fn for_each_match<'a, F>(&'a self, query: &BTreeSet<K>, mut visit: F)
    where
        F: FnMut(&'a V),
    {
        for value in &self.nodes[NodeId::ROOT.index()].values {
            visit(value);
        }
        if query.is_empty() {
            return;
        }
        let mut stack: Vec<NodeId> = vec![NodeId::ROOT];
        let mut matched: Vec<NodeId> = Vec::new();
        while let Some(node) = stack.pop() {
            if node != NodeId::ROOT {
                for value in &self.nodes[node.index()].values {
                    visit(value);
                }
            }
            matched.clear();
            let children = &self.nodes[node.index()].children;
            // Walk whichever side is smaller.
            if query.len() < children.len() {
                matched.extend(query.iter().filter_map(|k| children.get(k).copied()));
            } else {
                matched.extend(
                    children
                        .iter()
                        .filter(|(k, _)| query.contains(*k))
                        .map(|(_, &id)| id),
                );
            }
            // Push in reverse so the stack pops children in key order.
            for &child in matched.iter().rev() {
                stack.push(child);
            }
        }
    }

    /// All `(key path, value)` pairs in depth-first key order.
    pub fn entries(&self) -> Vec<(Vec<K>, &V)> {
        let mut out = Vec::with_capacity(self.value_count);
        let mut path: Vec<K> = Vec::new();
        self.collect_entries(NodeId::ROOT, &mut path, &mut out);
        out
    }

    fn collect_entries<'a>(&'a self, node: NodeId, path: &mut Vec<K>, out: &mut Vec<(Vec<K>, &'a V)>) {
        let n = &self.nodes[node.index()];
        for value in &n.values {
            out.push((path.clone(), value));
        }
        for (key, &child) in &n.children {
            path.push(key.clone());
            self.collect_entries(child, path, out);
            path.pop();
        }
    }

    /// Number of stored values (a multiset count).
    pub fn len(&self) -> usize {
        self.value_count
    }

    pub fn is_empty(&self) -> bool {
        self.value_count == 0
    }

    /// Number of trie nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Keys directly below the root, in order.
    pub fn root_keys(&self) -> impl Iterator<Item = &K> {
        self.nodes[NodeId::ROOT.index()].children.keys()
    }

    fn find_node(&self, keys: &[K]) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for key in keys {
            current = *self.nodes[current.index()].children.get(key)?;
        }
        debug_assert!(current == NodeId::ROOT || self.nodes[current.index()].key.is_some());
        Some(current)
    }
}
