//! ItemSetCounter: a compressed counting trie for frequent-itemset mining.
//!
//! Each transaction is inserted as its sorted, deduplicated item sequence, so
//! transactions sharing a prefix share trie nodes and memory is bounded by the
//! number of distinct prefixes.
//!
//! A header index maps every label to the nodes carrying it. Because items are
//! sorted along every path, the support of an itemset `x1 < .. < xk` is the sum
//! of counts of the `xk` nodes whose ancestors contain `x1..x(k-1)`, and the
//! support of `x1..xk + [c]` is found below those same nodes.
//!
//! Nodes live in an arena; parent links are plain indices, so the header index
//! and the tree never form reference cycles.

use std::collections::BTreeMap;
use std::hash::Hash;

use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CounterNodeId(u32);

impl CounterNodeId {
    const ROOT: CounterNodeId = CounterNodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct CounterNode<T> {
    label: Option<T>,
    count: u32,
    parent: Option<CounterNodeId>,
    children: BTreeMap<T, CounterNodeId>,
}

#[derive(Debug, Clone)]
pub struct ItemSetCounter<T> {
    nodes: Vec<CounterNode<T>>,
    header: AHashMap<T, Vec<CounterNodeId>>,
}

impl<T: Ord + Hash + Clone> Default for ItemSetCounter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Hash + Clone> ItemSetCounter<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![CounterNode {
                label: None,
                count: 0,
                parent: None,
                children: BTreeMap::new(),
            }],
            header: AHashMap::new(),
        }
    }

    /// Count one transaction. Unsorted or duplicated input is normalized first.
    pub fn add(&mut self, items: &[T]) {
        if is_strictly_sorted(items) {
            self.add_sorted(items);
        } else {
            let mut normalized = items.to_vec();
            normalized.sort();
            normalized.dedup();
            self.add_sorted(&normalized);
        }
    }

    fn add_sorted(&mut self, items: &[T]) {
        let mut current = CounterNodeId::ROOT;
        self.nodes[current.index()].count += 1;
        for item in items {
            current = match self.nodes[current.index()].children.get(item) {
                Some(&child) => child,
                None => {
                    let child = CounterNodeId(self.nodes.len() as u32);
                    self.nodes.push(CounterNode {
                        label: Some(item.clone()),
                        count: 0,
                        parent: Some(current),
                        children: BTreeMap::new(),
                    });
                    self.nodes[current.index()]
                        .children
                        .insert(item.clone(), child);
                    self.header.entry(item.clone()).or_default().push(child);
                    child
                }
            };
            self.nodes[current.index()].count += 1;
        }
    }

    /// Count stored at the exact root path `prefix` (0 when absent).
    ///
    /// This counts transactions whose sorted itemset *starts with* `prefix`;
    /// use [`ItemSetCounter::support`] for the containment count.
    pub fn lookup(&self, prefix: &[T]) -> u32 {
        let mut current = CounterNodeId::ROOT;
        for item in prefix {
            match self.nodes[current.index()].children.get(item) {
                Some(&child) => current = child,
                None => return 0,
            }
        }
        self.nodes[current.index()].count
    }

    /// Number of transactions containing every item of `itemset`.
    pub fn support(&self, itemset: &[T]) -> u32 {
        let Some((last, rest)) = itemset.split_last() else {
            return self.transaction_count();
        };
        if !is_strictly_sorted(itemset) {
            let mut normalized = itemset.to_vec();
            normalized.sort();
            normalized.dedup();
            return self.support(&normalized);
        }
        self.matching_nodes(last, rest)
            .map(|node| self.nodes[node.index()].count)
            .sum()
    }

    /// Aggregated support of `prefix + [c]` for every successor label `c`.
    ///
    /// All nodes ending an occurrence of `prefix` are located through the
    /// header index (an occurrence may sit below any trie branch), and the
    /// counts of each label in their subtrees are summed. Only labels greater
    /// than the last prefix item can appear, so each extension is canonical.
    pub fn children_support(&self, prefix: &[T]) -> BTreeMap<T, u32> {
        let mut out: BTreeMap<T, u32> = BTreeMap::new();
        let Some((last, rest)) = prefix.split_last() else {
            for (label, nodes) in &self.header {
                let total: u32 = nodes.iter().map(|n| self.nodes[n.index()].count).sum();
                out.insert(label.clone(), total);
            }
            return out;
        };

        let mut stack: Vec<CounterNodeId> = Vec::new();
        for start in self.matching_nodes(last, rest) {
            stack.extend(self.nodes[start.index()].children.values().copied());
            while let Some(node) = stack.pop() {
                let n = &self.nodes[node.index()];
                if let Some(label) = &n.label {
                    *out.entry(label.clone()).or_insert(0) += n.count;
                }
                stack.extend(n.children.values().copied());
            }
        }
        out
    }

    /// Nodes labeled `last` whose ancestor path contains all of `rest`.
    fn matching_nodes<'a>(
        &'a self,
        last: &'a T,
        rest: &'a [T],
    ) -> impl Iterator<Item = CounterNodeId> + 'a {
        self.header
            .get(last)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&node| self.ancestors_contain(node, rest))
    }

    /// Walk parents upward matching `sorted` from its end; both sequences are
    /// increasing toward the leaf, so a greedy match is exact.
    fn ancestors_contain(&self, node: CounterNodeId, sorted: &[T]) -> bool {
        let mut remaining = sorted.len();
        let mut current = self.nodes[node.index()].parent;
        while remaining > 0 {
            let Some(id) = current else {
                return false;
            };
            let n = &self.nodes[id.index()];
            let Some(label) = &n.label else {
                return false;
            };
            let wanted = &sorted[remaining - 1];
            match label.cmp(wanted) {
                std::cmp::Ordering::Equal => remaining -= 1,
                // Labels only decrease from here up; `wanted` cannot appear.
                std::cmp::Ordering::Less => return false,
                std::cmp::Ordering::Greater => {}
            }
            current = n.parent;
        }
        true
    }

    pub fn transaction_count(&self) -> u32 {
        self.nodes[CounterNodeId::ROOT.index()].count
    }

    /// Number of trie nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Distinct labels seen so far (unordered).
    pub fn labels(&self) -> impl Iterator<Item = &T> {
        self.header.keys()
    }
}

fn is_strictly_sorted<T: Ord>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] < w[1])
}
