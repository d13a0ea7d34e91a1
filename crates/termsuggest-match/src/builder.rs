//! Two-phase construction of the double-array Aho-Corasick arrays.
//!
//! Phase 1 collects the keys into a temporary labeled-edge trie. Phase 2 packs
//! that trie breadth-first into `base/check`:
//!
//! - each node's sibling set (its end-of-key leaf, if any, then its children
//!   in code order) is placed at the first base where every slot is free,
//!   scanning from a low-water mark that moves forward once the region below
//!   it is nearly full;
//! - `used` marks base values already handed out;
//! - the arrays double whenever a candidate region runs past the end, and are
//!   trimmed to the highest claimed slot once packing is done.
//!
//! Failure links and output tables are then computed over the packed arrays
//! in the same breadth-first order.

use std::collections::{BTreeMap, VecDeque};

use crate::alphabet::END_OF_KEY;

/// `check` value of an unclaimed slot.
pub(crate) const FREE: i32 = -1;

/// The root state is always slot 0.
pub(crate) const ROOT: usize = 0;

/// Once this share of the scanned slots is taken, the low-water mark jumps.
const DENSE_REGION_RATIO: f64 = 0.95;

const INITIAL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<u32, usize>,
    terminal: Option<u32>,
}

/// Temporary trie over alphabet codes.
#[derive(Debug)]
pub(crate) struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Insert a key (as codes) ending at dictionary entry `index`.
    pub(crate) fn insert(&mut self, codes: &[u32], index: u32) {
        let mut node = 0;
        for &code in codes {
            node = match self.nodes[node].children.get(&code) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(code, child);
                    child
                }
            };
        }
        self.nodes[node].terminal = Some(index);
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// The packed automaton tables.
#[derive(Debug)]
pub(crate) struct PackedArrays {
    pub(crate) base: Vec<i32>,
    pub(crate) check: Vec<i32>,
    pub(crate) fail: Vec<u32>,
    pub(crate) output: Vec<Box<[u32]>>,
}

/// A packed non-leaf state, recorded in breadth-first order.
#[derive(Debug, Clone, Copy)]
struct Placed {
    state: usize,
    parent: usize,
    code: u32,
    terminal: Option<u32>,
}

/// Packs a [`Trie`] into `base/check` and overlays failure links.
#[derive(Debug)]
pub(crate) struct DoubleArrayBuilder {
    base: Vec<i32>,
    check: Vec<i32>,
    used: Vec<bool>,
    next_check_pos: usize,
    size: usize,
}

impl DoubleArrayBuilder {
    pub(crate) fn new() -> Self {
        let mut builder = Self {
            base: Vec::new(),
            check: Vec::new(),
            used: Vec::new(),
            next_check_pos: 0,
            size: 1,
        };
        builder.ensure(INITIAL_CAPACITY);
        // The root owns slot 0 and is its own parent.
        builder.check[ROOT] = ROOT as i32;
        builder
    }

    pub(crate) fn build(mut self, trie: &Trie) -> PackedArrays {
        let order = self.pack(trie);
        self.base.truncate(self.size);
        self.check.truncate(self.size);
        self.base.shrink_to_fit();
        self.check.shrink_to_fit();

        let mut fail = vec![ROOT as u32; self.size];
        let mut output: Vec<Box<[u32]>> = vec![Box::default(); self.size];
        for placed in &order {
            let target = if placed.parent == ROOT {
                ROOT
            } else {
                self.fail_target(&fail, placed.parent, placed.code)
            };
            fail[placed.state] = target as u32;

            let inherited = &output[target];
            let mut entries = Vec::with_capacity(inherited.len() + 1);
            entries.extend(placed.terminal);
            entries.extend_from_slice(inherited);
            output[placed.state] = entries.into_boxed_slice();
        }

        PackedArrays {
            base: self.base,
            check: self.check,
            fail,
            output,
        }
    }

    /// Follow the parent's failure chain until some state has `code`.
    fn fail_target(&self, fail: &[u32], parent: usize, code: u32) -> usize {
        let mut state = fail[parent] as usize;
        loop {
            if let Some(next) = transition(&self.base, &self.check, state, code) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = fail[state] as usize;
        }
    }

    fn pack(&mut self, trie: &Trie) -> Vec<Placed> {
        let mut order = Vec::with_capacity(trie.node_count());
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((0, ROOT));

        while let Some((node_id, state)) = queue.pop_front() {
            let node = &trie.nodes[node_id];
            let mut codes: Vec<u32> = Vec::with_capacity(node.children.len() + 1);
            if node.terminal.is_some() {
                codes.push(END_OF_KEY);
            }
            codes.extend(node.children.keys().copied());
            if codes.is_empty() {
                // Only the root of an empty dictionary.
                self.base[state] = 0;
                continue;
            }

            let begin = self.find_base(&codes);
            self.base[state] = begin as i32;
            for &code in &codes {
                let slot = begin + code as usize + 1;
                self.check[slot] = state as i32;
                self.size = self.size.max(slot + 1);
            }
            if let Some(index) = node.terminal {
                self.base[begin + 1] = -(index as i32) - 1;
            }
            for (&code, &child) in &node.children {
                let slot = begin + code as usize + 1;
                order.push(Placed {
                    state: slot,
                    parent: state,
                    code,
                    terminal: trie.nodes[child].terminal,
                });
                queue.push_back((child, slot));
            }
        }
        order
    }

    /// First base at which every code of `codes` (ascending) lands on a free slot.
    fn find_base(&mut self, codes: &[u32]) -> usize {
        let first_code = codes[0] as usize;
        let last_code = codes[codes.len() - 1] as usize;
        let mut pos = (first_code + 1).max(self.next_check_pos);
        let mut first_free = true;
        let mut taken = 0usize;

        let begin = loop {
            self.ensure(pos + 1);
            if self.check[pos] != FREE {
                taken += 1;
                pos += 1;
                continue;
            }
            if first_free {
                self.next_check_pos = pos;
                first_free = false;
            }
            let begin = pos - first_code - 1;
            self.ensure(begin + last_code + 2);
            if !self.used[begin]
                && codes[1..]
                    .iter()
                    .all(|&code| self.check[begin + code as usize + 1] == FREE)
            {
                break begin;
            }
            pos += 1;
        };

        let scanned = pos - self.next_check_pos + 1;
        if taken as f64 / scanned as f64 >= DENSE_REGION_RATIO {
            self.next_check_pos = pos;
        }
        self.used[begin] = true;
        begin
    }

    fn ensure(&mut self, len: usize) {
        if self.check.len() >= len {
            return;
        }
        let new_len = (self.check.len() * 2).max(len).max(INITIAL_CAPACITY);
        self.base.resize(new_len, 0);
        self.check.resize(new_len, FREE);
        self.used.resize(new_len, false);
    }
}

/// `goto(state, code)` over packed arrays.
#[inline]
pub(crate) fn transition(base: &[i32], check: &[i32], state: usize, code: u32) -> Option<usize> {
    let b = *base.get(state)?;
    if b < 0 {
        return None;
    }
    let slot = b as usize + code as usize + 1;
    match check.get(slot) {
        Some(&parent) if parent == state as i32 => Some(slot),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(keys: &[&[u32]]) -> PackedArrays {
        let mut trie = Trie::new();
        for (i, key) in keys.iter().enumerate() {
            trie.insert(key, i as u32);
        }
        DoubleArrayBuilder::new().build(&trie)
    }

    fn walk(arrays: &PackedArrays, codes: &[u32]) -> Option<usize> {
        codes.iter().try_fold(ROOT, |state, &code| {
            transition(&arrays.base, &arrays.check, state, code)
        })
    }

    #[test]
    fn every_key_walks_to_its_terminal_leaf() {
        let keys: [&[u32]; 4] = [&[1, 2, 3], &[2, 3, 4], &[1, 2], &[4]];
        let arrays = packed(&keys);
        for (i, key) in keys.iter().enumerate() {
            let state = walk(&arrays, key).unwrap();
            let leaf = transition(&arrays.base, &arrays.check, state, END_OF_KEY).unwrap();
            assert_eq!(-arrays.base[leaf] - 1, i as i32);
        }
        assert!(walk(&arrays, &[3]).is_none());
    }

    #[test]
    fn failure_links_point_at_longest_suffix() {
        let keys: [&[u32]; 2] = [&[1, 2, 3], &[2, 3, 4]];
        let arrays = packed(&keys);
        let s123 = walk(&arrays, &[1, 2, 3]).unwrap();
        let s23 = walk(&arrays, &[2, 3]).unwrap();
        assert_eq!(arrays.fail[s123] as usize, s23);
        let s1 = walk(&arrays, &[1]).unwrap();
        assert_eq!(arrays.fail[s1] as usize, ROOT);
    }

    #[test]
    fn output_inherits_suffix_entries_longest_first() {
        let keys: [&[u32]; 3] = [&[1, 2, 3], &[2, 3], &[3]];
        let arrays = packed(&keys);
        let state = walk(&arrays, &[1, 2, 3]).unwrap();
        assert_eq!(&*arrays.output[state], &[0, 1, 2]);
    }

    #[test]
    fn arrays_are_trimmed_and_slots_unique() {
        let keys: Vec<Vec<u32>> = (1..40u32).map(|i| vec![i % 7 + 1, i % 5 + 1, i % 3 + 1]).collect();
        let refs: Vec<&[u32]> = keys.iter().map(|k| k.as_slice()).collect();
        let arrays = packed(&refs);
        assert_eq!(arrays.base.len(), arrays.check.len());
        assert_ne!(*arrays.check.last().unwrap(), FREE);
        for key in &refs {
            assert!(walk(&arrays, key).is_some());
        }
    }
}
