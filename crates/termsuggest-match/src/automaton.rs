//! DoubleArrayAhoCorasick: multi-pattern literal matching over text.
//!
//! Transitions live in a double array: from state `s` on code `c` the
//! candidate slot is `base[s] + c + 1`, valid iff `check[slot] == s`. A slot
//! whose `base` is negative is a terminal leaf for dictionary entry
//! `-base - 1`. On a missed transition the scan follows `fail` links, and
//! every state carries the full list of entries ending there (its own first,
//! then those inherited through its failure link), so one left-to-right pass
//! reports every occurrence.
//!
//! Offsets are UTF-8 byte offsets into the scanned text.
//!
//! Deserialization checks the arrays against each other before handing out
//! an automaton, so a corrupted blob is an error rather than a panic mid-scan.

use std::ops::ControlFlow;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, END_OF_KEY};
use crate::builder::{transition, DoubleArrayBuilder, Trie, ROOT};

/// One dictionary entry found in the scanned text.
#[derive(Debug, PartialEq)]
pub struct Hit<'a, V> {
    /// Byte offset of the first matched character.
    pub begin: usize,
    /// Byte offset just past the last matched character.
    pub end: usize,
    /// Dictionary index of the entry (first-insertion order of its key).
    pub index: usize,
    pub value: &'a V,
}

impl<V> Clone for Hit<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Hit<'_, V> {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "PackedAutomaton<V>",
    bound(deserialize = "V: Deserialize<'de>")
)]
pub struct DoubleArrayAhoCorasick<V> {
    alphabet: Alphabet,
    base: Vec<i32>,
    check: Vec<i32>,
    fail: Vec<u32>,
    output: Vec<Box<[u32]>>,
    /// Key length in bytes, per dictionary index.
    length: Vec<u32>,
    values: Vec<V>,
}

impl<V> Default for DoubleArrayAhoCorasick<V> {
    fn default() -> Self {
        Self::build(std::iter::empty::<(&str, V)>())
    }
}

impl<V> DoubleArrayAhoCorasick<V> {
    /// Build the automaton from `(key, value)` pairs.
    ///
    /// A key given more than once keeps its first index and its last value.
    /// Empty keys are skipped.
    pub fn build<I, K>(dictionary: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let mut slots: AHashMap<String, usize> = AHashMap::new();
        let mut keys: Vec<String> = Vec::new();
        let mut values: Vec<V> = Vec::new();
        let mut replaced = 0usize;
        for (key, value) in dictionary {
            let key = key.as_ref();
            if key.is_empty() {
                tracing::warn!("skipping empty dictionary key");
                continue;
            }
            match slots.get(key) {
                Some(&slot) => {
                    values[slot] = value;
                    replaced += 1;
                }
                None => {
                    slots.insert(key.to_string(), keys.len());
                    keys.push(key.to_string());
                    values.push(value);
                }
            }
        }

        let mut alphabet = Alphabet::default();
        let mut trie = Trie::new();
        for (index, key) in keys.iter().enumerate() {
            let codes: Vec<u32> = key.chars().map(|ch| alphabet.intern(ch)).collect();
            trie.insert(&codes, index as u32);
        }
        let trie_nodes = trie.node_count();
        let arrays = DoubleArrayBuilder::new().build(&trie);

        tracing::debug!(
            entries = keys.len(),
            replaced,
            alphabet = alphabet.len(),
            trie_nodes,
            slots = arrays.base.len(),
            "built dictionary automaton"
        );

        Self {
            alphabet,
            base: arrays.base,
            check: arrays.check,
            fail: arrays.fail,
            output: arrays.output,
            length: keys.iter().map(|k| k.len() as u32).collect(),
            values,
        }
    }

    /// Every dictionary occurrence in `text`, in end-offset order (longest
    /// first among entries ending at the same offset).
    pub fn scan<'a>(&'a self, text: &str) -> Vec<Hit<'a, V>> {
        let mut hits = Vec::new();
        let _ = self.scan_with(text, |hit| {
            hits.push(hit);
            ControlFlow::Continue(())
        });
        hits
    }

    /// Feed hits to `on_hit` as they are found; `Break` stops the scan.
    pub fn scan_with<'a, F>(&'a self, text: &str, mut on_hit: F) -> ControlFlow<()>
    where
        F: FnMut(Hit<'a, V>) -> ControlFlow<()>,
    {
        let mut state = ROOT;
        for (offset, ch) in text.char_indices() {
            state = self.next_state(state, ch);
            let end = offset + ch.len_utf8();
            for &index in self.output[state].iter() {
                let index = index as usize;
                let Some(begin) = end.checked_sub(self.length[index] as usize) else {
                    continue;
                };
                on_hit(Hit {
                    begin,
                    end,
                    index,
                    value: &self.values[index],
                })?;
            }
        }
        ControlFlow::Continue(())
    }

    /// The first hit by end offset, if any.
    pub fn find_first<'a>(&'a self, text: &str) -> Option<Hit<'a, V>> {
        let mut first = None;
        let _ = self.scan_with(text, |hit| {
            first = Some(hit);
            ControlFlow::Break(())
        });
        first
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find_first(text).is_some()
    }

    /// Value stored for exactly `key`.
    pub fn exact_match(&self, key: &str) -> Option<&V> {
        let mut state = ROOT;
        for ch in key.chars() {
            let code = self.alphabet.code(ch)?;
            state = transition(&self.base, &self.check, state, code)?;
        }
        let leaf = transition(&self.base, &self.check, state, END_OF_KEY)?;
        let index = -self.base[leaf] - 1;
        self.values.get(usize::try_from(index).ok()?)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.exact_match(key).is_some()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Size of the packed `base/check` arrays.
    pub fn state_count(&self) -> usize {
        self.base.len()
    }

    /// Goto with failure fallback. Characters outside the alphabet reset to the root.
    #[inline]
    fn next_state(&self, mut state: usize, ch: char) -> usize {
        let Some(code) = self.alphabet.code(ch) else {
            return ROOT;
        };
        loop {
            if let Some(next) = transition(&self.base, &self.check, state, code) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.fail[state] as usize;
        }
    }
}

/// Wire shape of [`DoubleArrayAhoCorasick`], validated before use.
#[derive(Deserialize)]
struct PackedAutomaton<V> {
    alphabet: Alphabet,
    base: Vec<i32>,
    check: Vec<i32>,
    fail: Vec<u32>,
    output: Vec<Box<[u32]>>,
    length: Vec<u32>,
    values: Vec<V>,
}

impl<V> TryFrom<PackedAutomaton<V>> for DoubleArrayAhoCorasick<V> {
    type Error = String;

    fn try_from(packed: PackedAutomaton<V>) -> Result<Self, Self::Error> {
        let states = packed.base.len();
        if states == 0 {
            return Err("automaton has no root state".to_string());
        }
        if packed.check.len() != states || packed.fail.len() != states || packed.output.len() != states {
            return Err(format!(
                "state arrays disagree: base {}, check {}, fail {}, output {}",
                states,
                packed.check.len(),
                packed.fail.len(),
                packed.output.len()
            ));
        }
        let entries = packed.values.len();
        if packed.length.len() != entries {
            return Err(format!(
                "{} key lengths for {} entries",
                packed.length.len(),
                entries
            ));
        }
        if packed.length.contains(&0) {
            return Err("zero-length dictionary key".to_string());
        }
        if let Some(state) = packed.fail.iter().position(|&f| f as usize >= states) {
            return Err(format!("failure link of state {state} is out of range"));
        }
        if let Some(state) = packed
            .output
            .iter()
            .position(|out| out.iter().any(|&index| index as usize >= entries))
        {
            return Err(format!("state {state} outputs an unknown entry"));
        }
        check_failure_links(&packed.fail)?;

        Ok(Self {
            alphabet: packed.alphabet,
            base: packed.base,
            check: packed.check,
            fail: packed.fail,
            output: packed.output,
            length: packed.length,
            values: packed.values,
        })
    }
}

/// Every failure chain must reach the root, or a scan would spin forever.
fn check_failure_links(fail: &[u32]) -> Result<(), String> {
    let mut reaches_root = vec![false; fail.len()];
    reaches_root[ROOT] = true;
    let mut chain = Vec::new();
    for start in 0..fail.len() {
        let mut state = start;
        while !reaches_root[state] {
            if chain.len() > fail.len() {
                return Err(format!("failure links from state {start} form a cycle"));
            }
            chain.push(state);
            state = fail[state] as usize;
        }
        for visited in chain.drain(..) {
            reaches_root[visited] = true;
        }
    }
    Ok(())
}

impl<K, V> FromIterator<(K, V)> for DoubleArrayAhoCorasick<V>
where
    K: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::build(iter)
    }
}
