//! Level-wise frequent-itemset mining and rule derivation.
//!
//! 1. Count single items in one pass and drop those below `min_support`.
//! 2. Intern the frequent items in lexicographic order, so integer order and
//!    term order agree, and load the filtered transactions into an
//!    [`ItemSetCounter`].
//! 3. Grow k-itemsets into (k+1)-itemsets with `children_support`, keeping
//!    extensions at or above `min_support`, until a level is empty or
//!    `max_size` is reached.
//!
//! Rules take one item of a frequent itemset as consequent and the rest as
//! antecedent.

use std::collections::BTreeSet;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::config::LearnerConfig;
use crate::counter::ItemSetCounter;
use crate::error::Result;
use crate::itemset::{ItemSet, Rule};

type ItemId = u32;

#[derive(Debug, Clone)]
pub struct RuleLearner {
    config: LearnerConfig,
}

impl RuleLearner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Mine every itemset with support `>= min_support` and size `<= max_size`.
    ///
    /// Output is ordered by size, then by items.
    pub fn generate_item_sets<T, S>(&self, transactions: &[T]) -> Vec<ItemSet>
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let min_support = self.config.min_support;

        let mut single: AHashMap<&str, u32> = AHashMap::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for transaction in transactions {
            seen.clear();
            seen.extend(transaction.as_ref().iter().map(|item| item.as_ref()));
            for &item in &seen {
                *single.entry(item).or_insert(0) += 1;
            }
        }

        let mut vocab: Vec<&str> = single
            .iter()
            .filter(|(_, &count)| count >= min_support)
            .map(|(&item, _)| item)
            .collect();
        vocab.sort_unstable();
        let ids: AHashMap<&str, ItemId> = vocab
            .iter()
            .enumerate()
            .map(|(i, &item)| (item, i as ItemId))
            .collect();

        let mut counter: ItemSetCounter<ItemId> = ItemSetCounter::new();
        let mut filtered: Vec<ItemId> = Vec::new();
        for transaction in transactions {
            filtered.clear();
            filtered.extend(
                transaction
                    .as_ref()
                    .iter()
                    .filter_map(|item| ids.get(item.as_ref()).copied()),
            );
            if filtered.is_empty() {
                continue;
            }
            filtered.sort_unstable();
            filtered.dedup();
            counter.add(&filtered);
        }

        tracing::debug!(
            transactions = transactions.len(),
            frequent_items = vocab.len(),
            trie_nodes = counter.node_count(),
            "built itemset counter"
        );

        let mut level: Vec<(Vec<ItemId>, u32)> = (0..vocab.len() as ItemId)
            .map(|id| (vec![id], single[vocab[id as usize]]))
            .collect();
        let mut mined: Vec<(Vec<ItemId>, u32)> = level.clone();

        let mut size = 1usize;
        while !level.is_empty() && size < self.config.max_size {
            let mut next: Vec<(Vec<ItemId>, u32)> = level
                .par_iter()
                .flat_map_iter(|(items, _)| {
                    counter
                        .children_support(items)
                        .into_iter()
                        .filter(|&(_, support)| support >= min_support)
                        .map(|(child, support)| {
                            let mut grown = items.clone();
                            grown.push(child);
                            (grown, support)
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            next.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            size += 1;
            tracing::debug!(size, itemsets = next.len(), "grew itemset level");
            mined.extend(next.iter().cloned());
            level = next;
        }

        mined
            .into_iter()
            .map(|(items, support)| ItemSet {
                items: items
                    .into_iter()
                    .map(|id| vocab[id as usize].to_string())
                    .collect(),
                support,
            })
            .collect()
    }

    /// Derive single-consequent rules from mined itemsets.
    pub fn generate_rules(&self, item_sets: &[ItemSet]) -> Vec<Rule> {
        let support_of: AHashMap<&[String], u32> = item_sets
            .iter()
            .map(|set| (set.items.as_slice(), set.support))
            .collect();

        let mut rules = Vec::new();
        let mut skipped = 0usize;
        for set in item_sets.iter().filter(|set| set.len() >= 2) {
            for (i, consequent) in set.items.iter().enumerate() {
                let mut antecedent = set.items.clone();
                antecedent.remove(i);

                let (Some(&antecedent_support), Some(&consequent_support)) = (
                    support_of.get(antecedent.as_slice()),
                    support_of.get(std::slice::from_ref(consequent)),
                ) else {
                    skipped += 1;
                    continue;
                };
                if antecedent_support == 0 || consequent_support == 0 {
                    skipped += 1;
                    continue;
                }

                let confidence = set.support as f64 / antecedent_support as f64;
                if confidence < self.config.min_confidence {
                    continue;
                }
                let lift = confidence / consequent_support as f64;

                rules.push(Rule {
                    antecedent: ItemSet {
                        items: antecedent,
                        support: antecedent_support,
                    },
                    consequent: ItemSet {
                        items: vec![consequent.clone()],
                        support: consequent_support,
                    },
                    support: set.support,
                    confidence,
                    lift,
                });
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "skipped rule candidates with unknown subset support");
        }
        rules
    }

    /// Mine itemsets and rules in one call.
    pub fn learn<T, S>(&self, transactions: &[T]) -> Vec<Rule>
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let item_sets = self.generate_item_sets(transactions);
        let rules = self.generate_rules(&item_sets);
        tracing::info!(
            transactions = transactions.len(),
            itemsets = item_sets.len(),
            rules = rules.len(),
            min_support = self.config.min_support,
            max_size = self.config.max_size,
            min_confidence = self.config.min_confidence,
            "learned association rules"
        );
        rules
    }
}
