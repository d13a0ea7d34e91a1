//! RuleModel: association rules indexed by sorted antecedent.
//!
//! Rules are stored in a [`PrefixIndex`] keyed by the antecedent's sorted term
//! sequence, carrying a [`RulePrediction`] for the consequent. Predicting from
//! an unordered set of known terms is an order-independent traversal of that
//! index: every rule whose antecedent is a subset of the known terms fires.
//!
//! A built model is immutable and shared across threads without locking.

use std::collections::{BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::LearnerConfig;
use crate::error::Result;
use crate::itemset::Rule;
use crate::learner::RuleLearner;
use crate::prefix_index::PrefixIndex;

/// A consequent suggested by a rule.
///
/// Equality and hashing use `label` only: two predictions for the same term
/// are the same suggestion even when they come from different rules. When a
/// query reaches several rules with one consequent, the first one met during
/// traversal is kept (the statistics of the others are dropped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulePrediction {
    pub label: String,
    pub confidence: f64,
    pub lift: f64,
    pub support: u32,
}

impl PartialEq for RulePrediction {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for RulePrediction {}

impl Hash for RulePrediction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

impl From<&Rule> for RulePrediction {
    fn from(rule: &Rule) -> Self {
        Self {
            label: rule.consequent_term().to_string(),
            confidence: rule.confidence,
            lift: rule.lift,
            support: rule.support,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub min_support: u32,
    pub max_size: usize,
    pub rules: usize,
    pub index_nodes: usize,
    pub antecedent_roots: usize,
}

#[derive(Debug, Clone)]
pub struct RuleModel {
    min_support: u32,
    max_size: usize,
    index: PrefixIndex<String, RulePrediction>,
}

impl RuleModel {
    pub fn new(min_support: u32, max_size: usize) -> Self {
        Self {
            min_support,
            max_size,
            index: PrefixIndex::new(),
        }
    }

    /// Build a model from already derived rules.
    pub fn from_rules<'a, I>(min_support: u32, max_size: usize, rules: I) -> Self
    where
        I: IntoIterator<Item = &'a Rule>,
    {
        let mut model = Self::new(min_support, max_size);
        for rule in rules {
            model.insert(&rule.antecedent.items, RulePrediction::from(rule));
        }
        model
    }

    /// Mine `transactions` and index the resulting rules.
    pub fn learn<T, S>(transactions: &[T], config: &LearnerConfig) -> Result<Self>
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let learner = RuleLearner::new(config.clone())?;
        let rules = learner.learn(transactions);
        Ok(Self::from_rules(config.min_support, config.max_size, &rules))
    }

    /// Index one prediction under a sorted, deduplicated antecedent.
    pub(crate) fn insert(&mut self, antecedent: &[String], prediction: RulePrediction) {
        self.index.insert(antecedent, prediction);
    }

    /// Predictions of every rule whose antecedent is contained in `known`.
    ///
    /// Deduplicated by label and ordered by descending confidence. Unknown
    /// terms contribute nothing; an empty query yields an empty result.
    pub fn predict<I, S>(&self, known: I) -> Vec<RulePrediction>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let query: BTreeSet<String> = known
            .into_iter()
            .map(|term| term.as_ref().to_string())
            .collect();
        self.predict_set(&query)
    }

    fn predict_set(&self, query: &BTreeSet<String>) -> Vec<RulePrediction> {
        let mut seen: HashSet<&RulePrediction> = HashSet::new();
        let mut out: Vec<RulePrediction> = Vec::new();
        self.index.for_each_match(query, |prediction| {
            if seen.insert(prediction) {
                out.push(prediction.clone());
            }
        });
        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        out
    }

    /// [`RuleModel::predict`] without the terms already known, capped at `limit`.
    pub fn suggest<I, S>(&self, known: I, limit: usize) -> Vec<RulePrediction>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let query: BTreeSet<String> = known
            .into_iter()
            .map(|term| term.as_ref().to_string())
            .collect();
        self.predict_set(&query)
            .into_iter()
            .filter(|p| !query.contains(&p.label))
            .take(limit)
            .collect()
    }

    /// Predict for many annotation sets at once, in parallel.
    pub fn predict_many<S>(&self, queries: &[Vec<S>]) -> Vec<Vec<RulePrediction>>
    where
        S: AsRef<str> + Sync,
    {
        queries
            .par_iter()
            .map(|known| self.predict(known.iter().map(|s| s.as_ref())))
            .collect()
    }

    /// Predictions stored at exactly this ordered antecedent.
    pub fn lookup<S: AsRef<str>>(&self, ordered_antecedent: &[S]) -> Vec<RulePrediction> {
        let keys: Vec<String> = ordered_antecedent
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        self.index.get(&keys).to_vec()
    }

    /// Every `(antecedent, prediction)` pair in antecedent order.
    pub fn rules(&self) -> impl Iterator<Item = (Vec<String>, &RulePrediction)> {
        self.index.entries().into_iter()
    }

    pub fn rule_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn min_support(&self) -> u32 {
        self.min_support
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            min_support: self.min_support,
            max_size: self.max_size,
            rules: self.index.len(),
            index_nodes: self.index.node_count(),
            antecedent_roots: self.index.root_keys().count(),
        }
    }
}
