//! Itemsets and association rules produced by the learner.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Separator used when an itemset is rendered as a single key (`a::b::c`).
pub const ITEM_SEPARATOR: &str = "::";

/// A sorted, deduplicated set of term identifiers with its support count.
///
/// Equality and hashing consider `items` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSet {
    pub items: Vec<String>,
    pub support: u32,
}

impl ItemSet {
    /// Build an itemset, normalizing `items` into canonical order.
    pub fn new<I, S>(items: I, support: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
        items.sort();
        items.dedup();
        Self { items, support }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Canonical single-string key, e.g. `2::4`.
    pub fn key(&self) -> String {
        self.items.join(ITEM_SEPARATOR)
    }
}

impl PartialEq for ItemSet {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for ItemSet {}

impl Hash for ItemSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

/// `antecedent -> consequent` with its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub antecedent: ItemSet,
    /// Always a single item.
    pub consequent: ItemSet,
    /// Support of `antecedent ∪ consequent`.
    pub support: u32,
    pub confidence: f64,
    /// `confidence / support(consequent)`, with the consequent's raw count as
    /// the denominator.
    pub lift: f64,
}

impl Rule {
    /// The consequent's single term.
    pub fn consequent_term(&self) -> &str {
        &self.consequent.items[0]
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} => {} (support {}, confidence {:.3}, lift {:.4})",
            self.antecedent.key(),
            self.consequent.key(),
            self.support,
            self.confidence,
            self.lift
        )
    }
}
