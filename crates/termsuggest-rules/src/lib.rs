//! termsuggest-rules: association rules for ontology term suggestion.
//!
//! Given curated records reduced to sets of term identifiers (transactions),
//! this crate mines frequent itemsets, derives `antecedent -> consequent`
//! rules, and answers "which terms usually come with these ones?".
//!
//! ## Pipeline
//!
//! ```text
//!  transactions ──► RuleLearner ──► Vec<Rule> ──► RuleModel ──► .gz model file
//!                   (ItemSetCounter)               (PrefixIndex)
//!
//!  known terms ──► RuleModel::predict ──► Vec<RulePrediction>
//! ```
//!
//! ## Module Organization
//!
//! - `prefix_index`: generic ordered-key trie with order-independent queries
//! - `counter`: compressed counting trie for itemset support
//! - `learner`: level-wise itemset growth and rule derivation
//! - `model`: the prediction index
//! - `format`: versioned text format (gzip on disk)
//! - `registry`: lifecycle owner for a shared model

pub mod config;
pub mod counter;
pub mod error;
pub mod format;
pub mod itemset;
pub mod learner;
pub mod model;
pub mod prefix_index;
pub mod registry;

pub use config::LearnerConfig;
pub use counter::ItemSetCounter;
pub use error::{Result, RulesError};
pub use format::RULE_MODEL_VERSION_V1;
pub use itemset::{ItemSet, Rule, ITEM_SEPARATOR};
pub use learner::RuleLearner;
pub use model::{ModelSummary, RuleModel, RulePrediction};
pub use prefix_index::PrefixIndex;
pub use registry::ModelRegistry;
