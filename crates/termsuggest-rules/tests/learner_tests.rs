use std::collections::{BTreeMap, BTreeSet, HashMap};

use approx::assert_relative_eq;
use proptest::prelude::*;
use termsuggest_rules::{ItemSet, LearnerConfig, RuleLearner};

fn item_sets_by_size(item_sets: &[ItemSet]) -> BTreeMap<usize, Vec<&ItemSet>> {
    let mut out: BTreeMap<usize, Vec<&ItemSet>> = BTreeMap::new();
    for set in item_sets {
        out.entry(set.len()).or_default().push(set);
    }
    out
}

fn sample_transactions() -> Vec<Vec<&'static str>> {
    vec![
        vec!["1", "2", "3", "4"],
        vec!["1", "2", "4"],
        vec!["1", "2"],
        vec!["2", "3", "4"],
        vec!["2", "3"],
        vec!["3", "4"],
        vec!["2", "4"],
    ]
}

fn supports(item_sets: &[ItemSet]) -> HashMap<String, u32> {
    item_sets.iter().map(|s| (s.key(), s.support)).collect()
}

#[test]
fn mines_expected_supports() {
    let learner = RuleLearner::new(LearnerConfig::new(3, 10, 0.6)).unwrap();
    let item_sets = learner.generate_item_sets(&sample_transactions());
    let supports = supports(&item_sets);

    assert_eq!(supports["1"], 3);
    assert_eq!(supports["2"], 6);
    assert_eq!(supports["3"], 4);
    assert_eq!(supports["4"], 5);
    assert_eq!(supports["2::4"], 4);
    assert_eq!(supports["1::2"], 3);
    assert_eq!(supports["2::3"], 3);
    assert_eq!(supports["3::4"], 3);
    assert_eq!(supports.len(), 8, "unexpected itemsets: {supports:?}");
}

#[test]
fn output_is_ordered_by_size_then_items() {
    let learner = RuleLearner::new(LearnerConfig::new(3, 10, 0.6)).unwrap();
    let keys: Vec<String> = learner
        .generate_item_sets(&sample_transactions())
        .iter()
        .map(ItemSet::key)
        .collect();
    assert_eq!(
        keys,
        vec!["1", "2", "3", "4", "1::2", "2::3", "2::4", "3::4"]
    );
}

#[test]
fn max_size_caps_growth() {
    let learner = RuleLearner::new(LearnerConfig::new(2, 2, 0.6)).unwrap();
    let item_sets = learner.generate_item_sets(&sample_transactions());
    assert!(item_sets.iter().all(|s| s.len() <= 2));

    let unbounded = RuleLearner::new(LearnerConfig::new(2, 10, 0.6)).unwrap();
    let by_size_sets = unbounded.generate_item_sets(&sample_transactions());
    let by_size = item_sets_by_size(&by_size_sets);
    let triples: BTreeSet<String> = by_size[&3].iter().map(|s| s.key()).collect();
    assert_eq!(
        triples,
        ["1::2::4", "2::3::4"]
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<String>>()
    );
    assert!(!by_size.contains_key(&4));
}

#[test]
fn duplicate_items_in_a_transaction_count_once() {
    let learner = RuleLearner::new(LearnerConfig::new(1, 3, 0.0)).unwrap();
    let item_sets = learner.generate_item_sets(&[vec!["x", "x", "y"], vec!["y"]]);
    let supports = supports(&item_sets);
    assert_eq!(supports["x"], 1);
    assert_eq!(supports["y"], 2);
    assert_eq!(supports["x::y"], 1);
}

#[test]
fn empty_corpus_mines_nothing() {
    let learner = RuleLearner::new(LearnerConfig::default()).unwrap();
    let empty: Vec<Vec<String>> = Vec::new();
    assert!(learner.generate_item_sets(&empty).is_empty());
    assert!(learner.learn(&empty).is_empty());
}

#[test]
fn rules_carry_confidence_and_raw_count_lift() {
    let learner = RuleLearner::new(LearnerConfig::new(3, 10, 0.6)).unwrap();
    let item_sets = learner.generate_item_sets(&sample_transactions());
    let rules = learner.generate_rules(&item_sets);

    let described: BTreeSet<(String, String)> = rules
        .iter()
        .map(|r| (r.antecedent.key(), r.consequent.key()))
        .collect();
    let expected: BTreeSet<(String, String)> = [
        ("1", "2"),
        ("3", "2"),
        ("2", "4"),
        ("4", "2"),
        ("3", "4"),
        ("4", "3"),
    ]
    .iter()
    .map(|(a, c)| (a.to_string(), c.to_string()))
    .collect();
    assert_eq!(described, expected);

    let four_to_two = rules
        .iter()
        .find(|r| r.antecedent.key() == "4" && r.consequent.key() == "2")
        .unwrap();
    assert_eq!(four_to_two.support, 4);
    assert_eq!(four_to_two.antecedent.support, 5);
    assert_eq!(four_to_two.consequent.support, 6);
    assert_relative_eq!(four_to_two.confidence, 0.8);
    // lift divides by the consequent's raw support count.
    assert_relative_eq!(four_to_two.lift, 0.8 / 6.0);
}

#[test]
fn learner_rejects_invalid_config() {
    assert!(RuleLearner::new(LearnerConfig::new(0, 3, 0.6)).is_err());
    assert!(RuleLearner::new(LearnerConfig::new(1, 0, 0.6)).is_err());
}

fn corpus() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(
        proptest::collection::btree_set("[a-f]", 1..5)
            .prop_map(|s| s.into_iter().collect::<Vec<String>>()),
        1..30,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rule_confidence_is_exact_and_bounded(ts in corpus(), min_support in 1u32..4) {
        let learner = RuleLearner::new(LearnerConfig::new(min_support, 4, 0.3)).unwrap();
        let item_sets = learner.generate_item_sets(&ts);
        for rule in learner.generate_rules(&item_sets) {
            prop_assert!(rule.confidence > 0.0 && rule.confidence <= 1.0);
            prop_assert_eq!(
                rule.confidence,
                rule.support as f64 / rule.antecedent.support as f64
            );
            prop_assert!(rule.confidence >= 0.3);
            prop_assert!(rule.support >= min_support);
        }
    }

    #[test]
    fn mined_supports_match_brute_force(ts in corpus(), min_support in 1u32..4) {
        let learner = RuleLearner::new(LearnerConfig::new(min_support, 3, 0.6)).unwrap();
        for set in learner.generate_item_sets(&ts) {
            let brute = ts
                .iter()
                .filter(|t| set.items.iter().all(|i| t.contains(i)))
                .count() as u32;
            prop_assert_eq!(set.support, brute);
            prop_assert!(set.support >= min_support);
        }
    }
}
