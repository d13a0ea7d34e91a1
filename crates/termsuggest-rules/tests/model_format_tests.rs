use std::collections::BTreeSet;
use std::io::Write;

use proptest::prelude::*;
use tempfile::tempdir;
use termsuggest_rules::{
    LearnerConfig, RuleModel, RulePrediction, RulesError, RULE_MODEL_VERSION_V1,
};

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

fn sample_model() -> RuleModel {
    RuleModel::learn(&sample_transactions(), &LearnerConfig::new(3, 10, 0.6)).unwrap()
}

fn labels(predictions: &[RulePrediction]) -> Vec<&str> {
    predictions.iter().map(|p| p.label.as_str()).collect()
}

fn to_text(model: &RuleModel) -> String {
    let mut buf = Vec::new();
    model.write_to(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn predict_orders_by_confidence() {
    let model = sample_model();
    assert_eq!(model.rule_count(), 6);
    assert_eq!(labels(&model.predict(["4"])), vec!["2", "3"]);
    assert_eq!(labels(&model.predict(["1"])), vec!["2"]);
}

#[test]
fn predict_deduplicates_by_label_keeping_the_first_rule_met() {
    let model = sample_model();
    let predictions = model.predict(["4", "3"]);
    let found: BTreeSet<&str> = labels(&predictions).into_iter().collect();
    assert_eq!(found, ["2", "3", "4"].into_iter().collect::<BTreeSet<&str>>());
    assert_eq!(predictions.len(), 3);

    // `3 -> 2` (0.75) is met before `4 -> 2` (0.8) in key order.
    let two = predictions.iter().find(|p| p.label == "2").unwrap();
    assert_eq!(two.confidence, 0.75);
}

#[test]
fn predict_with_unknown_or_empty_input_is_empty() {
    let model = sample_model();
    assert!(model.predict(["nope"]).is_empty());
    assert!(model.predict(Vec::<String>::new()).is_empty());
}

#[test]
fn suggest_drops_known_terms_and_limits() {
    let model = sample_model();
    let suggestions = model.suggest(["3", "4"], 10);
    assert_eq!(labels(&suggestions), vec!["2"]);
    assert_eq!(model.suggest(["4"], 1).len(), 1);
}

#[test]
fn lookup_is_exact() {
    let model = sample_model();
    assert_eq!(labels(&model.lookup(&["4"])), vec!["2", "3"]);
    assert!(model.lookup(&["2", "4"]).is_empty());
    assert!(model.lookup::<&str>(&[]).is_empty());
}

#[test]
fn predict_many_matches_predict() {
    let model = sample_model();
    let queries = vec![vec!["4"], vec!["1", "3"], vec![]];
    let batch = model.predict_many(&queries);
    for (query, result) in queries.iter().zip(&batch) {
        assert_eq!(labels(result), labels(&model.predict(query.iter())));
    }
}

#[test]
fn text_format_layout() {
    let text = to_text(&sample_model());
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(RULE_MODEL_VERSION_V1));
    assert_eq!(lines.next(), Some("min_support\t3"));
    assert_eq!(lines.next(), Some("max_size\t10"));
    assert!(lines.next().unwrap().starts_with('#'));
    assert!(text.contains("4\t2\t4\t0.8\t"));
}

#[test]
fn gzip_file_round_trip_preserves_predictions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("models").join("rules.tsv.gz");
    let model = sample_model();
    model.save(&path).unwrap();

    let loaded = RuleModel::load(&path).unwrap();
    assert_eq!(loaded.min_support(), 3);
    assert_eq!(loaded.max_size(), 10);
    assert_eq!(loaded.rule_count(), model.rule_count());
    for query in [vec!["1"], vec!["3"], vec!["4"], vec!["3", "4"], vec!["1", "2", "3", "4"]] {
        let before = model.predict(&query);
        let after = loaded.predict(&query);
        assert_eq!(labels(&before), labels(&after));
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.confidence, a.confidence);
            assert_eq!(b.lift, a.lift);
            assert_eq!(b.support, a.support);
        }
    }
}

#[test]
fn audit_columns_are_written_and_ignored_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rules.tsv.gz");
    let model = sample_model();
    model
        .save_with_labels(&path, |term| Some(format!("term {term}")))
        .unwrap();
    let loaded = RuleModel::load(&path).unwrap();
    assert_eq!(labels(&loaded.predict(["4"])), vec!["2", "3"]);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = RuleModel::load(&dir.path().join("absent.gz")).unwrap_err();
    assert!(matches!(err, RulesError::Io(_)));
}

#[test]
fn plain_text_file_is_not_a_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.tsv");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(to_text(&sample_model()).as_bytes())
        .unwrap();
    assert!(RuleModel::load(&path).is_err());
}

fn expect_format_error(text: &str, expected_line: usize) {
    match RuleModel::read_from(text.as_bytes()) {
        Err(RulesError::Format { line, .. }) => assert_eq!(line, expected_line, "{text}"),
        Err(other) => panic!("expected a format error, got {other}"),
        Ok(_) => panic!("expected a format error for:\n{text}"),
    }
}

#[test]
fn malformed_rows_name_their_line() {
    let header = format!("{RULE_MODEL_VERSION_V1}\nmin_support\t3\nmax_size\t4\n");
    expect_format_error(&format!("{header}a\tb\t3\t0.5\n"), 4);
    expect_format_error(&format!("{header}a\tb\t3\t0.5\t1\nb::a\tc\t3\t0.5\t1\n"), 5);
    expect_format_error(&format!("{header}a::a\tc\t3\t0.5\t1\n"), 4);
    expect_format_error(&format!("{header}\n# note\na\tb\tthree\t0.5\t1\n"), 6);
    expect_format_error(&format!("{header}a\tb\t3\t1.5\t1\n"), 4);
    expect_format_error(&format!("{header}a\tb\t3\t0.5\t-1\n"), 4);
    expect_format_error(&format!("{header}a\tb::c\t3\t0.5\t1\n"), 4);
    expect_format_error(&format!("{header}::a\tb\t3\t0.5\t1\n"), 4);
    expect_format_error("not a model\n", 1);
    expect_format_error(&format!("{RULE_MODEL_VERSION_V1}\nmin_support\tx\n"), 2);
    expect_format_error(&format!("{RULE_MODEL_VERSION_V1}\nmin_support\t3\n"), 2);
}

#[test]
fn future_version_is_rejected() {
    let err = RuleModel::read_from("termsuggest_rule_model_v9\n".as_bytes()).unwrap_err();
    assert!(matches!(err, RulesError::UnsupportedVersion { .. }));
}

#[test]
fn save_rejects_terms_that_break_the_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.gz");
    let model = RuleModel::learn(
        &[vec!["a::b", "c"], vec!["a::b", "c"]],
        &LearnerConfig::new(1, 2, 0.5),
    )
    .unwrap();
    let err = model.save(&path).unwrap_err();
    assert!(matches!(err, RulesError::InvalidTerm { .. }));
    assert!(!path.exists());
}

#[test]
fn save_rejects_terms_the_reader_would_rewrite() {
    let dir = tempdir().unwrap();
    // Padded terms come back trimmed; edge colons fuse into the `::` separator.
    for bad in [" x", "x ", "p:", ":p"] {
        let path = dir.path().join("edge.gz");
        let model = RuleModel::learn(
            &[vec![bad, "q", "r"], vec![bad, "q", "r"]],
            &LearnerConfig::new(1, 3, 0.5),
        )
        .unwrap();
        let err = model.save(&path).unwrap_err();
        match err {
            RulesError::InvalidTerm { term, .. } => assert_eq!(term, bad),
            other => panic!("expected InvalidTerm for {bad:?}, got {other:?}"),
        }
        assert!(!path.exists(), "{bad:?} left a file behind");
    }
}

#[test]
fn inner_colons_survive_a_reload() {
    let model = RuleModel::learn(
        &[vec!["p:q", "r"], vec!["p:q", "r"]],
        &LearnerConfig::new(1, 2, 0.5),
    )
    .unwrap();
    let loaded = RuleModel::read_from(to_text(&model).as_bytes()).unwrap();
    assert_eq!(rule_set(&loaded), rule_set(&model));
    assert_eq!(labels(&loaded.predict(["p:q"])), vec!["r"]);
}

/// Every rule with its statistics, independent of storage order.
fn rule_set(model: &RuleModel) -> BTreeSet<(Vec<String>, String, u32, u64, u64)> {
    model
        .rules()
        .map(|(antecedent, p)| {
            (
                antecedent,
                p.label.clone(),
                p.support,
                p.confidence.to_bits(),
                p.lift.to_bits(),
            )
        })
        .collect()
}

/// Terms that sometimes carry a space or colon at either edge.
const TERM: &str = "[ :]?bao:[0-9][ :]?";

fn corpus() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(
        proptest::collection::btree_set(TERM, 1..5)
            .prop_map(|s| s.into_iter().collect::<Vec<String>>()),
        1..25,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn text_round_trip_preserves_predictions(ts in corpus(), queries in proptest::collection::vec(proptest::collection::btree_set(TERM, 0..4), 1..8)) {
        let model = RuleModel::learn(&ts, &LearnerConfig::new(1, 3, 0.2)).unwrap();
        let mut buf = Vec::new();
        if let Err(err) = model.write_to(&mut buf) {
            // Only a term the reader would not give back may stop the write.
            match err {
                RulesError::InvalidTerm { term, .. } => {
                    prop_assert!(term.trim() != term || term.starts_with(':') || term.ends_with(':'), "{:?}", term);
                }
                other => prop_assert!(false, "unexpected error: {:?}", other),
            }
            return Ok(());
        }
        let loaded = RuleModel::read_from(buf.as_slice()).unwrap();
        prop_assert_eq!(rule_set(&loaded), rule_set(&model));
        for query in &queries {
            let before = model.predict(query);
            let after = loaded.predict(query);
            prop_assert_eq!(labels(&before), labels(&after));
            for (b, a) in before.iter().zip(&after) {
                prop_assert_eq!(b.confidence, a.confidence);
                prop_assert_eq!(b.lift, a.lift);
            }
        }
    }
}
