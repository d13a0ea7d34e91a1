//! Plain-text inputs for the CLI: transaction corpora and literal dictionaries.
//!
//! Corpus: one transaction per line, either a JSON array of strings or
//! whitespace-separated terms. Dictionary: `literal<TAB>term` rows. Both skip
//! blank lines and `#` comments.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

pub fn read_corpus(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus: {}", path.display()))?;
    parse_corpus(&text).with_context(|| format!("invalid corpus: {}", path.display()))
}

pub fn parse_corpus(text: &str) -> Result<Vec<Vec<String>>> {
    let mut transactions = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if is_skippable(line) {
            continue;
        }
        let trimmed = line.trim();
        let terms: Vec<String> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)
                .map_err(|e| anyhow!("line {}: not a JSON array of strings: {e}", idx + 1))?
        } else {
            trimmed.split_whitespace().map(str::to_string).collect()
        };
        transactions.push(terms);
    }
    Ok(transactions)
}

/// Dictionary rows in file order, as `(literal, term)`.
pub fn read_dictionary(path: &Path) -> Result<Vec<(String, String)>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read dictionary: {}", path.display()))?;
    parse_dictionary(&text).with_context(|| format!("invalid dictionary: {}", path.display()))
}

pub fn parse_dictionary(text: &str) -> Result<Vec<(String, String)>> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if is_skippable(line) {
            continue;
        }
        let (literal, term) = line
            .split_once('\t')
            .ok_or_else(|| anyhow!("line {}: expected literal<TAB>term", idx + 1))?;
        let term = term.trim();
        if literal.is_empty() || term.is_empty() {
            return Err(anyhow!("line {}: empty literal or term", idx + 1));
        }
        rows.push((literal.to_string(), term.to_string()));
    }
    Ok(rows)
}

/// First literal seen for each term, used as its human-readable label.
pub fn term_labels(rows: &[(String, String)]) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for (literal, term) in rows {
        labels
            .entry(term.clone())
            .or_insert_with(|| literal.clone());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn corpus_accepts_json_and_plain_lines() {
        let text = "# curated\n[\"BAO:1\", \"BAO:2\"]\n\nBAO:3   BAO:4\n";
        let corpus = parse_corpus(text).unwrap();
        assert_eq!(
            corpus,
            vec![
                vec!["BAO:1".to_string(), "BAO:2".to_string()],
                vec!["BAO:3".to_string(), "BAO:4".to_string()],
            ]
        );
    }

    #[test]
    fn corpus_error_names_the_line() {
        let err = parse_corpus("a b\n[\"x\", 3]\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn dictionary_rows_and_labels() {
        let rows = parse_dictionary("CHO cell\tCLO:1\nCHO\tCLO:1\nHeLa\tCLO:2\n").unwrap();
        assert_eq!(rows.len(), 3);
        let labels = term_labels(&rows);
        assert_eq!(labels["CLO:1"], "CHO cell");
        assert_eq!(labels["CLO:2"], "HeLa");
        assert!(parse_dictionary("no tab here\n").is_err());
    }

    proptest! {
        #[test]
        fn plain_lines_split_on_whitespace(terms in proptest::collection::vec("[A-Z]{3}:[0-9]{1,4}", 1..6)) {
            let line = terms.join(" \t ");
            let corpus = parse_corpus(&line).unwrap();
            prop_assert_eq!(corpus, vec![terms]);
        }
    }
}
