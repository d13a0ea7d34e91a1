//! Rule model text format (v1), stored gzip-compressed on disk.
//!
//! ```text
//! termsuggest_rule_model_v1
//! min_support<TAB>3
//! max_size<TAB>10
//! # antecedent<TAB>consequent<TAB>support<TAB>confidence<TAB>lift
//! a::b<TAB>c<TAB>4<TAB>0.8<TAB>0.2
//! ```
//!
//! - The first line names the format version.
//! - Antecedent items are sorted, unique and joined by `::`.
//! - Columns after the fifth are audit data (labels, provenance) and are not read.
//! - Blank lines and lines starting with `#` are skipped.
//!
//! Loading builds a fresh model and returns it only when every row parsed; a
//! bad row fails the whole load with its 1-based line number.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Result, RulesError};
use crate::itemset::ITEM_SEPARATOR;
use crate::model::{RuleModel, RulePrediction};

pub const RULE_MODEL_VERSION_V1: &str = "termsuggest_rule_model_v1";
const RULE_MODEL_VERSION_PREFIX: &str = "termsuggest_rule_model_v";

const KEY_MIN_SUPPORT: &str = "min_support";
const KEY_MAX_SIZE: &str = "max_size";

const COLUMN_HEADER: &str = "# antecedent\tconsequent\tsupport\tconfidence\tlift";
const AUDIT_COLUMN_HEADER: &str =
    "# antecedent\tconsequent\tsupport\tconfidence\tlift\tantecedent_labels\tconsequent_label";

impl RuleModel {
    /// Load a gzip-compressed model file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let model = Self::read_from(BufReader::new(GzDecoder::new(file)))?;
        tracing::info!(
            path = %path.display(),
            rules = model.rule_count(),
            "loaded rule model"
        );
        Ok(model)
    }

    /// Save as a gzip-compressed model file (written to a temporary sibling,
    /// then renamed into place).
    pub fn save(&self, path: &Path) -> Result<()> {
        self.save_inner(path, None)
    }

    /// Like [`RuleModel::save`], adding human-readable label columns produced by `labeler`.
    pub fn save_with_labels<F>(&self, path: &Path, labeler: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.save_inner(path, Some(&labeler))
    }

    fn save_inner(&self, path: &Path, labeler: Option<&dyn Fn(&str) -> Option<String>>) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        {
            let file = fs::File::create(&tmp)?;
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            let written = self.write_rows(&mut encoder, labeler);
            if let Err(e) = written {
                drop(encoder);
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
            encoder.finish()?.flush()?;
        }
        fs::rename(&tmp, path)?;
        tracing::info!(
            path = %path.display(),
            rules = self.rule_count(),
            "saved rule model"
        );
        Ok(())
    }

    /// Write the uncompressed text form.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_rows(writer, None)
    }

    fn write_rows<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        labeler: Option<&dyn Fn(&str) -> Option<String>>,
    ) -> Result<()> {
        writeln!(writer, "{RULE_MODEL_VERSION_V1}")?;
        writeln!(writer, "{KEY_MIN_SUPPORT}\t{}", self.min_support())?;
        writeln!(writer, "{KEY_MAX_SIZE}\t{}", self.max_size())?;
        let header = if labeler.is_some() {
            AUDIT_COLUMN_HEADER
        } else {
            COLUMN_HEADER
        };
        writeln!(writer, "{header}")?;

        for (antecedent, prediction) in self.rules() {
            for term in antecedent.iter().chain(std::iter::once(&prediction.label)) {
                check_term(term)?;
            }
            write!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                antecedent.join(ITEM_SEPARATOR),
                prediction.label,
                prediction.support,
                prediction.confidence,
                prediction.lift
            )?;
            if let Some(labeler) = labeler {
                let labels: Vec<String> = antecedent
                    .iter()
                    .map(|term| audit_label(labeler, term))
                    .collect();
                write!(
                    writer,
                    "\t{}\t{}",
                    labels.join(" | "),
                    audit_label(labeler, &prediction.label)
                )?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Parse the uncompressed text form.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate().map(|(i, line)| (i + 1, line));

        let (_, version) = lines
            .next()
            .ok_or_else(|| RulesError::format(1, "missing version line"))?;
        let version = version?;
        let version = version.trim();
        if version != RULE_MODEL_VERSION_V1 {
            if version.starts_with(RULE_MODEL_VERSION_PREFIX) {
                return Err(RulesError::UnsupportedVersion {
                    found: version.to_string(),
                });
            }
            return Err(RulesError::format(
                1,
                format!("expected {RULE_MODEL_VERSION_V1:?}, found {version:?}"),
            ));
        }

        let mut min_support: Option<u32> = None;
        let mut max_size: Option<usize> = None;
        let mut last_line = 1usize;
        let mut model = loop {
            if let (Some(min_support), Some(max_size)) = (min_support, max_size) {
                break RuleModel::new(min_support, max_size);
            }
            let Some((line_no, line)) = lines.next() else {
                return Err(RulesError::format(
                    last_line,
                    "missing min_support/max_size header lines",
                ));
            };
            last_line = line_no;
            let line = line?;
            if is_skippable(&line) {
                continue;
            }
            let (key, value) = line
                .split_once('\t')
                .ok_or_else(|| RulesError::format(line_no, "expected `key<TAB>value`"))?;
            match key.trim() {
                KEY_MIN_SUPPORT => {
                    min_support = Some(parse_field(line_no, KEY_MIN_SUPPORT, value)?)
                }
                KEY_MAX_SIZE => max_size = Some(parse_field(line_no, KEY_MAX_SIZE, value)?),
                other => {
                    return Err(RulesError::format(
                        line_no,
                        format!("unknown header key {other:?}"),
                    ))
                }
            }
        };

        for (line_no, line) in lines {
            let line = line?;
            if is_skippable(&line) {
                continue;
            }
            let (antecedent, prediction) =
                parse_rule_row(line_no, line.trim_end_matches(&['\r', '\n'][..]))?;
            model.insert(&antecedent, prediction);
        }
        Ok(model)
    }
}

fn is_skippable(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

fn parse_rule_row(line_no: usize, line: &str) -> Result<(Vec<String>, RulePrediction)> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < 5 {
        return Err(RulesError::format(
            line_no,
            format!("expected at least 5 tab-separated columns, found {}", columns.len()),
        ));
    }

    let antecedent: Vec<String> = columns[0]
        .split(ITEM_SEPARATOR)
        .map(|item| item.trim().to_string())
        .collect();
    if antecedent.iter().any(String::is_empty) {
        return Err(RulesError::format(line_no, "empty antecedent item"));
    }
    if !antecedent.windows(2).all(|w| w[0] < w[1]) {
        return Err(RulesError::format(
            line_no,
            "antecedent items must be sorted and unique",
        ));
    }

    let label = columns[1].trim();
    if label.is_empty() {
        return Err(RulesError::format(line_no, "empty consequent"));
    }
    if label.contains(ITEM_SEPARATOR) {
        return Err(RulesError::format(line_no, "consequent must be a single term"));
    }

    let support: u32 = parse_field(line_no, "support", columns[2])?;
    let confidence: f64 = parse_field(line_no, "confidence", columns[3])?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(RulesError::format(
            line_no,
            format!("confidence {confidence} outside [0, 1]"),
        ));
    }
    let lift: f64 = parse_field(line_no, "lift", columns[4])?;
    if !lift.is_finite() || lift < 0.0 {
        return Err(RulesError::format(line_no, format!("invalid lift {lift}")));
    }

    Ok((
        antecedent,
        RulePrediction {
            label: label.to_string(),
            confidence,
            lift,
            support,
        },
    ))
}

fn parse_field<T>(line_no: usize, name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| RulesError::format(line_no, format!("invalid {name} {raw:?}: {e}")))
}

fn check_term(term: &str) -> Result<()> {
    let reason = if term.is_empty() {
        "empty term"
    } else if term.contains(ITEM_SEPARATOR) {
        "contains the `::` item separator"
    } else if term.contains(&['\t', '\n', '\r'][..]) {
        "contains a tab or line break"
    } else if term.starts_with('#') {
        "starts with the comment marker `#`"
    } else if term.trim() != term {
        "has leading or trailing whitespace"
    } else if term.starts_with(':') || term.ends_with(':') {
        "starts or ends with `:`, which would merge into the `::` separator"
    } else {
        return Ok(());
    };
    Err(RulesError::InvalidTerm {
        term: term.to_string(),
        reason,
    })
}

fn audit_label(labeler: &dyn Fn(&str) -> Option<String>, term: &str) -> String {
    labeler(term)
        .unwrap_or_default()
        .replace(&['\t', '\n', '\r'][..], " ")
}
