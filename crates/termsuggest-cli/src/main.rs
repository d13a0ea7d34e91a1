//! termsuggest CLI
//!
//! - `learn`: mine association rules from a transaction corpus into a model file
//! - `predict`: suggest terms that usually accompany the given ones
//! - `scan`: find dictionary literals in text (and optionally predict from them)
//! - `inspect`: summarize a model file

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use termsuggest_match::DoubleArrayAhoCorasick;
use termsuggest_rules::{LearnerConfig, ModelSummary, RuleModel, RulePrediction};

mod input;

#[derive(Parser)]
#[command(name = "termsuggest")]
#[command(author, version, about = "Ontology term suggestion: dictionary scanning and association rules")]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a rule model from a corpus (one transaction per line).
    Learn {
        /// Corpus file: JSON arrays or whitespace-separated terms, one line per record
        #[arg(long)]
        corpus: PathBuf,
        /// Output model file (gzip)
        #[arg(short, long)]
        out: PathBuf,
        /// Learner configuration JSON; flags below override its fields
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        min_support: Option<u32>,
        #[arg(long)]
        max_size: Option<usize>,
        #[arg(long)]
        min_confidence: Option<f64>,
        /// Dictionary TSV used to write human-readable label columns
        #[arg(long)]
        labels: Option<PathBuf>,
    },

    /// Predict terms from known terms.
    Predict {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
        /// Known terms
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Scan text for dictionary literals.
    Scan {
        /// Dictionary TSV (`literal<TAB>term`)
        #[arg(short, long)]
        dictionary: PathBuf,
        /// Also suggest terms from the scanned ones
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
        /// Text to scan (stdin when absent)
        text: Option<String>,
    },

    /// Summarize a model.
    Inspect {
        #[arg(short, long)]
        model: PathBuf,
        /// Show the N most confident rules
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Learn {
            corpus,
            out,
            config,
            min_support,
            max_size,
            min_confidence,
            labels,
        } => {
            let mut learner_config = match &config {
                Some(path) => {
                    let text = fs::read_to_string(path)
                        .with_context(|| format!("failed to read config: {}", path.display()))?;
                    LearnerConfig::from_json_str(&text)?
                }
                None => LearnerConfig::default(),
            };
            if let Some(v) = min_support {
                learner_config.min_support = v;
            }
            if let Some(v) = max_size {
                learner_config.max_size = v;
            }
            if let Some(v) = min_confidence {
                learner_config.min_confidence = v;
            }
            cmd_learn(&corpus, &out, &learner_config, labels.as_deref())?;
        }
        Commands::Predict {
            model,
            limit,
            json,
            terms,
        } => cmd_predict(&model, &terms, limit, json)?,
        Commands::Scan {
            dictionary,
            model,
            limit,
            json,
            text,
        } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read text from stdin")?;
                    buf
                }
            };
            cmd_scan(&dictionary, model.as_deref(), &text, limit, json)?;
        }
        Commands::Inspect { model, top, json } => cmd_inspect(&model, top, json)?,
    }
    Ok(())
}

fn cmd_learn(corpus: &Path, out: &Path, config: &LearnerConfig, labels: Option<&Path>) -> Result<()> {
    config.validate()?;
    let transactions = input::read_corpus(corpus)?;
    eprintln!(
        "{} {} ({} transactions)",
        "Learning".green().bold(),
        corpus.display(),
        transactions.len()
    );

    let model = RuleModel::learn(&transactions, config)?;
    match labels {
        Some(path) => {
            let labels = input::term_labels(&input::read_dictionary(path)?);
            model.save_with_labels(out, |term| labels.get(term).cloned())?;
        }
        None => model.save(out)?,
    }
    eprintln!(
        "{} {} ({} rules)",
        "wrote".green().bold(),
        out.display().to_string().bold(),
        model.rule_count()
    );
    Ok(())
}

fn load_model(path: &Path) -> Result<RuleModel> {
    RuleModel::load(path).with_context(|| format!("failed to load model: {}", path.display()))
}

fn print_predictions(predictions: &[RulePrediction]) {
    if predictions.is_empty() {
        println!("{}", "no suggestions".yellow());
        return;
    }
    for p in predictions {
        println!(
            "{:<24} confidence {:.3}  lift {:.4}  support {}",
            p.label.bold(),
            p.confidence,
            p.lift,
            p.support
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_predict(model: &Path, terms: &[String], limit: usize, json: bool) -> Result<()> {
    let model = load_model(model)?;
    let suggestions = model.suggest(terms, limit);
    if json {
        return print_json(&suggestions);
    }
    print_predictions(&suggestions);
    Ok(())
}

#[derive(Serialize)]
struct ScanHit<'a> {
    begin: usize,
    end: usize,
    literal: &'a str,
    term: &'a str,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    hits: Vec<ScanHit<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<Vec<RulePrediction>>,
}

fn cmd_scan(dictionary: &Path, model: Option<&Path>, text: &str, limit: usize, json: bool) -> Result<()> {
    let rows = input::read_dictionary(dictionary)?;
    let automaton = DoubleArrayAhoCorasick::build(rows);
    tracing::info!(
        entries = automaton.len(),
        states = automaton.state_count(),
        "dictionary automaton ready"
    );

    let hits: Vec<ScanHit<'_>> = automaton
        .scan(text)
        .into_iter()
        .map(|hit| ScanHit {
            begin: hit.begin,
            end: hit.end,
            literal: &text[hit.begin..hit.end],
            term: hit.value.as_str(),
        })
        .collect();

    let suggestions = match model {
        Some(path) => {
            let known: BTreeSet<&str> = hits.iter().map(|h| h.term).collect();
            Some(load_model(path)?.suggest(known, limit))
        }
        None => None,
    };

    if json {
        return print_json(&ScanReport { hits, suggestions });
    }

    for hit in &hits {
        println!(
            "{:>6}..{:<6} {:<32} {}",
            hit.begin,
            hit.end,
            hit.literal,
            hit.term.cyan()
        );
    }
    if hits.is_empty() {
        println!("{}", "no dictionary terms found".yellow());
    }
    if let Some(suggestions) = suggestions {
        println!("{}", "suggestions".green().bold());
        print_predictions(&suggestions);
    }
    Ok(())
}

#[derive(Serialize)]
struct RuleRow {
    antecedent: Vec<String>,
    prediction: RulePrediction,
}

fn cmd_inspect(model: &Path, top: usize, json: bool) -> Result<()> {
    let model = load_model(model)?;
    let summary = model.summary();

    let mut rows: Vec<RuleRow> = model
        .rules()
        .map(|(antecedent, prediction)| RuleRow {
            antecedent,
            prediction: prediction.clone(),
        })
        .collect();
    rows.sort_by(|a, b| b.prediction.confidence.total_cmp(&a.prediction.confidence));
    rows.truncate(top);

    if json {
        let mut report = BTreeMap::new();
        report.insert("summary", serde_json::to_value(&summary)?);
        report.insert("top_rules", serde_json::to_value(&rows)?);
        return print_json(&report);
    }

    println!("{} {}", "model".green().bold(), summary_line(&summary));
    for row in &rows {
        println!(
            "{} -> {}  confidence {:.3}  lift {:.4}  support {}",
            row.antecedent.join(" + "),
            row.prediction.label.bold(),
            row.prediction.confidence,
            row.prediction.lift,
            row.prediction.support
        );
    }
    Ok(())
}

fn summary_line(summary: &ModelSummary) -> String {
    format!(
        "rules={} min_support={} max_size={} index_nodes={} antecedent_roots={}",
        summary.rules,
        summary.min_support,
        summary.max_size,
        summary.index_nodes,
        summary.antecedent_roots
    )
}
