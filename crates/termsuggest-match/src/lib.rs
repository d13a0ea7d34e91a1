//! termsuggest-match: dictionary matching of ontology term literals in free text.
//!
//! A [`DoubleArrayAhoCorasick`] is built once from `literal -> value` pairs
//! (literals already normalized by the caller) and then scanned any number of
//! times, concurrently, without locks:
//!
//! ```
//! use termsuggest_match::DoubleArrayAhoCorasick;
//!
//! let automaton = DoubleArrayAhoCorasick::build([("CHO", "CLO:0000031"), ("CHO cell", "CLO:0000032")]);
//! let found: Vec<&str> = automaton.scan("CHO cell line").iter().map(|h| *h.value).collect();
//! assert_eq!(found, vec!["CLO:0000031", "CLO:0000032"]);
//! ```
//!
//! ## Module Organization
//!
//! - `alphabet`: compact character codes
//! - `builder`: temporary trie and the double-array packer
//! - `automaton`: the immutable matcher and its scan API

mod alphabet;
mod builder;

pub mod automaton;

pub use automaton::{DoubleArrayAhoCorasick, Hit};
