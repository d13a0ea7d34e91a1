//! Error type shared by the rule-learning and rule-model layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error on line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("unsupported rule model version: {found:?}")]
    UnsupportedVersion { found: String },

    #[error("term {term:?} cannot be serialized: {reason}")]
    InvalidTerm { term: String, reason: &'static str },

    #[error("invalid learner configuration: {0}")]
    InvalidConfig(String),
}

impl RulesError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RulesError>;
