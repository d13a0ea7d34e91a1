//! Learner configuration.
//!
//! Loaded from JSON by callers (the CLI accepts `--config learn.json`); every
//! field is optional in the file and falls back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RulesError};

pub const DEFAULT_MIN_SUPPORT: u32 = 3;
pub const DEFAULT_MAX_SIZE: usize = 5;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Minimum number of transactions an itemset must occur in.
    pub min_support: u32,
    /// Largest itemset size grown by the learner.
    pub max_size: usize,
    /// Rules below this confidence are discarded.
    pub min_confidence: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            max_size: DEFAULT_MAX_SIZE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl LearnerConfig {
    pub fn new(min_support: u32, max_size: usize, min_confidence: f64) -> Self {
        Self {
            min_support,
            max_size,
            min_confidence,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: LearnerConfig = serde_json::from_str(text)
            .map_err(|e| RulesError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_support == 0 {
            return Err(RulesError::InvalidConfig(
                "min_support must be at least 1".to_string(),
            ));
        }
        if self.max_size == 0 {
            return Err(RulesError::InvalidConfig(
                "max_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(RulesError::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = LearnerConfig::from_json_str(r#"{ "min_support": 7 }"#).unwrap();
        assert_eq!(config.min_support, 7);
        assert_eq!(config.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.min_confidence, DEFAULT_MIN_CONFIDENCE);
    }

    #[test]
    fn rejects_zero_support_and_out_of_range_confidence() {
        assert!(LearnerConfig::new(0, 3, 0.5).validate().is_err());
        assert!(LearnerConfig::new(1, 0, 0.5).validate().is_err());
        assert!(LearnerConfig::new(1, 3, 1.5).validate().is_err());
        assert!(LearnerConfig::from_json_str(r#"{ "min_confidence": -0.1 }"#).is_err());
        assert!(LearnerConfig::default().validate().is_ok());
    }
}
