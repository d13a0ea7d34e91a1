//! ModelRegistry: an explicit owner for a shared, lazily loaded rule model.
//!
//! Callers construct one registry (usually per process) and pass it to the
//! code that needs predictions. A read-write lock guards the slot:
//!
//! - `current` and `predict` take the shared read lock just long enough to
//!   clone the `Arc`, so readers never queue behind each other;
//! - `get_or_load` returns from the read path once a model is installed and
//!   otherwise re-checks and loads under the write lock, so concurrent first
//!   callers trigger exactly one load and the first successful load wins;
//! - `reload` parses the new file completely before swapping it in, so a bad
//!   file leaves the current model untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::model::{RuleModel, RulePrediction};

#[derive(Debug)]
pub struct ModelRegistry {
    path: PathBuf,
    slot: RwLock<Option<Arc<RuleModel>>>,
}

impl ModelRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: RwLock::new(None),
        }
    }

    /// A registry that starts with `model` already installed.
    pub fn with_model(path: impl Into<PathBuf>, model: RuleModel) -> Self {
        Self {
            path: path.into(),
            slot: RwLock::new(Some(Arc::new(model))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The installed model, if any. Never triggers a load.
    pub fn current(&self) -> Option<Arc<RuleModel>> {
        self.slot.read().clone()
    }

    /// Return the installed model, loading it from `path` on first use.
    ///
    /// A failed load leaves the registry empty and is reported to the caller;
    /// there is no retry.
    pub fn get_or_load(&self) -> Result<Arc<RuleModel>> {
        if let Some(model) = self.current() {
            return Ok(model);
        }
        let mut slot = self.slot.write();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(RuleModel::load(&self.path)?);
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Load `path` again and replace the installed model on success.
    pub fn reload(&self) -> Result<Arc<RuleModel>> {
        let model = Arc::new(RuleModel::load(&self.path)?);
        self.slot.write().replace(Arc::clone(&model));
        Ok(model)
    }

    /// Install a model built elsewhere, returning the previous one.
    pub fn install(&self, model: RuleModel) -> Option<Arc<RuleModel>> {
        self.slot.write().replace(Arc::new(model))
    }

    /// Drop the installed model. Holders of an `Arc` keep theirs.
    pub fn teardown(&self) -> Option<Arc<RuleModel>> {
        let previous = self.slot.write().take();
        if previous.is_some() {
            tracing::debug!(path = %self.path.display(), "rule model released");
        }
        previous
    }

    /// Predict with the installed model; empty when none is installed.
    pub fn predict<I, S>(&self, known: I) -> Vec<RulePrediction>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self.current() {
            Some(model) => model.predict(known),
            None => Vec::new(),
        }
    }
}
