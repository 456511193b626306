//! Capabilities that run caller-supplied code.
//!
//! A [`CustomPredicate`] runs an arbitrary callback while a condition is
//! evaluated and a [`CodeExecutor`] runs arbitrary source text for inline
//! resources. Neither is sandboxed. The evaluator's fail-closed handling of
//! errors and panics is the only safety net: a callback that misbehaves
//! produces a non-match, nothing more.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::error::{ConditionError, EnvError};

type Callback = dyn Fn() -> Result<bool, ConditionError> + Send + Sync;

/// Zero-argument callback used as a condition leaf.
#[derive(Clone)]
pub struct CustomPredicate {
    label: String,
    callback: Arc<Callback>,
}

impl CustomPredicate {
    pub fn new<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> Result<bool, ConditionError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }

    /// Wraps an infallible callback.
    pub fn from_fn<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::new(label, move || Ok(callback()))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn call(&self) -> Result<bool, ConditionError> {
        (self.callback)()
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Runs inline source in the page's global scope.
///
/// Success means execution was triggered. Errors raised inside the executed
/// code are not observable here; only a refusal of the host is.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, source: &str) -> Result<(), EnvError>;
}
