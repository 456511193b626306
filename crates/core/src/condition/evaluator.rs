use std::{
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use serde_json::Value;

use crate::{diagnostics::Diagnostics, env::Environment, error::ConditionError};

use super::{
    builtin,
    types::{Condition, Leaf, Operator},
};

pub type PredicateFn =
    dyn Fn(&Value, &dyn Environment) -> Result<bool, ConditionError> + Send + Sync;

/// Evaluates [`Condition`] trees against an [`Environment`].
///
/// Evaluation never fails: any error or panic inside a leaf is reported as a
/// diagnostic and the leaf counts as `false`.
#[derive(Clone)]
pub struct ConditionEvaluator {
    predicates: HashMap<String, Arc<PredicateFn>>,
    diagnostics: Diagnostics,
}

impl ConditionEvaluator {
    pub fn new(diagnostics: Diagnostics) -> Self {
        let mut evaluator = Self {
            predicates: HashMap::new(),
            diagnostics,
        };
        builtin::install(&mut evaluator);
        evaluator
    }

    /// Adds a predicate kind, replacing any existing one with the same name.
    pub fn register<F>(&mut self, kind: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &dyn Environment) -> Result<bool, ConditionError> + Send + Sync + 'static,
    {
        self.predicates.insert(kind.into(), Arc::new(predicate));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.predicates.contains_key(kind)
    }

    pub fn evaluate(&self, condition: &Condition, env: &dyn Environment) -> bool {
        match condition {
            Condition::Leaf(leaf) => match self.evaluate_leaf(leaf, env) {
                Ok(matched) => matched,
                Err(error) => self.fail_closed(&leaf.kind, &error),
            },
            Condition::Composite { operator, children } => {
                self.evaluate_composite(*operator, children, env)
            }
            Condition::Custom(predicate) => {
                match guard(|| predicate.call()) {
                    Ok(matched) => matched,
                    Err(error) => self.fail_closed(predicate.label(), &error),
                }
            }
        }
    }

    fn evaluate_composite(
        &self,
        operator: Operator,
        children: &[Condition],
        env: &dyn Environment,
    ) -> bool {
        // Empty composites never match, whatever the operator.
        if children.is_empty() {
            return false;
        }

        match operator {
            Operator::And => children.iter().all(|child| self.evaluate(child, env)),
            Operator::Or => children.iter().any(|child| self.evaluate(child, env)),
        }
    }

    fn evaluate_leaf(&self, leaf: &Leaf, env: &dyn Environment) -> Result<bool, ConditionError> {
        let predicate = self
            .predicates
            .get(&leaf.kind)
            .ok_or_else(|| ConditionError::UnknownKind(leaf.kind.clone()))?;

        guard(|| predicate(&leaf.value, env))
    }

    fn fail_closed(&self, kind: &str, error: &ConditionError) -> bool {
        if self.diagnostics.is_enabled() {
            tracing::warn!(kind, %error, "condition evaluation failed, treating as false");
        }
        false
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(Diagnostics::default())
    }
}

impl fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ConditionEvaluator")
            .field("kinds", &kinds)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

fn guard<F>(f: F) -> Result<bool, ConditionError>
where
    F: FnOnce() -> Result<bool, ConditionError>,
{
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(Err(ConditionError::Panicked))
}
