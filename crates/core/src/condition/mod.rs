mod builtin;
pub mod evaluator;
pub mod types;

pub use evaluator::{ConditionEvaluator, PredicateFn};
pub use types::{Condition, Leaf, Operator};
