pub mod condition;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod extension;
pub mod loader;
pub mod orchestrator;
pub mod types;
pub mod validation;

pub use condition::{Condition, ConditionEvaluator, Leaf, Operator, PredicateFn};
pub use diagnostics::Diagnostics;
pub use env::{
    Document, ElementInfo, ElementSnapshot, Environment, EnvironmentSnapshot, Injection, Location,
    RecordingDocument, StorageScope,
};
pub use error::*;
pub use extension::{CodeExecutor, CustomPredicate};
pub use loader::{LoadCache, LoadReceipt, LoadResult, LoadStatus, ResourceLoader};
pub use orchestrator::{
    Orchestrator, PlanEntry, Rejected, ResourceOutcome, ResourceReport, RunReport,
};
pub use types::*;
pub use validation::validate_resource;
