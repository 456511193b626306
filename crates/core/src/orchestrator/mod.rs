pub mod core;
pub mod result;

pub use self::core::Orchestrator;
pub use result::{PlanEntry, Rejected, ResourceOutcome, ResourceReport, RunReport};
