use crate::{
    error::{InvalidDescriptor, LoadFailure},
    loader::LoadReceipt,
    types::primitives::ResourceKind,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceOutcome {
    Loaded(LoadReceipt),
    Failed(LoadFailure),
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceReport {
    pub identity: Option<String>,
    /// Identity, else locator, else `inline`.
    pub label: String,
    pub kind: ResourceKind,
    pub matched: bool,
    pub outcome: ResourceOutcome,
}

/// Result of one orchestration pass, in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub resources: Vec<ResourceReport>,
}

impl RunReport {
    pub fn loaded(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Loaded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Skipped))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ResourceReport, &LoadFailure)> {
        self.resources.iter().filter_map(|r| match &r.outcome {
            ResourceOutcome::Failed(failure) => Some((r, failure)),
            _ => None,
        })
    }

    pub fn get(&self, label: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.label == label)
    }

    fn count(&self, predicate: impl Fn(&ResourceOutcome) -> bool) -> usize {
        self.resources.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanEntry {
    pub label: String,
    pub kind: ResourceKind,
    pub matched: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejected {
    pub name: Option<String>,
    pub reason: InvalidDescriptor,
}
