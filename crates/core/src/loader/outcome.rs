use crate::{error::LoadFailure, types::primitives::ResourceKind};

/// Proof of a completed load. `key` is the locator, or `inline:<n>` for
/// inline code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReceipt {
    pub kind: ResourceKind,
    pub key: String,
}

pub type LoadResult = Result<LoadReceipt, LoadFailure>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed(LoadFailure),
}
