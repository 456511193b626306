use thiserror::Error;

use crate::types::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDescriptor {
    #[error("resource has no condition")]
    MissingCondition,

    #[error("resource has neither a url nor inline code")]
    MissingPayload,

    #[error("resource has both a url and inline code")]
    AmbiguousPayload,

    #[error("style resources need a url")]
    StyleRequiresLocator,

    #[error("inline resources need source code, not a url")]
    InlineRequiresSource,

    #[error("malformed resource: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("unknown condition kind `{0}`")]
    UnknownKind(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] serde_json::Error),

    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("predicate failed: {0}")]
    Predicate(String),

    #[error("predicate panicked")]
    Panicked,

    #[error(transparent)]
    Environment(#[from] EnvError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("environment capability `{0}` is unavailable")]
    Unavailable(&'static str),

    #[error("environment refused the operation: {0}")]
    Refused(String),

    #[error("malformed environment value: {0}")]
    Malformed(String),

    #[error("resource reported an error event")]
    ErrorEvent,
}

/// Terminal failure of a load. Cached per locator, so it is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {kind} `{key}`: {source}")]
pub struct LoadFailure {
    pub kind: ResourceKind,
    pub key: String,
    pub source: EnvError,
}

impl LoadFailure {
    pub fn new(kind: ResourceKind, key: impl Into<String>, source: EnvError) -> Self {
        Self {
            kind,
            key: key.into(),
            source,
        }
    }
}
