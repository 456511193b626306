use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use serde::Deserialize;

use crate::{
    error::EnvError,
    types::primitives::{DomId, Locator},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ElementInfo {
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageScope {
    Local,
    Session,
}

/// Read-only view of the page the condition evaluator tests against.
///
/// Every accessor defaults to [`EnvError::Unavailable`], which the evaluator
/// treats as a non-match.
#[allow(unused_variables)]
pub trait Environment: Send + Sync {
    fn location(&self) -> Result<Location, EnvError> {
        Err(EnvError::Unavailable("location"))
    }

    fn query_count(&self, selector: &str) -> Result<usize, EnvError> {
        Err(EnvError::Unavailable("document"))
    }

    fn query_first(&self, selector: &str) -> Result<Option<ElementInfo>, EnvError> {
        Err(EnvError::Unavailable("document"))
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn user_agent(&self) -> Result<String, EnvError> {
        Err(EnvError::Unavailable("user agent"))
    }

    fn screen_width(&self) -> Result<u32, EnvError> {
        Err(EnvError::Unavailable("screen"))
    }

    fn viewport_width(&self) -> Result<u32, EnvError> {
        Err(EnvError::Unavailable("viewport"))
    }

    fn storage(&self, scope: StorageScope, key: &str) -> Result<Option<String>, EnvError> {
        Err(EnvError::Unavailable("storage"))
    }

    fn cookies(&self) -> Result<String, EnvError> {
        Err(EnvError::Unavailable("cookies"))
    }
}

/// Element insertion points used by the loader.
///
/// Each call resolves once the host reports the load or error event for the
/// inserted element.
#[async_trait]
pub trait Document: Send + Sync {
    async fn inject_script(&self, locator: &Locator, dom_id: Option<&DomId>)
    -> Result<(), EnvError>;

    async fn inject_style(&self, locator: &Locator, dom_id: Option<&DomId>)
    -> Result<(), EnvError>;
}
