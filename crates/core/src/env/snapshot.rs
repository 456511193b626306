use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local};
use serde::Deserialize;
use url::Url;

use crate::error::EnvError;

use super::traits::{ElementInfo, Environment, Location, StorageScope};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ElementSnapshot {
    pub selector: String,
    #[serde(flatten)]
    pub info: ElementInfo,
}

/// A frozen page state. Unset fields report [`EnvError::Unavailable`].
///
/// Selectors are matched literally against the recorded `elements`; there is
/// no CSS engine behind it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EnvironmentSnapshot {
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub screen_width: Option<u32>,
    pub viewport_width: Option<u32>,
    pub cookie: Option<String>,
    pub now: Option<DateTime<FixedOffset>>,
    pub local_storage: HashMap<String, String>,
    pub session_storage: HashMap<String, String>,
    pub elements: Vec<ElementSnapshot>,
}

impl EnvironmentSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_widths(mut self, screen: u32, viewport: u32) -> Self {
        self.screen_width = Some(screen);
        self.viewport_width = Some(viewport);
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn at(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_storage(
        mut self,
        scope: StorageScope,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let store = match scope {
            StorageScope::Local => &mut self.local_storage,
            StorageScope::Session => &mut self.session_storage,
        };
        store.insert(key.into(), value.into());
        self
    }

    pub fn with_element(
        mut self,
        selector: impl Into<String>,
        classes: &[&str],
        text: impl Into<String>,
    ) -> Self {
        self.elements.push(ElementSnapshot {
            selector: selector.into(),
            info: ElementInfo {
                classes: classes.iter().map(|c| c.to_string()).collect(),
                text: text.into(),
            },
        });
        self
    }

    fn matching<'a>(&'a self, selector: &'a str) -> impl Iterator<Item = &'a ElementSnapshot> {
        self.elements.iter().filter(move |e| e.selector == selector)
    }
}

impl Environment for EnvironmentSnapshot {
    fn location(&self) -> Result<Location, EnvError> {
        let raw = self.url.as_deref().ok_or(EnvError::Unavailable("location"))?;
        let url = Url::parse(raw).map_err(|e| EnvError::Malformed(format!("{raw}: {e}")))?;

        let search = match url.query() {
            Some(q) if !q.is_empty() => format!("?{q}"),
            _ => String::new(),
        };
        let hash = match url.fragment() {
            Some(f) if !f.is_empty() => format!("#{f}"),
            _ => String::new(),
        };

        Ok(Location {
            href: url.as_str().to_string(),
            pathname: url.path().to_string(),
            search,
            hash,
        })
    }

    fn query_count(&self, selector: &str) -> Result<usize, EnvError> {
        Ok(self.matching(selector).count())
    }

    fn query_first(&self, selector: &str) -> Result<Option<ElementInfo>, EnvError> {
        Ok(self.matching(selector).next().map(|e| e.info.clone()))
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.now.unwrap_or_else(|| Local::now().fixed_offset())
    }

    fn user_agent(&self) -> Result<String, EnvError> {
        self.user_agent
            .clone()
            .ok_or(EnvError::Unavailable("user agent"))
    }

    fn screen_width(&self) -> Result<u32, EnvError> {
        self.screen_width.ok_or(EnvError::Unavailable("screen"))
    }

    fn viewport_width(&self) -> Result<u32, EnvError> {
        self.viewport_width.ok_or(EnvError::Unavailable("viewport"))
    }

    fn storage(&self, scope: StorageScope, key: &str) -> Result<Option<String>, EnvError> {
        let store = match scope {
            StorageScope::Local => &self.local_storage,
            StorageScope::Session => &self.session_storage,
        };
        Ok(store.get(key).cloned())
    }

    fn cookies(&self) -> Result<String, EnvError> {
        Ok(self.cookie.clone().unwrap_or_default())
    }
}
