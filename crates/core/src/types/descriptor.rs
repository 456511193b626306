use serde::Deserialize;

use crate::condition::Condition;

use super::primitives::{DomId, Locator, ResourceKind};

/// Registration input, as written by the embedding page or a manifest.
///
/// Loosely shaped on purpose: [`crate::validation::validate_resource`] turns it
/// into a [`ResourceDescriptor`] or rejects it.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResourceSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default, rename = "type")]
    pub kind: ResourceKind,
    #[serde(default, alias = "locator")]
    pub url: Option<String>,
    #[serde(default, alias = "source")]
    pub code: Option<String>,
    #[serde(default, alias = "dom_id")]
    pub id: Option<String>,
}

impl ResourceSpec {
    pub fn script(url: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Script,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn style(url: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Style,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn inline(code: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Inline,
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Script {
        locator: Locator,
        dom_id: Option<DomId>,
    },
    Style {
        locator: Locator,
        dom_id: Option<DomId>,
    },
    InlineCode {
        source: String,
    },
}

impl Payload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Script { .. } => ResourceKind::Script,
            Self::Style { .. } => ResourceKind::Style,
            Self::InlineCode { .. } => ResourceKind::Inline,
        }
    }

    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Self::Script { locator, .. } | Self::Style { locator, .. } => Some(locator),
            Self::InlineCode { .. } => None,
        }
    }
}

/// A validated resource. Immutable once registered.
#[derive(Clone, Debug)]
pub struct ResourceDescriptor {
    pub identity: Option<String>,
    pub condition: Condition,
    pub payload: Payload,
}

impl ResourceDescriptor {
    /// Name used in reports: the identity, else the locator, else `inline`.
    pub fn label(&self) -> &str {
        self.identity
            .as_deref()
            .or_else(|| self.payload.locator().map(Locator::as_str))
            .unwrap_or("inline")
    }
}
