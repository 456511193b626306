use std::{
    collections::HashSet,
    future::poll_fn,
    sync::{Mutex, PoisonError},
    task::Poll,
};

use async_trait::async_trait;

use crate::{
    error::EnvError,
    extension::CodeExecutor,
    types::primitives::{DomId, Locator, ResourceKind},
};

use super::traits::Document;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Injection {
    pub kind: ResourceKind,
    pub locator: Locator,
    pub dom_id: Option<DomId>,
}

/// A document that records every injection instead of touching a page.
///
/// Locators listed as unreachable resolve with an error event; everything
/// else loads after one cooperative yield.
#[derive(Debug, Default)]
pub struct RecordingDocument {
    unreachable: HashSet<String>,
    refuse_code: bool,
    injections: Mutex<Vec<Injection>>,
    executed: Mutex<Vec<String>>,
}

impl RecordingDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable<I, S>(mut self, locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unreachable.extend(locators.into_iter().map(Into::into));
        self
    }

    pub fn refusing_code(mut self) -> Self {
        self.refuse_code = true;
        self
    }

    pub fn injections(&self) -> Vec<Injection> {
        self.injections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn injection_count(&self, locator: &str) -> usize {
        self.injections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|i| i.locator.as_str() == locator)
            .count()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn inject(
        &self,
        kind: ResourceKind,
        locator: &Locator,
        dom_id: Option<&DomId>,
    ) -> Result<(), EnvError> {
        self.injections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Injection {
                kind,
                locator: locator.clone(),
                dom_id: dom_id.cloned(),
            });

        yield_once().await;

        if self.unreachable.contains(locator.as_str()) {
            Err(EnvError::ErrorEvent)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Document for RecordingDocument {
    async fn inject_script(
        &self,
        locator: &Locator,
        dom_id: Option<&DomId>,
    ) -> Result<(), EnvError> {
        self.inject(ResourceKind::Script, locator, dom_id).await
    }

    async fn inject_style(
        &self,
        locator: &Locator,
        dom_id: Option<&DomId>,
    ) -> Result<(), EnvError> {
        self.inject(ResourceKind::Style, locator, dom_id).await
    }
}

#[async_trait]
impl CodeExecutor for RecordingDocument {
    async fn execute(&self, source: &str) -> Result<(), EnvError> {
        if self.refuse_code {
            return Err(EnvError::Refused("inline code is disabled".into()));
        }
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source.to_string());
        Ok(())
    }
}

/// Suspends once so concurrent loads interleave.
async fn yield_once() {
    let mut yielded = false;
    poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}
