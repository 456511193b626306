use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};

use futures::future::{BoxFuture, Shared};

use crate::{error::LoadFailure, types::primitives::Locator};

use super::outcome::LoadStatus;

pub(crate) type SharedLoad = Shared<BoxFuture<'static, Result<(), LoadFailure>>>;

/// Locator-keyed memo of load attempts.
///
/// Entries are written once, on the first request for a locator, and never
/// replaced; that includes failures. Share one cache between loaders with
/// `Arc` to deduplicate across them.
#[derive(Default)]
pub struct LoadCache {
    entries: Mutex<HashMap<Locator, SharedLoad>>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing handle for `locator`, or stores the one built by
    /// `start`. Lookup and insert happen under one lock.
    pub(crate) fn get_or_insert_with<F>(&self, locator: &Locator, start: F) -> SharedLoad
    where
        F: FnOnce() -> SharedLoad,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(locator.clone()).or_insert_with(start).clone()
    }

    pub fn status(&self, locator: &Locator) -> Option<LoadStatus> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = entries.get(locator)?;
        Some(match handle.peek() {
            None => LoadStatus::Pending,
            Some(Ok(())) => LoadStatus::Loaded,
            Some(Err(failure)) => LoadStatus::Failed(failure.clone()),
        })
    }

    pub fn contains(&self, locator: &Locator) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(locator)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LoadCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCache")
            .field("entries", &self.len())
            .finish()
    }
}
