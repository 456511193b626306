use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use futures::FutureExt;

use crate::{
    diagnostics::Diagnostics,
    env::Document,
    error::{EnvError, LoadFailure},
    extension::CodeExecutor,
    types::{
        descriptor::Payload,
        primitives::{DomId, Locator, ResourceKind},
    },
};

use super::{
    LoadCache, LoadReceipt, LoadResult, LoadStatus,
    cache::SharedLoad,
};

pub struct ResourceLoader {
    document: Arc<dyn Document>,
    executor: Option<Arc<dyn CodeExecutor>>,
    cache: Arc<LoadCache>,
    inline_seq: AtomicU64,
    diagnostics: Diagnostics,
}

impl ResourceLoader {
    pub fn new(document: Arc<dyn Document>) -> Self {
        Self {
            document,
            executor: None,
            cache: Arc::new(LoadCache::new()),
            inline_seq: AtomicU64::new(0),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<LoadCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Enables inline code. Without an executor every inline load fails.
    pub fn with_executor(mut self, executor: Arc<dyn CodeExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn cache(&self) -> &Arc<LoadCache> {
        &self.cache
    }

    pub fn status(&self, locator: &Locator) -> Option<LoadStatus> {
        self.cache.status(locator)
    }

    pub async fn load(&self, payload: &Payload) -> LoadResult {
        match payload {
            Payload::Script { locator, dom_id } => self.load_script(locator, dom_id.as_ref()).await,
            Payload::Style { locator, dom_id } => self.load_style(locator, dom_id.as_ref()).await,
            Payload::InlineCode { source } => self.execute_inline(source).await,
        }
    }

    pub async fn load_script(&self, locator: &Locator, dom_id: Option<&DomId>) -> LoadResult {
        self.load_external(ResourceKind::Script, locator, dom_id)
            .await
    }

    pub async fn load_style(&self, locator: &Locator, dom_id: Option<&DomId>) -> LoadResult {
        self.load_external(ResourceKind::Style, locator, dom_id)
            .await
    }

    /// Runs `source` on every call; inline code is never deduplicated.
    pub async fn execute_inline(&self, source: &str) -> LoadResult {
        let seq = self.inline_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let key = format!("inline:{seq}");

        let executor = self.executor.as_ref().ok_or_else(|| {
            LoadFailure::new(
                ResourceKind::Inline,
                &key,
                EnvError::Unavailable("code execution"),
            )
        })?;

        if self.diagnostics.is_enabled() {
            tracing::debug!(%key, bytes = source.len(), "executing inline code");
        }

        executor
            .execute(source)
            .await
            .map_err(|source| LoadFailure::new(ResourceKind::Inline, &key, source))?;

        Ok(LoadReceipt {
            kind: ResourceKind::Inline,
            key,
        })
    }

    async fn load_external(
        &self,
        kind: ResourceKind,
        locator: &Locator,
        dom_id: Option<&DomId>,
    ) -> LoadResult {
        // The handle is cached before the first await, so concurrent callers
        // for the same locator all end up on it.
        let handle = self
            .cache
            .get_or_insert_with(locator, || self.start(kind, locator, dom_id));

        handle.await?;

        Ok(LoadReceipt {
            kind,
            key: locator.to_string(),
        })
    }

    fn start(&self, kind: ResourceKind, locator: &Locator, dom_id: Option<&DomId>) -> SharedLoad {
        let document = Arc::clone(&self.document);
        let diagnostics = self.diagnostics.clone();
        let locator = locator.clone();
        let dom_id = dom_id.cloned();

        async move {
            if diagnostics.is_enabled() {
                tracing::debug!(%kind, %locator, "injecting resource");
            }

            let injected = match kind {
                ResourceKind::Style => document.inject_style(&locator, dom_id.as_ref()).await,
                ResourceKind::Script | ResourceKind::Inline => {
                    document.inject_script(&locator, dom_id.as_ref()).await
                }
            };

            injected.map_err(|source| LoadFailure::new(kind, locator.as_str(), source))
        }
        .boxed()
        .shared()
    }
}
