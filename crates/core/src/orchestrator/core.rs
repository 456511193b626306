use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::{
    condition::ConditionEvaluator,
    diagnostics::Diagnostics,
    env::{Document, Environment},
    error::{ConditionError, InvalidDescriptor},
    extension::CodeExecutor,
    loader::{LoadCache, ResourceLoader},
    types::descriptor::{ResourceDescriptor, ResourceSpec},
    validation,
};

use super::{PlanEntry, Rejected, ResourceOutcome, ResourceReport, RunReport};

/// Registry of conditional resources plus the evaluator and loader that act
/// on it.
///
/// Each [`run`](Self::run) is a fresh pass over every registered resource.
/// Only the loader's cache survives between passes.
pub struct Orchestrator {
    environment: Arc<dyn Environment>,
    evaluator: ConditionEvaluator,
    loader: ResourceLoader,
    registry: Vec<ResourceDescriptor>,
    diagnostics: Diagnostics,
}

impl Orchestrator {
    pub fn new(environment: Arc<dyn Environment>, document: Arc<dyn Document>) -> Self {
        let diagnostics = Diagnostics::default();
        Self {
            environment,
            evaluator: ConditionEvaluator::new(diagnostics.clone()),
            loader: ResourceLoader::new(document).with_diagnostics(diagnostics.clone()),
            registry: Vec::new(),
            diagnostics,
        }
    }

    /// Shares `cache` with other orchestrators or loaders.
    pub fn with_cache(mut self, cache: Arc<LoadCache>) -> Self {
        self.loader = self.loader.with_cache(cache);
        self
    }

    /// Enables inline resources. See [`crate::extension`].
    pub fn with_code_executor(mut self, executor: Arc<dyn CodeExecutor>) -> Self {
        self.loader = self.loader.with_executor(executor);
        self
    }

    pub fn register(&mut self, spec: ResourceSpec) -> Result<(), InvalidDescriptor> {
        let name = spec.name.clone();
        match validation::validate_resource(spec) {
            Ok(descriptor) => {
                if self.diagnostics.is_enabled() {
                    tracing::debug!(resource = descriptor.label(), "resource registered");
                }
                self.registry.push(descriptor);
                Ok(())
            }
            Err(reason) => {
                if self.diagnostics.is_enabled() {
                    tracing::warn!(resource = ?name, %reason, "resource rejected");
                }
                Err(reason)
            }
        }
    }

    /// Registers every valid spec and returns the rejected ones.
    pub fn register_all<I>(&mut self, specs: I) -> Vec<Rejected>
    where
        I: IntoIterator<Item = ResourceSpec>,
    {
        specs
            .into_iter()
            .filter_map(|spec| {
                let name = spec.name.clone();
                self.register(spec)
                    .err()
                    .map(|reason| Rejected { name, reason })
            })
            .collect()
    }

    pub fn add_condition<F>(&mut self, kind: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &dyn Environment) -> Result<bool, ConditionError> + Send + Sync + 'static,
    {
        self.evaluator.register(kind, predicate);
    }

    pub fn set_diagnostics(&self, enabled: bool) {
        self.diagnostics.set(enabled);
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics.is_enabled()
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.registry
    }

    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// Evaluates and loads every registered resource concurrently.
    ///
    /// Completes once every resource has settled. A failure is recorded in
    /// the report for that resource and affects no other.
    pub async fn run(&self) -> RunReport {
        if self.diagnostics.is_enabled() {
            tracing::debug!(resources = self.registry.len(), "starting orchestration pass");
        }

        let resources = join_all(self.registry.iter().map(|d| self.run_one(d))).await;
        let report = RunReport { resources };

        if self.diagnostics.is_enabled() {
            tracing::debug!(
                loaded = report.loaded(),
                failed = report.failed(),
                skipped = report.skipped(),
                "orchestration pass finished"
            );
        }

        report
    }

    /// Evaluates every condition without loading anything.
    pub fn plan(&self) -> Vec<PlanEntry> {
        self.registry
            .iter()
            .map(|descriptor| PlanEntry {
                label: descriptor.label().to_string(),
                kind: descriptor.payload.kind(),
                matched: self.matches(descriptor),
            })
            .collect()
    }

    async fn run_one(&self, descriptor: &ResourceDescriptor) -> ResourceReport {
        let matched = self.matches(descriptor);

        let outcome = if matched {
            match self.loader.load(&descriptor.payload).await {
                Ok(receipt) => {
                    if self.diagnostics.is_enabled() {
                        tracing::debug!(resource = descriptor.label(), "resource loaded");
                    }
                    ResourceOutcome::Loaded(receipt)
                }
                Err(failure) => {
                    if self.diagnostics.is_enabled() {
                        tracing::warn!(resource = descriptor.label(), %failure, "resource failed to load");
                    }
                    ResourceOutcome::Failed(failure)
                }
            }
        } else {
            ResourceOutcome::Skipped
        };

        ResourceReport {
            identity: descriptor.identity.clone(),
            label: descriptor.label().to_string(),
            kind: descriptor.payload.kind(),
            matched,
            outcome,
        }
    }

    fn matches(&self, descriptor: &ResourceDescriptor) -> bool {
        let matched = self
            .evaluator
            .evaluate(&descriptor.condition, self.environment.as_ref());
        if self.diagnostics.is_enabled() {
            tracing::debug!(resource = descriptor.label(), matched, "condition evaluated");
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::{
        condition::Condition,
        env::{EnvironmentSnapshot, RecordingDocument},
        error::{EnvError, LoadFailure},
        extension::CustomPredicate,
        loader::LoadStatus,
        types::primitives::{Locator, ResourceKind},
    };

    fn setup(env: EnvironmentSnapshot, document: &Arc<RecordingDocument>) -> Orchestrator {
        Orchestrator::new(Arc::new(env), document.clone()).with_code_executor(document.clone())
    }

    #[tokio::test]
    async fn future_start_date_skips_without_injecting() {
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(EnvironmentSnapshot::new(), &document);
        orchestrator
            .register(ResourceSpec::script("a.js").when(Condition::leaf("time.after", "2999-01-01")))
            .unwrap();

        let report = orchestrator.run().await;

        let entry = report.get("a.js").expect("reported");
        assert!(!entry.matched);
        assert_eq!(entry.outcome, ResourceOutcome::Skipped);
        assert!(document.injections().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_rest() {
        let document = Arc::new(RecordingDocument::new().with_unreachable(["broken.js"]));
        let mut orchestrator = setup(EnvironmentSnapshot::new(), &document);
        let rejected = orchestrator.register_all([
            ResourceSpec::script("broken.js").when(Condition::always()),
            ResourceSpec::script("good.js").when(Condition::always()),
        ]);
        assert!(rejected.is_empty());

        let report = orchestrator.run().await;

        assert_eq!(report.loaded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.get("broken.js").map(|r| &r.outcome),
            Some(&ResourceOutcome::Failed(LoadFailure::new(
                ResourceKind::Script,
                "broken.js",
                EnvError::ErrorEvent
            )))
        );
        assert!(matches!(
            report.get("good.js").map(|r| &r.outcome),
            Some(ResourceOutcome::Loaded(_))
        ));
    }

    #[tokio::test]
    async fn invalid_specs_never_reach_a_run() {
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(EnvironmentSnapshot::new(), &document);

        let rejected = orchestrator.register_all([
            ResourceSpec::script("no-condition.js").named("no-condition"),
            ResourceSpec {
                name: Some("both".into()),
                url: Some("both.js".into()),
                code: Some("run()".into()),
                condition: Some(Condition::always()),
                ..Default::default()
            },
            ResourceSpec::script("ok.js").named("ok").when(Condition::always()),
        ]);

        assert_eq!(
            rejected,
            vec![
                Rejected {
                    name: Some("no-condition".into()),
                    reason: InvalidDescriptor::MissingCondition,
                },
                Rejected {
                    name: Some("both".into()),
                    reason: InvalidDescriptor::AmbiguousPayload,
                },
            ]
        );

        assert_eq!(orchestrator.resources().len(), 1);

        let report = orchestrator.run().await;
        let labels: Vec<&str> = report.resources.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["ok"]);
        assert_eq!(document.injection_count("both.js"), 0);
    }

    #[tokio::test]
    async fn passes_reevaluate_but_reuse_the_cache() {
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(EnvironmentSnapshot::new(), &document);
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        orchestrator
            .register(ResourceSpec::script("a.js").when(Condition::custom(
                CustomPredicate::from_fn("counted", move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    true
                }),
            )))
            .unwrap();

        let first = orchestrator.run().await;
        let second = orchestrator.run().await;

        assert_eq!(first, second);
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
        assert_eq!(document.injection_count("a.js"), 1);
    }

    #[tokio::test]
    async fn same_locator_in_two_descriptors_injects_once() {
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(EnvironmentSnapshot::new(), &document);
        orchestrator.register_all([
            ResourceSpec::script("shared.js").named("first").when(Condition::always()),
            ResourceSpec::script("shared.js").named("second").when(Condition::always()),
        ]);

        let report = orchestrator.run().await;

        assert_eq!(report.loaded(), 2);
        assert_eq!(document.injection_count("shared.js"), 1);
    }

    #[tokio::test]
    async fn reports_follow_registration_order() {
        let env = EnvironmentSnapshot::new()
            .with_url("https://shop.example.com/cart")
            .with_user_agent("Mozilla/5.0 (Android 14; Mobile)");
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(env, &document);
        orchestrator.register_all([
            ResourceSpec::style("cart.css").when(Condition::leaf("page.pathname.equals", "/cart")),
            ResourceSpec::script("desktop.js").when(Condition::kind("device.desktop")),
            ResourceSpec::inline("window.cartSeen = true").named("mark-cart").when(Condition::all([
                Condition::kind("device.mobile"),
                Condition::leaf("page.url.contains", "cart"),
            ])),
        ]);

        let report = orchestrator.run().await;

        let summary: Vec<(&str, bool)> = report
            .resources
            .iter()
            .map(|r| (r.label.as_str(), r.matched))
            .collect();
        assert_eq!(
            summary,
            vec![("cart.css", true), ("desktop.js", false), ("mark-cart", true)]
        );
        assert_eq!(document.executed(), vec!["window.cartSeen = true".to_string()]);
    }

    #[tokio::test]
    async fn inline_without_executor_fails_in_isolation() {
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = Orchestrator::new(Arc::new(EnvironmentSnapshot::new()), document.clone());
        orchestrator.register_all([
            ResourceSpec::inline("run()").named("inline").when(Condition::always()),
            ResourceSpec::script("a.js").when(Condition::always()),
        ]);

        let report = orchestrator.run().await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.loaded(), 1);
        assert_eq!(report.failures().next().map(|(r, _)| r.label.as_str()), Some("inline"));
    }

    #[tokio::test]
    async fn custom_condition_kinds_gate_resources() {
        let env = EnvironmentSnapshot::new().with_cookie("plan=pro");
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(env, &document);
        orchestrator.add_condition("plan.is", |value, env| {
            let wanted = value.as_str().unwrap_or_default();
            Ok(env.cookies()?.contains(&format!("plan={wanted}")))
        });
        assert!(orchestrator.evaluator().contains("plan.is"));
        orchestrator.register_all([
            ResourceSpec::script("pro.js").when(Condition::leaf("plan.is", "pro")),
            ResourceSpec::script("free.js").when(Condition::leaf("plan.is", "free")),
        ]);

        let report = orchestrator.run().await;

        assert_eq!(report.loaded(), 1);
        assert!(report.get("pro.js").is_some_and(|r| r.matched));
    }

    #[tokio::test]
    async fn plan_evaluates_without_loading() {
        let document = Arc::new(RecordingDocument::new());
        let mut orchestrator = setup(EnvironmentSnapshot::new(), &document);
        let condition: Condition = serde_json::from_value(json!({
            "operator": "or",
            "children": [{ "kind": "never" }, { "kind": "always" }],
        }))
        .unwrap();
        orchestrator.register_all([
            ResourceSpec::script("a.js").when(condition),
            ResourceSpec::script("b.js").when(Condition::kind("nonexistent.kind")),
        ]);

        let plan = orchestrator.plan();

        assert_eq!(
            plan.iter().map(|p| p.matched).collect::<Vec<_>>(),
            vec![true, false]
        );
        assert!(document.injections().is_empty());
    }

    #[tokio::test]
    async fn shared_cache_across_orchestrators() {
        let document = Arc::new(RecordingDocument::new());
        let cache = Arc::new(LoadCache::new());
        let mut first = setup(EnvironmentSnapshot::new(), &document).with_cache(Arc::clone(&cache));
        let mut second = setup(EnvironmentSnapshot::new(), &document).with_cache(Arc::clone(&cache));
        first.register(ResourceSpec::script("a.js").when(Condition::always())).unwrap();
        second.register(ResourceSpec::script("a.js").when(Condition::always())).unwrap();

        first.run().await;
        second.run().await;

        let locator = Locator::new("a.js");
        assert_eq!(document.injection_count("a.js"), 1);
        assert!(cache.contains(&locator));
        assert!(!cache.contains(&Locator::new("b.js")));
        assert_eq!(second.loader().status(&locator), Some(LoadStatus::Loaded));
    }

    #[test]
    fn diagnostics_are_off_until_enabled() {
        let document = Arc::new(RecordingDocument::new());
        let orchestrator = setup(EnvironmentSnapshot::new(), &document);
        assert!(!orchestrator.diagnostics_enabled());

        orchestrator.set_diagnostics(true);
        assert!(orchestrator.diagnostics_enabled());

        orchestrator.set_diagnostics(false);
        assert!(!orchestrator.diagnostics_enabled());
    }
}
