use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Opt-in switch for diagnostic `tracing` events.
///
/// Clones share the same flag, so the evaluator, loader and orchestrator
/// toggle together.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics(Arc<AtomicBool>);

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
