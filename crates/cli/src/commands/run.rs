use std::time::Duration;

use starter_core::{ResourceOutcome, RunReport};
use thiserror::Error;

use super::{Prepared, render_rejected};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("orchestration pass did not settle within {0:?}")]
    TimedOut(Duration),
}

/// Runs one pass. The orchestrator has no timeout of its own, so `timeout`
/// races the whole pass from outside.
pub async fn run(prepared: &Prepared, timeout: Option<Duration>) -> Result<RunReport, RunError> {
    let pass = prepared.orchestrator.run();
    match timeout {
        Some(limit) => tokio::time::timeout(limit, pass)
            .await
            .map_err(|_| RunError::TimedOut(limit)),
        None => Ok(pass.await),
    }
}

pub fn render(prepared: &Prepared, report: &RunReport) -> String {
    let mut out = render_rejected(&prepared.rejected);
    out.push_str(&format!(
        "{:<24} {:<7} {:<8} {}\n",
        "RESOURCE", "KIND", "MATCHED", "OUTCOME"
    ));

    for resource in &report.resources {
        let outcome = match &resource.outcome {
            ResourceOutcome::Loaded(receipt) => format!("loaded ({})", receipt.key),
            ResourceOutcome::Failed(failure) => format!("failed: {failure}"),
            ResourceOutcome::Skipped => "skipped".to_string(),
        };
        out.push_str(&format!(
            "{:<24} {:<7} {:<8} {}\n",
            resource.label,
            resource.kind.as_str(),
            if resource.matched { "yes" } else { "no" },
            outcome
        ));
    }

    out.push_str(&format!(
        "{} loaded, {} failed, {} skipped\n",
        report.loaded(),
        report.failed(),
        report.skipped()
    ));
    out
}
