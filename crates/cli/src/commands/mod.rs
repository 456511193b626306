pub mod plan;
pub mod run;

use std::sync::Arc;

use starter_core::{Orchestrator, RecordingDocument, Rejected};

use crate::config::{Manifest, parse_resource};

/// An orchestrator wired to the manifest's simulated page.
pub struct Prepared {
    pub orchestrator: Orchestrator,
    pub document: Arc<RecordingDocument>,
    pub rejected: Vec<Rejected>,
}

pub fn prepare(manifest: Manifest, debug: bool) -> Prepared {
    let Manifest {
        debug: manifest_debug,
        environment,
        resources,
    } = manifest;

    let document = Arc::new(RecordingDocument::new().with_unreachable(environment.unreachable));
    let mut orchestrator = Orchestrator::new(Arc::new(environment.snapshot), document.clone());
    if environment.allow_inline {
        orchestrator = orchestrator.with_code_executor(document.clone());
    }
    orchestrator.set_diagnostics(debug || manifest_debug);

    let rejected = resources
        .iter()
        .filter_map(|entry| register_entry(&mut orchestrator, entry).err())
        .collect();

    Prepared {
        orchestrator,
        document,
        rejected,
    }
}

fn register_entry(orchestrator: &mut Orchestrator, entry: &toml::Value) -> Result<(), Rejected> {
    let spec = parse_resource(entry).inspect_err(|rejected| {
        if orchestrator.diagnostics_enabled() {
            tracing::warn!(resource = ?rejected.name, reason = %rejected.reason, "resource rejected");
        }
    })?;
    let name = spec.name.clone();
    orchestrator
        .register(spec)
        .map_err(|reason| Rejected { name, reason })
}

pub(crate) fn render_rejected(rejected: &[Rejected]) -> String {
    rejected
        .iter()
        .map(|r| {
            format!(
                "rejected {}: {}\n",
                r.name.as_deref().unwrap_or("<unnamed>"),
                r.reason
            )
        })
        .collect()
}
