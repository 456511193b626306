use starter_core::PlanEntry;

use super::{Prepared, render_rejected};

pub fn plan(prepared: &Prepared) -> Vec<PlanEntry> {
    prepared.orchestrator.plan()
}

pub fn render(prepared: &Prepared, entries: &[PlanEntry]) -> String {
    let mut out = render_rejected(&prepared.rejected);
    for entry in entries {
        let verdict = if entry.matched { "load" } else { "skip" };
        out.push_str(&format!(
            "{verdict:<5} {:<7} {}\n",
            entry.kind.as_str(),
            entry.label
        ));
    }
    out
}
