//! Snapshot export for headless runs.

use std::path::Path;

use anyhow::{Context, Result};
use carewatch_engine::{selectors, Snapshot};
use serde_json::{json, Value};

/// Build the export document for a snapshot.
pub fn to_json(snapshot: &Snapshot) -> Result<Value> {
    let patients: Vec<_> = snapshot.patients().collect();
    let falls = patients.iter().filter(|p| p.fall_detected()).count();
    let goals_reached = patients.iter().filter(|p| p.goal_reached()).count();

    let summary = json!({
        "revision": snapshot.revision,
        "facilities": snapshot.facilities.len(),
        "patients": patients.len(),
        "active_falls": falls,
        "goals_reached": goals_reached,
        "active_facility": snapshot.selection.facility_id,
        "active_patient": selectors::active_patient(snapshot).map(|p| p.id.clone()),
    });

    Ok(json!({
        "summary": summary,
        "facilities": serde_json::to_value(&snapshot.facilities)?,
    }))
}

/// Write the export document to `path`.
pub fn write(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&to_json(snapshot)?)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write export to {}", path.display()))
}
