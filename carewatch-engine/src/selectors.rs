//! Pure, derived views over a [`Snapshot`].
//!
//! Selectors never mutate and hold no state. They borrow from the snapshot
//! they are given, so a caller who keeps a snapshot keeps a consistent view.

use std::sync::Arc;

use carewatch_types::{Facility, FacilitySummary, Patient};

use crate::{EngineError, Snapshot};

/// `{id, name}` of every facility, in store order.
pub fn facility_list(snapshot: &Snapshot) -> Vec<FacilitySummary> {
    snapshot.facilities.iter().map(|f| f.summary()).collect()
}

/// The selected facility.
pub fn active_facility(snapshot: &Snapshot) -> Result<&Arc<Facility>, EngineError> {
    let facility_id = snapshot
        .selection
        .facility_id
        .as_deref()
        .ok_or(EngineError::NoActiveFacility)?;
    snapshot
        .facility(facility_id)
        .ok_or_else(|| EngineError::FacilityNotFound(facility_id.to_string()))
}

/// Roster of the active facility. Empty when there is none.
pub fn patients_in_active_facility(snapshot: &Snapshot) -> &[Arc<Patient>] {
    match active_facility(snapshot) {
        Ok(facility) => &facility.patients,
        Err(_) => &[],
    }
}

/// The selected patient, if any.
pub fn active_patient(snapshot: &Snapshot) -> Option<&Arc<Patient>> {
    let patient_id = snapshot.selection.patient_id.as_deref()?;
    active_facility(snapshot).ok()?.patient(patient_id)
}
