//! The state store: single owner of the facility/patient graph.
//!
//! Every commit replaces the published [`Snapshot`] with a new one. Only the
//! touched facility and patient are reallocated; everything else is shared
//! with the previous snapshot, which stays valid for anyone holding it.

use std::collections::HashSet;
use std::sync::Arc;

use carewatch_types::{Facility, InvariantViolation, Patient, PatientUpdate};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::EngineError;

/// Which facility and patient the observer is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub facility_id: Option<String>,
    pub patient_id: Option<String>,
}

/// An immutable, point-in-time view of the store.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Bumped on every commit.
    pub revision: u64,
    pub facilities: Arc<[Arc<Facility>]>,
    pub selection: Selection,
}

impl Snapshot {
    /// Find a facility by id.
    pub fn facility(&self, facility_id: &str) -> Option<&Arc<Facility>> {
        self.facilities.iter().find(|f| f.id == facility_id)
    }

    /// Find a patient anywhere in the store.
    pub fn patient(&self, patient_id: &str) -> Option<&Arc<Patient>> {
        let (f, p) = self.locate(patient_id)?;
        Some(&self.facilities[f].patients[p])
    }

    /// `(facility index, patient index)` of a patient.
    pub fn locate(&self, patient_id: &str) -> Option<(usize, usize)> {
        self.facilities
            .iter()
            .enumerate()
            .find_map(|(f, facility)| facility.position(patient_id).map(|p| (f, p)))
    }

    /// Iterate every patient in store order.
    pub fn patients(&self) -> impl Iterator<Item = &Arc<Patient>> {
        self.facilities.iter().flat_map(|f| f.patients.iter())
    }

    /// Check every entity and selection invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::new();
        for patient in self.patients() {
            if !seen.insert(patient.id.as_str()) {
                return Err(InvariantViolation::DuplicatePatient(patient.id.clone()));
            }
            patient.check_invariants()?;
        }

        if let Some(patient_id) = &self.selection.patient_id {
            let in_facility = self
                .selection
                .facility_id
                .as_deref()
                .and_then(|id| self.facility(id))
                .is_some_and(|f| f.position(patient_id).is_some());
            if !in_facility {
                return Err(InvariantViolation::SelectionOutsideFacility {
                    facility: self.selection.facility_id.clone().unwrap_or_default(),
                    patient: patient_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Observer invoked synchronously after every commit.
///
/// Called outside the store lock, so a listener may read the store again.
pub trait CommitListener: Send + Sync {
    fn on_commit(&self, snapshot: &Snapshot);
}

/// Thread-safe owner of the entity graph.
pub struct Store {
    state: RwLock<Snapshot>,
    listeners: RwLock<Vec<Arc<dyn CommitListener>>>,
    publisher: watch::Sender<Snapshot>,
}

impl Store {
    /// Create a store from seed facilities.
    ///
    /// The first facility and its first patient start out selected.
    pub fn new(facilities: Vec<Facility>) -> Result<Self, EngineError> {
        let selection = Selection {
            facility_id: facilities.first().map(|f| f.id.clone()),
            patient_id: facilities
                .first()
                .and_then(|f| f.first_patient())
                .map(|p| p.id.clone()),
        };

        let mut facility_ids = HashSet::new();
        for facility in &facilities {
            if !facility_ids.insert(facility.id.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate facility id {}",
                    facility.id
                )));
            }
        }

        let snapshot = Snapshot {
            revision: 0,
            facilities: facilities.into_iter().map(Arc::new).collect(),
            selection,
        };
        snapshot.check_invariants()?;

        let (publisher, _) = watch::channel(snapshot.clone());
        Ok(Self {
            state: RwLock::new(snapshot),
            listeners: RwLock::new(Vec::new()),
            publisher,
        })
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.state.read().clone()
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Subscribe to every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.publisher.subscribe()
    }

    /// Register a listener called after every commit.
    pub fn add_listener(&self, listener: Arc<dyn CommitListener>) {
        self.listeners.write().push(listener);
    }

    /// Merge `update` into one patient as a single atomic commit.
    ///
    /// Returns `false` (and commits nothing) for an unknown id.
    pub fn update_patient(&self, patient_id: &str, update: &PatientUpdate) -> bool {
        let snapshot = {
            let mut state = self.state.write();
            let Some((f, p)) = state.locate(patient_id) else {
                debug!(patient = patient_id, "update for unknown patient ignored");
                return false;
            };

            let facility = &state.facilities[f];
            let merged = facility.patients[p].merged(update);
            debug_assert!(
                merged.check_invariants().is_ok(),
                "{:?}",
                merged.check_invariants()
            );

            let mut patients = facility.patients.clone();
            patients[p] = Arc::new(merged);
            let facility = Arc::new(Facility {
                id: facility.id.clone(),
                name: facility.name.clone(),
                patients,
            });

            let mut facilities = state.facilities.to_vec();
            facilities[f] = facility;
            state.facilities = facilities.into();
            state.revision += 1;
            self.publish(&state)
        };

        self.notify(&snapshot);
        true
    }

    /// Make `facility_id` the active facility and select its first patient.
    pub fn select_facility(&self, facility_id: &str) -> Result<(), EngineError> {
        let snapshot = {
            let mut state = self.state.write();
            let first_patient = state
                .facility(facility_id)
                .ok_or_else(|| EngineError::FacilityNotFound(facility_id.to_string()))?
                .first_patient()
                .map(|p| p.id.clone());

            state.selection = Selection {
                facility_id: Some(facility_id.to_string()),
                patient_id: first_patient,
            };
            state.revision += 1;
            self.publish(&state)
        };

        self.notify(&snapshot);
        Ok(())
    }

    /// Select a patient of the active facility.
    pub fn select_patient(&self, patient_id: &str) -> Result<(), EngineError> {
        let snapshot = {
            let mut state = self.state.write();
            let facility = state
                .selection
                .facility_id
                .as_deref()
                .and_then(|id| state.facility(id))
                .ok_or(EngineError::NoActiveFacility)?;
            if facility.position(patient_id).is_none() {
                return Err(EngineError::PatientNotFound(patient_id.to_string()));
            }

            state.selection.patient_id = Some(patient_id.to_string());
            state.revision += 1;
            self.publish(&state)
        };

        self.notify(&snapshot);
        Ok(())
    }

    // Called with the write lock held so subscribers see commits in revision order.
    fn publish(&self, state: &Snapshot) -> Snapshot {
        self.publisher.send_replace(state.clone());
        state.clone()
    }

    // Listeners run outside the lock and may commit again.
    fn notify(&self, snapshot: &Snapshot) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_commit(snapshot);
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Store")
            .field("revision", &state.revision)
            .field("facilities", &state.facilities.len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
