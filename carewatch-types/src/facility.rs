//! Facility - a care home and its ordered patient roster.

use std::sync::Arc;

use crate::Patient;

/// A care facility. Owns its patients exclusively.
///
/// Patients are held behind `Arc` so that snapshots can share every
/// patient an update did not touch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub patients: Vec<Arc<Patient>>,
}

/// The `{id, name}` pair shown in facility pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacilitySummary {
    pub id: String,
    pub name: String,
}

impl Facility {
    /// Create an empty facility.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            patients: Vec::new(),
        }
    }

    /// Create a builder for a facility.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> FacilityBuilder {
        FacilityBuilder::new(id, name)
    }

    /// The `{id, name}` summary of this facility.
    pub fn summary(&self) -> FacilitySummary {
        FacilitySummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Find a patient by id.
    pub fn patient(&self, patient_id: &str) -> Option<&Arc<Patient>> {
        self.patients.iter().find(|p| p.id == patient_id)
    }

    /// Position of a patient in the roster.
    pub fn position(&self, patient_id: &str) -> Option<usize> {
        self.patients.iter().position(|p| p.id == patient_id)
    }

    /// The first patient of the roster, if any.
    pub fn first_patient(&self) -> Option<&Arc<Patient>> {
        self.patients.first()
    }

    /// Check if the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Number of patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    /// Number of patients with an active fall alarm.
    pub fn active_falls(&self) -> usize {
        self.patients.iter().filter(|p| p.fall_detected()).count()
    }
}

/// Builder for constructing `Facility` seed records.
#[derive(Debug)]
pub struct FacilityBuilder {
    facility: Facility,
}

impl FacilityBuilder {
    /// Create a new builder.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            facility: Facility::new(id, name),
        }
    }

    /// Append a patient to the roster.
    pub fn patient(mut self, patient: Patient) -> Self {
        self.facility.patients.push(Arc::new(patient));
        self
    }

    /// Build the facility.
    pub fn build(self) -> Facility {
        self.facility
    }
}
