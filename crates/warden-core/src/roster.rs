//! Inmate roster: the built-in gallery plus enrolled inmates.

use crate::types::{InmateRecord, LegalStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GALLERY_PRISON: &str = "State Correctional Facility";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RosterError {
    #[error("required field is empty: {0}")]
    MissingField(&'static str),
    #[error("inmate already enrolled: {0}")]
    DuplicateId(String),
    #[error("unknown inmate: {0}")]
    UnknownInmate(String),
}

/// The four fixed records every simulated match is drawn from.
pub fn mock_gallery() -> Vec<InmateRecord> {
    [
        (
            "INM-2024-001",
            "John Smith",
            "Armed Robbery, Assault with Deadly Weapon",
            LegalStatus::Convicted,
            "8 years",
        ),
        (
            "INM-2024-002",
            "Michael Brown",
            "Drug Trafficking",
            LegalStatus::Sentenced,
            "5 years",
        ),
        (
            "INM-2024-003",
            "Robert Johnson",
            "Fraud, Money Laundering",
            LegalStatus::Convicted,
            "3 years",
        ),
        (
            "INM-2024-004",
            "David Wilson",
            "Assault",
            LegalStatus::AwaitingTrial,
            "18 months",
        ),
    ]
    .into_iter()
    .map(|(id, name, crime, legal_status, sentence)| InmateRecord {
        inmate_id: id.to_string(),
        name: name.to_string(),
        age: None,
        crime: crime.to_string(),
        legal_status,
        sentence: sentence.to_string(),
        prison: GALLERY_PRISON.to_string(),
        image: None,
        enrolled_at: None,
    })
    .collect()
}

/// Fields submitted when enrolling a new inmate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub name: String,
    pub inmate_id: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub crime: String,
    pub legal_status: LegalStatus,
    #[serde(default)]
    pub sentence: String,
    pub prison: String,
    /// Path to the facial image.
    pub image: String,
}

impl EnrollmentRequest {
    /// Check required fields. Whitespace-only values count as empty.
    pub fn validate(&self) -> Result<(), RosterError> {
        let required = [
            ("name", &self.name),
            ("inmate_id", &self.inmate_id),
            ("prison", &self.prison),
            ("image", &self.image),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RosterError::MissingField(field));
            }
        }
        Ok(())
    }

    fn into_record(self, enrolled_at: DateTime<Utc>) -> InmateRecord {
        InmateRecord {
            inmate_id: self.inmate_id.trim().to_string(),
            name: self.name.trim().to_string(),
            age: self.age,
            crime: self.crime.trim().to_string(),
            legal_status: self.legal_status,
            sentence: self.sentence.trim().to_string(),
            prison: self.prison.trim().to_string(),
            image: Some(self.image),
            enrolled_at: Some(enrolled_at),
        }
    }
}

/// In-memory roster, in enrollment order.
#[derive(Debug, Clone)]
pub struct Roster {
    inmates: Vec<InmateRecord>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            inmates: mock_gallery(),
        }
    }
}

impl Roster {
    /// Validate and add an inmate. IDs are compared case-insensitively.
    pub fn enroll(
        &mut self,
        request: EnrollmentRequest,
        at: DateTime<Utc>,
    ) -> Result<InmateRecord, RosterError> {
        request.validate()?;

        let id = request.inmate_id.trim();
        if self.get(id).is_some() {
            return Err(RosterError::DuplicateId(id.to_string()));
        }

        let record = request.into_record(at);
        tracing::info!(
            inmate_id = %record.inmate_id,
            legal_status = %record.legal_status,
            prison = %record.prison,
            "inmate enrolled"
        );
        self.inmates.push(record.clone());
        Ok(record)
    }

    pub fn get(&self, inmate_id: &str) -> Option<&InmateRecord> {
        self.inmates
            .iter()
            .find(|i| i.inmate_id.eq_ignore_ascii_case(inmate_id.trim()))
    }

    pub fn lookup(&self, inmate_id: &str) -> Result<&InmateRecord, RosterError> {
        self.get(inmate_id)
            .ok_or_else(|| RosterError::UnknownInmate(inmate_id.to_string()))
    }

    pub fn list(&self) -> &[InmateRecord] {
        &self.inmates
    }

    pub fn len(&self) -> usize {
        self.inmates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inmates.is_empty()
    }
}
