use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format used for human-facing timestamps (`last_verified`, log rendering).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Court status of an inmate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegalStatus {
    AwaitingTrial,
    Convicted,
    Sentenced,
    Parole,
    Probation,
}

impl LegalStatus {
    pub const ALL: [LegalStatus; 5] = [
        LegalStatus::AwaitingTrial,
        LegalStatus::Convicted,
        LegalStatus::Sentenced,
        LegalStatus::Parole,
        LegalStatus::Probation,
    ];

    /// Kebab-case identifier, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalStatus::AwaitingTrial => "awaiting-trial",
            LegalStatus::Convicted => "convicted",
            LegalStatus::Sentenced => "sentenced",
            LegalStatus::Parole => "parole",
            LegalStatus::Probation => "probation",
        }
    }
}

impl fmt::Display for LegalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LegalStatus::AwaitingTrial => "Awaiting Trial",
            LegalStatus::Convicted => "Convicted",
            LegalStatus::Sentenced => "Sentenced",
            LegalStatus::Parole => "On Parole",
            LegalStatus::Probation => "On Probation",
        })
    }
}

impl FromStr for LegalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        LegalStatus::ALL
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(needle)
                    || status.to_string().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("unknown legal status: {s}"))
    }
}

/// How the face image was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMethod {
    LiveCamera,
    Upload,
}

impl CaptureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::LiveCamera => "live-camera",
            CaptureMethod::Upload => "upload",
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureMethod::LiveCamera => "Live Camera",
            CaptureMethod::Upload => "Upload",
        })
    }
}

impl FromStr for CaptureMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live-camera" | "live" | "camera" | "live camera" => Ok(CaptureMethod::LiveCamera),
            "upload" => Ok(CaptureMethod::Upload),
            other => Err(format!("unknown capture method: {other}")),
        }
    }
}

/// Display band for a confidence percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn for_confidence(confidence: u8) -> Self {
        if confidence >= 90 {
            ConfidenceBand::High
        } else if confidence >= 85 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// An inmate known to the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InmateRecord {
    pub inmate_id: String,
    pub name: String,
    pub age: Option<u32>,
    pub crime: String,
    pub legal_status: LegalStatus,
    pub sentence: String,
    pub prison: String,
    /// Path of the enrollment photo, as submitted. Never read.
    pub image: Option<String>,
    /// Unset for the built-in gallery records.
    pub enrolled_at: Option<DateTime<Utc>>,
}

/// Outcome of one verification attempt.
///
/// Identity fields are empty strings when `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    pub inmate_id: String,
    pub name: String,
    /// `floor(cosine_similarity * 100)`.
    pub confidence: u8,
    pub sentence: String,
    pub last_verified: String,
    pub crime: String,
    pub legal_status: String,
    pub cosine_similarity: f64,
    /// Set when the score fell below the fallback threshold.
    pub used_fallback: bool,
}

impl VerificationResult {
    pub const FALLBACK_NOTICE: &'static str =
        "Fallback model (FaceNet) used for low-confidence detection";

    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::for_confidence(self.confidence)
    }
}
