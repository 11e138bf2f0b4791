//! warden-core — Simulated inmate face verification.
//!
//! Similarity scores are drawn at random rather than computed from face
//! embeddings. Around the simulator sit the inmate roster, the
//! verification log and the activity feed the daemon serves.

pub mod activity;
pub mod analytics;
pub mod log;
pub mod roster;
pub mod simulator;
pub mod types;

pub use activity::{ActivityFeed, ActivityItem, ActivityKind, ActivityStatus};
pub use analytics::{Analytics, Bucket};
pub use log::{
    Checkpoint, DateRange, InmateHistory, LogEntry, LogPage, LogQuery, Stats, VerificationLog,
};
pub use roster::{mock_gallery, EnrollmentRequest, Roster, RosterError};
pub use simulator::{OutcomeSimulator, Similarity, Thresholds, Verifier};
pub use types::{CaptureMethod, ConfidenceBand, InmateRecord, LegalStatus, VerificationResult};
