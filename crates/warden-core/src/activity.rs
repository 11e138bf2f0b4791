//! Bounded feed of recent events, newest first.

use crate::log::Checkpoint;
use crate::types::{InmateRecord, VerificationResult, TIMESTAMP_FORMAT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Verification,
    Enrollment,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Failed,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: ActivityStatus,
    pub officer: Option<String>,
    pub inmate_id: Option<String>,
}

impl ActivityItem {
    pub fn verification(
        result: &VerificationResult,
        checkpoint: &Checkpoint,
        at: DateTime<Utc>,
    ) -> Self {
        let (message, status, inmate_id) = if result.success {
            (
                format!(
                    "Inmate {} verified at {} by {}",
                    result.inmate_id, checkpoint.location, checkpoint.officer
                ),
                ActivityStatus::Success,
                Some(result.inmate_id.clone()),
            )
        } else {
            (
                format!(
                    "Verification failed at {} by {}",
                    checkpoint.location, checkpoint.officer
                ),
                ActivityStatus::Failed,
                None,
            )
        };
        Self {
            id: Uuid::new_v4(),
            kind: ActivityKind::Verification,
            message,
            timestamp: at,
            status,
            officer: Some(checkpoint.officer.clone()),
            inmate_id,
        }
    }

    pub fn enrollment(inmate: &InmateRecord, officer: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ActivityKind::Enrollment,
            message: format!("New inmate {} enrolled by {officer}", inmate.inmate_id),
            timestamp: at,
            status: ActivityStatus::Success,
            officer: Some(officer.to_string()),
            inmate_id: Some(inmate.inmate_id.clone()),
        }
    }

    /// Daily summary line posted by the daemon's timer.
    pub fn daily_summary(successes: usize, at: DateTime<Utc>) -> Self {
        let plural = if successes == 1 { "" } else { "s" };
        Self {
            id: Uuid::new_v4(),
            kind: ActivityKind::System,
            message: format!("{successes} successful verification{plural} completed today"),
            timestamp: at,
            status: ActivityStatus::Info,
            officer: None,
            inmate_id: None,
        }
    }

    /// Time of day, for compact rendering.
    pub fn time_label(&self) -> String {
        self.timestamp
            .format(TIMESTAMP_FORMAT)
            .to_string()
            .split_off(11)
    }
}

#[derive(Debug, Clone)]
pub struct ActivityFeed {
    items: VecDeque<ActivityItem>,
    capacity: usize,
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an item at the front, dropping the oldest beyond capacity.
    pub fn push(&mut self, item: ActivityItem) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
    }

    /// Items, newest first.
    pub fn items(&self) -> Vec<ActivityItem> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::mock_gallery;

    fn checkpoint() -> Checkpoint {
        Checkpoint {
            officer: "Officer Akosua".into(),
            prison: "Nsawam Prison".into(),
            location: "Cafeteria".into(),
        }
    }

    fn result(success: bool) -> VerificationResult {
        VerificationResult {
            success,
            inmate_id: if success { "INM-2024-002".into() } else { String::new() },
            name: String::new(),
            confidence: 90,
            sentence: String::new(),
            last_verified: String::new(),
            crime: String::new(),
            legal_status: String::new(),
            cosine_similarity: 0.9,
            used_fallback: false,
        }
    }

    #[test]
    fn test_verification_messages() {
        let ok = ActivityItem::verification(&result(true), &checkpoint(), Utc::now());
        assert_eq!(ok.message, "Inmate INM-2024-002 verified at Cafeteria by Officer Akosua");
        assert_eq!(ok.status, ActivityStatus::Success);
        assert_eq!(ok.inmate_id.as_deref(), Some("INM-2024-002"));

        let failed = ActivityItem::verification(&result(false), &checkpoint(), Utc::now());
        assert_eq!(failed.message, "Verification failed at Cafeteria by Officer Akosua");
        assert_eq!(failed.status, ActivityStatus::Failed);
        assert!(failed.inmate_id.is_none());
    }

    #[test]
    fn test_enrollment_message() {
        let inmate = &mock_gallery()[0];
        let item = ActivityItem::enrollment(inmate, "Officer Kwabena", Utc::now());
        assert_eq!(item.message, "New inmate INM-2024-001 enrolled by Officer Kwabena");
        assert_eq!(item.kind, ActivityKind::Enrollment);
    }

    #[test]
    fn test_daily_summary_pluralization() {
        assert_eq!(
            ActivityItem::daily_summary(1, Utc::now()).message,
            "1 successful verification completed today"
        );
        assert_eq!(
            ActivityItem::daily_summary(3, Utc::now()).message,
            "3 successful verifications completed today"
        );
        let item = ActivityItem::daily_summary(0, Utc::now());
        assert_eq!(item.status, ActivityStatus::Info);
        assert!(item.officer.is_none());
    }

    #[test]
    fn test_feed_is_bounded_and_newest_first() {
        let mut feed = ActivityFeed::new(3);
        assert!(feed.is_empty());
        for n in 0..5 {
            feed.push(ActivityItem::daily_summary(n, Utc::now()));
        }
        assert_eq!(feed.len(), 3);
        let items = feed.items();
        assert!(items[0].message.starts_with("4 "));
        assert!(items[2].message.starts_with("2 "));
    }

    #[test]
    fn test_time_label() {
        let at = DateTime::parse_from_rfc3339("2024-01-15T14:30:22Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ActivityItem::daily_summary(0, at).time_label(), "14:30:22");
    }
}
