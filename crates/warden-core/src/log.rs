//! Verification log: every attempt the daemon ran, with search, filters,
//! pagination and aggregate stats.

use crate::types::{CaptureMethod, InmateRecord, VerificationResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_CAPACITY: usize = 10_000;
const UNKNOWN_NAME: &str = "Unknown";

/// Who ran a verification, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub officer: String,
    pub prison: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    /// Empty when no match was found.
    pub inmate_id: String,
    pub inmate_name: String,
    pub officer: String,
    pub prison: String,
    pub location: String,
    pub method: CaptureMethod,
    pub confidence: u8,
    pub cosine_similarity: f64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn from_result(
        result: &VerificationResult,
        checkpoint: &Checkpoint,
        method: CaptureMethod,
        at: DateTime<Utc>,
    ) -> Self {
        let inmate_name = if result.success {
            result.name.clone()
        } else {
            UNKNOWN_NAME.to_string()
        };
        Self {
            id: Uuid::new_v4(),
            inmate_id: result.inmate_id.clone(),
            inmate_name,
            officer: checkpoint.officer.clone(),
            prison: checkpoint.prison.clone(),
            location: checkpoint.location.clone(),
            method,
            confidence: result.confidence,
            cosine_similarity: result.cosine_similarity,
            success: result.success,
            timestamp: at,
        }
    }

    pub fn result_label(&self) -> &'static str {
        if self.success {
            "Success"
        } else {
            "Failed"
        }
    }
}

/// Date window for log queries. `Week` and `Month` are rolling windows of 7
/// and 30 days ending at the query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
    /// Inclusive on both ends.
    Between { from: NaiveDate, to: NaiveDate },
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match *self {
            DateRange::All => true,
            DateRange::Today => at.date_naive() == now.date_naive(),
            DateRange::Week => at > now - Duration::days(7) && at <= now,
            DateRange::Month => at > now - Duration::days(30) && at <= now,
            DateRange::Between { from, to } => {
                let day = at.date_naive();
                day >= from && day <= to
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    /// Case-insensitive substring over inmate ID and name.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact prison name, case-insensitive.
    #[serde(default)]
    pub prison: Option<String>,
    #[serde(default)]
    pub range: DateRange,
    /// 1-based; clamped into the valid range.
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            search: None,
            prison: None,
            range: DateRange::All,
            page: 1,
        }
    }
}

impl LogQuery {
    fn matches(&self, entry: &LogEntry, now: DateTime<Utc>) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !entry.inmate_id.to_lowercase().contains(&term)
                && !entry.inmate_name.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        if let Some(prison) = self.prison.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if !entry.prison.eq_ignore_ascii_case(prison) {
                return false;
            }
        }
        self.range.contains(entry.timestamp, now)
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,
    pub page: usize,
    pub total_pages: usize,
    pub total_records: usize,
    /// 1-based position of the first entry on this page (0 when empty).
    pub start: usize,
    /// 1-based position of the last entry on this page (0 when empty).
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_verifications: usize,
    pub successful_matches: usize,
    pub failed_matches: usize,
    pub total_inmates: usize,
    /// Percentage of successful verifications; 0.0 when nothing ran.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InmateHistory {
    pub inmate: InmateRecord,
    pub total_verifications: usize,
    pub success_rate: f64,
    /// Time of the newest successful verification.
    pub last_verified: Option<DateTime<Utc>>,
    /// Newest first.
    pub entries: Vec<LogEntry>,
}

fn success_rate(successes: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        successes as f64 * 100.0 / total as f64
    }
}

/// In-memory log holding at most `capacity` entries; the oldest are evicted first.
#[derive(Debug, Clone)]
pub struct VerificationLog {
    entries: VecDeque<LogEntry>,
    page_size: usize,
    capacity: usize,
}

impl Default for VerificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_CAPACITY)
    }
}

impl VerificationLog {
    pub fn new(page_size: usize, capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            page_size: page_size.max(1),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, entry: LogEntry) {
        tracing::debug!(
            id = %entry.id,
            inmate_id = %entry.inmate_id,
            success = entry.success,
            "log entry recorded"
        );
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::trace!(id = %evicted.id, "log entry evicted");
            }
        }
        self.entries.push_back(entry);
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filter newest first, then cut out the requested page.
    pub fn query(&self, query: &LogQuery, now: DateTime<Utc>) -> LogPage {
        let matching: Vec<&LogEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| query.matches(e, now))
            .collect();

        let total_records = matching.len();
        let total_pages = total_records.div_ceil(self.page_size).max(1);
        let page = query.page.clamp(1, total_pages);
        let offset = (page - 1) * self.page_size;

        let entries: Vec<LogEntry> = matching
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();

        let (start, end) = if entries.is_empty() {
            (0, 0)
        } else {
            (offset + 1, offset + entries.len())
        };

        LogPage {
            entries,
            page,
            total_pages,
            total_records,
            start,
            end,
        }
    }

    pub fn stats(&self, total_inmates: usize) -> Stats {
        let successful = self.entries.iter().filter(|e| e.success).count();
        let total = self.entries.len();
        Stats {
            total_verifications: total,
            successful_matches: successful,
            failed_matches: total - successful,
            total_inmates,
            success_rate: success_rate(successful, total),
        }
    }

    /// Successful verifications on the same UTC day as `now`.
    pub fn successes_on_day(&self, now: DateTime<Utc>) -> usize {
        self.entries
            .iter()
            .filter(|e| e.success && DateRange::Today.contains(e.timestamp, now))
            .count()
    }

    pub fn history(&self, inmate: &InmateRecord) -> InmateHistory {
        let entries: Vec<LogEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.inmate_id.eq_ignore_ascii_case(&inmate.inmate_id))
            .cloned()
            .collect();
        let successes = entries.iter().filter(|e| e.success).count();
        let last_verified = entries.iter().find(|e| e.success).map(|e| e.timestamp);

        InmateHistory {
            inmate: inmate.clone(),
            total_verifications: entries.len(),
            success_rate: success_rate(successes, entries.len()),
            last_verified,
            entries,
        }
    }
}
