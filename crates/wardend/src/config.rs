use std::str::FromStr;
use std::time::Duration;
use warden_core::{Checkpoint, Thresholds};

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Officer recorded against every verification and enrollment.
    pub officer: String,
    /// Facility this daemon runs in.
    pub prison: String,
    /// Default checkpoint location; a verify request may override it.
    pub location: String,
    /// Artificial delay before a verification result is returned.
    pub verify_delay: Duration,
    /// Artificial delay before an enrollment completes.
    pub enroll_delay: Duration,
    /// Similarity strictly above this is a match.
    pub match_threshold: f64,
    /// Similarity strictly below this is flagged as a fallback-model result.
    pub fallback_threshold: f64,
    pub log_page_size: usize,
    /// Most log entries kept in memory; the oldest are dropped first.
    pub log_capacity: usize,
    pub activity_capacity: usize,
    /// Interval for the daily-summary activity item; 0 disables it.
    pub summary_interval_secs: u64,
    /// Claim the bus name on the system bus instead of the session bus.
    pub system_bus: bool,
}

impl Config {
    /// Load configuration from `WARDEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            officer: text("WARDEN_OFFICER", "Officer Kwabena"),
            prison: text("WARDEN_PRISON", "Kumasi Prison"),
            location: text("WARDEN_LOCATION", "Main Gate"),
            verify_delay: Duration::from_millis(parsed(&lookup, "WARDEN_VERIFY_DELAY_MS", 3000)),
            enroll_delay: Duration::from_millis(parsed(&lookup, "WARDEN_ENROLL_DELAY_MS", 2000)),
            match_threshold: threshold(&lookup, "WARDEN_MATCH_THRESHOLD", 0.87),
            fallback_threshold: threshold(&lookup, "WARDEN_FALLBACK_THRESHOLD", 0.85),
            log_page_size: parsed(&lookup, "WARDEN_LOG_PAGE_SIZE", 10),
            log_capacity: parsed(&lookup, "WARDEN_LOG_CAPACITY", 10_000),
            activity_capacity: parsed(&lookup, "WARDEN_ACTIVITY_CAPACITY", 10),
            summary_interval_secs: parsed(&lookup, "WARDEN_SUMMARY_INTERVAL_SECS", 900),
            system_bus: lookup("WARDEN_SYSTEM_BUS")
                .map(|v| v != "0")
                .unwrap_or(false),
        }
    }

    /// Officer, prison and default location for log entries.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            officer: self.officer.clone(),
            prison: self.prison.clone(),
            location: self.location.clone(),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.match_threshold, self.fallback_threshold)
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable config value");
            default
        }),
        None => default,
    }
}

/// A similarity bound; must be a finite value in `[0, 1]`.
fn threshold<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    let value = parsed(lookup, key, default);
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        value
    } else {
        tracing::warn!(key, value, "threshold outside [0, 1], using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.officer, "Officer Kwabena");
        assert_eq!(c.prison, "Kumasi Prison");
        assert_eq!(c.location, "Main Gate");
        assert_eq!(c.verify_delay, Duration::from_secs(3));
        assert_eq!(c.enroll_delay, Duration::from_secs(2));
        assert_eq!(c.log_page_size, 10);
        assert_eq!(c.log_capacity, 10_000);
        assert_eq!(c.activity_capacity, 10);
        assert_eq!(c.summary_interval_secs, 900);
        assert!(!c.system_bus);
        assert_eq!(c.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("WARDEN_OFFICER", "Officer Johnson"),
            ("WARDEN_VERIFY_DELAY_MS", "0"),
            ("WARDEN_MATCH_THRESHOLD", "0.9"),
            ("WARDEN_SYSTEM_BUS", "1"),
        ]);
        assert_eq!(c.officer, "Officer Johnson");
        assert_eq!(c.verify_delay, Duration::ZERO);
        assert_eq!(c.thresholds().match_above.thousandths(), 900);
        assert!(c.system_bus);
    }

    #[test]
    fn test_bad_values_fall_back_to_defaults() {
        let c = config(&[
            ("WARDEN_LOG_PAGE_SIZE", "ten"),
            ("WARDEN_PRISON", "   "),
        ]);
        assert_eq!(c.log_page_size, 10);
        assert_eq!(c.prison, "Kumasi Prison");
    }

    #[test]
    fn test_log_capacity_override() {
        let c = config(&[("WARDEN_LOG_CAPACITY", "250")]);
        assert_eq!(c.log_capacity, 250);
    }

    #[test]
    fn test_invalid_thresholds_fall_back_to_defaults() {
        let c = config(&[
            ("WARDEN_MATCH_THRESHOLD", "NaN"),
            ("WARDEN_FALLBACK_THRESHOLD", "1.5"),
        ]);
        assert_eq!(c.match_threshold, 0.87);
        assert_eq!(c.fallback_threshold, 0.85);

        let c = config(&[
            ("WARDEN_MATCH_THRESHOLD", "inf"),
            ("WARDEN_FALLBACK_THRESHOLD", "-0.2"),
        ]);
        assert_eq!(c.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_checkpoint_uses_operator_fields() {
        let c = config(&[("WARDEN_LOCATION", "Visitor Center")]);
        let cp = c.checkpoint();
        assert_eq!(cp.location, "Visitor Center");
        assert_eq!(cp.officer, c.officer);
    }
}
