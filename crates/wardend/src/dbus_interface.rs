use crate::config::Config;
use crate::engine::{EngineError, EngineHandle};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use warden_core::{CaptureMethod, EnrollmentRequest, LogQuery, RosterError};
use zbus::interface;

pub const BUS_NAME: &str = "org.freedesktop.Warden1";
pub const OBJECT_PATH: &str = "/org/freedesktop/Warden1";

/// D-Bus interface for the Warden verification daemon.
///
/// Bus name: org.freedesktop.Warden1
/// Object path: /org/freedesktop/Warden1
///
/// Every method returns a JSON document.
pub struct WardenService {
    engine: EngineHandle,
    verify_delay: Duration,
    enroll_delay: Duration,
    officer: String,
    prison: String,
    location: String,
    match_threshold: f64,
    fallback_threshold: f64,
}

impl WardenService {
    pub fn new(engine: EngineHandle, config: &Config) -> Self {
        Self {
            engine,
            verify_delay: config.verify_delay,
            enroll_delay: config.enroll_delay,
            officer: config.officer.clone(),
            prison: config.prison.clone(),
            location: config.location.clone(),
            match_threshold: config.match_threshold,
            fallback_threshold: config.fallback_threshold,
        }
    }
}

#[interface(name = "org.freedesktop.Warden1")]
impl WardenService {
    /// Run a simulated verification. An empty `location` uses the configured default.
    async fn verify(&self, method: &str, location: &str) -> zbus::fdo::Result<String> {
        let method: CaptureMethod = method.parse().map_err(zbus::fdo::Error::InvalidArgs)?;
        let location = Some(location.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        tracing::info!(%method, ?location, "verify requested");

        tokio::time::sleep(self.verify_delay).await;
        let result = self.engine.verify(method, location).await.map_err(to_fdo)?;
        to_json(&result)
    }

    /// Enroll a new inmate from a JSON `EnrollmentRequest`.
    async fn enroll(&self, request: &str) -> zbus::fdo::Result<String> {
        let request: EnrollmentRequest = serde_json::from_str(request)
            .map_err(|e| zbus::fdo::Error::InvalidArgs(format!("malformed enrollment: {e}")))?;
        request
            .validate()
            .map_err(|e| to_fdo(EngineError::Roster(e)))?;
        if !Path::new(&request.image).exists() {
            return Err(zbus::fdo::Error::InvalidArgs(format!(
                "image not found: {}",
                request.image
            )));
        }
        tracing::info!(inmate_id = %request.inmate_id, "enroll requested");

        tokio::time::sleep(self.enroll_delay).await;
        let record = self.engine.enroll(request).await.map_err(to_fdo)?;
        to_json(&record)
    }

    /// List every inmate on the roster.
    async fn list_inmates(&self) -> zbus::fdo::Result<String> {
        let inmates = self.engine.list_inmates().await.map_err(to_fdo)?;
        to_json(&inmates)
    }

    /// Query the verification log with a JSON `LogQuery`; an empty string means defaults.
    async fn logs(&self, query: &str) -> zbus::fdo::Result<String> {
        let query: LogQuery = if query.trim().is_empty() {
            LogQuery::default()
        } else {
            serde_json::from_str(query)
                .map_err(|e| zbus::fdo::Error::InvalidArgs(format!("malformed log query: {e}")))?
        };
        let page = self.engine.logs(query).await.map_err(to_fdo)?;
        to_json(&page)
    }

    /// Profile and verification history for one inmate.
    async fn history(&self, inmate_id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(inmate_id, "history requested");
        let history = self
            .engine
            .history(inmate_id.to_string())
            .await
            .map_err(to_fdo)?;
        to_json(&history)
    }

    /// Recent activity, newest first.
    async fn activity(&self) -> zbus::fdo::Result<String> {
        let items = self.engine.activity().await.map_err(to_fdo)?;
        to_json(&items)
    }

    /// Roster distributions and per-prison, per-month verification counts.
    async fn analytics(&self) -> zbus::fdo::Result<String> {
        let analytics = self.engine.analytics().await.map_err(to_fdo)?;
        to_json(&analytics)
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let stats = self.engine.stats().await.map_err(to_fdo)?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "officer": self.officer,
            "prison": self.prison,
            "location": self.location,
            "match_threshold": self.match_threshold,
            "fallback_threshold": self.fallback_threshold,
            "stats": stats,
        })
        .to_string())
    }
}

fn to_json<T: Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

fn to_fdo(err: EngineError) -> zbus::fdo::Error {
    match err {
        EngineError::Roster(RosterError::UnknownInmate(id)) => {
            zbus::fdo::Error::FileNotFound(format!("unknown inmate: {id}"))
        }
        EngineError::Roster(e) => zbus::fdo::Error::InvalidArgs(e.to_string()),
        other => {
            tracing::error!(error = %other, "engine failure");
            zbus::fdo::Error::Failed(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spawn_engine;
    use warden_core::{Analytics, InmateRecord, LogPage};

    fn service() -> WardenService {
        let config = Config::from_lookup(|key| match key {
            "WARDEN_VERIFY_DELAY_MS" | "WARDEN_ENROLL_DELAY_MS" => Some("0".into()),
            _ => None,
        });
        let engine = spawn_engine(&config).unwrap();
        WardenService::new(engine, &config)
    }

    fn enrollment_json(image: &str) -> String {
        serde_json::json!({
            "name": "Ama Owusu",
            "inmate_id": "INM-2024-210",
            "age": 29,
            "crime": "Theft",
            "legal_status": "convicted",
            "sentence": "2 years",
            "prison": "Kumasi Prison",
            "image": image,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_enroll_missing_image_is_invalid_args() {
        let svc = service();
        let err = svc
            .enroll(&enrollment_json("/nonexistent/ama.jpg"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, zbus::fdo::Error::InvalidArgs(ref m) if m.contains("image not found"))
        );
        let inmates: Vec<InmateRecord> =
            serde_json::from_str(&svc.list_inmates().await.unwrap()).unwrap();
        assert_eq!(inmates.len(), 4);
    }

    #[tokio::test]
    async fn test_enroll_with_existing_image() {
        let svc = service();
        let image = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        let raw = svc.enroll(&enrollment_json(image)).await.unwrap();
        let record: InmateRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.inmate_id, "INM-2024-210");
        assert!(record.enrolled_at.is_some());
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_args() {
        let svc = service();
        let err = svc.enroll("{not json").await.unwrap_err();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(_)));
        let err = svc.logs("[1, 2").await.unwrap_err();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn test_unknown_method_is_invalid_args() {
        let err = service().verify("fax", "").await.unwrap_err();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn test_blank_location_uses_configured_default() {
        let svc = service();
        svc.verify("live-camera", "   ").await.unwrap();
        svc.verify("upload", "Workshop").await.unwrap();

        let page: LogPage = serde_json::from_str(&svc.logs("").await.unwrap()).unwrap();
        assert_eq!(page.entries[0].location, "Workshop");
        assert_eq!(page.entries[1].location, "Main Gate");
    }

    #[tokio::test]
    async fn test_empty_logs_query_uses_defaults() {
        let svc = service();
        let page: LogPage = serde_json::from_str(&svc.logs("  ").await.unwrap()).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_records, 0);
        assert!(page.entries.is_empty());
    }

    #[tokio::test]
    async fn test_analytics_and_status_are_json() {
        let svc = service();
        svc.verify("live-camera", "").await.unwrap();

        let analytics: Analytics = serde_json::from_str(&svc.analytics().await.unwrap()).unwrap();
        assert_eq!(analytics.prisons[0].name, "Kumasi Prison");
        assert_eq!(analytics.prisons[0].value, 1);

        let status: serde_json::Value = serde_json::from_str(&svc.status().await.unwrap()).unwrap();
        assert_eq!(status["stats"]["total_verifications"], 1);
        assert_eq!(status["location"], "Main Gate");
    }

    #[test]
    fn test_unknown_inmate_maps_to_file_not_found() {
        let err = to_fdo(EngineError::Roster(RosterError::UnknownInmate("X".into())));
        assert!(matches!(err, zbus::fdo::Error::FileNotFound(_)));
    }

    #[test]
    fn test_validation_maps_to_invalid_args() {
        let err = to_fdo(EngineError::Roster(RosterError::MissingField("name")));
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(ref m) if m.contains("name")));
    }

    #[test]
    fn test_closed_engine_maps_to_failed() {
        assert!(matches!(
            to_fdo(EngineError::ChannelClosed),
            zbus::fdo::Error::Failed(_)
        ));
    }
}
