use crate::config::Config;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use warden_core::{
    ActivityFeed, ActivityItem, Analytics, CaptureMethod, Checkpoint, EnrollmentRequest,
    InmateHistory, InmateRecord, LogEntry, LogPage, LogQuery, OutcomeSimulator, Roster,
    RosterError, Stats, VerificationLog, VerificationResult, Verifier,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Verify {
        method: CaptureMethod,
        location: Option<String>,
        reply: oneshot::Sender<VerificationResult>,
    },
    Enroll {
        request: EnrollmentRequest,
        reply: oneshot::Sender<Result<InmateRecord, RosterError>>,
    },
    ListInmates {
        reply: oneshot::Sender<Vec<InmateRecord>>,
    },
    Logs {
        query: LogQuery,
        reply: oneshot::Sender<LogPage>,
    },
    History {
        inmate_id: String,
        reply: oneshot::Sender<Result<InmateHistory, RosterError>>,
    },
    Activity {
        reply: oneshot::Sender<Vec<ActivityItem>>,
    },
    Stats {
        reply: oneshot::Sender<Stats>,
    },
    Analytics {
        reply: oneshot::Sender<Analytics>,
    },
    PostSummary,
}

/// Everything the daemon knows, owned by the engine thread.
struct EngineState {
    verifier: Box<dyn Verifier + Send>,
    checkpoint: Checkpoint,
    roster: Roster,
    log: VerificationLog,
    feed: ActivityFeed,
}

impl EngineState {
    fn new(verifier: Box<dyn Verifier + Send>, config: &Config) -> Self {
        Self {
            verifier,
            checkpoint: config.checkpoint(),
            roster: Roster::default(),
            log: VerificationLog::new(config.log_page_size, config.log_capacity),
            feed: ActivityFeed::new(config.activity_capacity),
        }
    }

    fn handle(&mut self, req: EngineRequest) {
        match req {
            EngineRequest::Verify {
                method,
                location,
                reply,
            } => {
                let _ = reply.send(self.verify(method, location));
            }
            EngineRequest::Enroll { request, reply } => {
                let _ = reply.send(self.enroll(request));
            }
            EngineRequest::ListInmates { reply } => {
                let _ = reply.send(self.roster.list().to_vec());
            }
            EngineRequest::Logs { query, reply } => {
                let _ = reply.send(self.log.query(&query, Utc::now()));
            }
            EngineRequest::History { inmate_id, reply } => {
                let history = self
                    .roster
                    .lookup(&inmate_id)
                    .map(|inmate| self.log.history(inmate));
                let _ = reply.send(history);
            }
            EngineRequest::Activity { reply } => {
                let _ = reply.send(self.feed.items());
            }
            EngineRequest::Stats { reply } => {
                let _ = reply.send(self.log.stats(self.roster.len()));
            }
            EngineRequest::Analytics { reply } => {
                let _ = reply.send(Analytics::compute(self.roster.list(), &self.log));
            }
            EngineRequest::PostSummary => {
                let now = Utc::now();
                let successes = self.log.successes_on_day(now);
                tracing::debug!(successes, "posting daily summary");
                self.feed.push(ActivityItem::daily_summary(successes, now));
            }
        }
    }

    fn verify(&mut self, method: CaptureMethod, location: Option<String>) -> VerificationResult {
        let now = Utc::now();
        let mut checkpoint = self.checkpoint.clone();
        if let Some(location) = location {
            checkpoint.location = location;
        }

        let result = self.verifier.verify(now);
        if result.success {
            tracing::info!(
                inmate_id = %result.inmate_id,
                confidence = result.confidence,
                fallback = result.used_fallback,
                location = %checkpoint.location,
                "verify: match"
            );
        } else {
            tracing::info!(
                confidence = result.confidence,
                fallback = result.used_fallback,
                location = %checkpoint.location,
                "verify: no match"
            );
        }

        let entry = LogEntry::from_result(&result, &checkpoint, method, now);
        self.log.record(entry);
        self.feed.push(ActivityItem::verification(&result, &checkpoint, now));
        result
    }

    fn enroll(&mut self, request: EnrollmentRequest) -> Result<InmateRecord, RosterError> {
        let now = Utc::now();
        let record = self.roster.enroll(request, now)?;
        self.feed.push(ActivityItem::enrollment(
            &record,
            &self.checkpoint.officer,
            now,
        ));
        Ok(record)
    }
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Run one simulated verification and record it in the log and feed.
    pub async fn verify(
        &self,
        method: CaptureMethod,
        location: Option<String>,
    ) -> Result<VerificationResult, EngineError> {
        self.call(|reply| EngineRequest::Verify {
            method,
            location,
            reply,
        })
        .await
    }

    pub async fn enroll(&self, request: EnrollmentRequest) -> Result<InmateRecord, EngineError> {
        Ok(self
            .call(|reply| EngineRequest::Enroll { request, reply })
            .await??)
    }

    pub async fn list_inmates(&self) -> Result<Vec<InmateRecord>, EngineError> {
        self.call(|reply| EngineRequest::ListInmates { reply }).await
    }

    pub async fn logs(&self, query: LogQuery) -> Result<LogPage, EngineError> {
        self.call(|reply| EngineRequest::Logs { query, reply }).await
    }

    pub async fn history(&self, inmate_id: String) -> Result<InmateHistory, EngineError> {
        Ok(self
            .call(|reply| EngineRequest::History { inmate_id, reply })
            .await??)
    }

    pub async fn activity(&self) -> Result<Vec<ActivityItem>, EngineError> {
        self.call(|reply| EngineRequest::Activity { reply }).await
    }

    pub async fn stats(&self) -> Result<Stats, EngineError> {
        self.call(|reply| EngineRequest::Stats { reply }).await
    }

    pub async fn analytics(&self) -> Result<Analytics, EngineError> {
        self.call(|reply| EngineRequest::Analytics { reply }).await
    }

    /// Queue a daily-summary item on the activity feed.
    pub async fn post_summary(&self) -> Result<(), EngineError> {
        self.tx
            .send(EngineRequest::PostSummary)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine with an entropy-seeded outcome simulator.
pub fn spawn_engine(config: &Config) -> Result<EngineHandle, EngineError> {
    let simulator = OutcomeSimulator::new(StdRng::from_entropy(), config.thresholds());
    tracing::info!(
        match_threshold = config.match_threshold,
        fallback_threshold = config.fallback_threshold,
        "outcome simulator ready"
    );
    spawn_with_verifier(Box::new(simulator), config)
}

/// Spawn the engine on a dedicated OS thread around the given verifier.
pub fn spawn_with_verifier(
    verifier: Box<dyn Verifier + Send>,
    config: &Config,
) -> Result<EngineHandle, EngineError> {
    let mut state = EngineState::new(verifier, config);
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("warden-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                state.handle(req);
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}
