//! Polling agent - Periodically fetches an endpoint for updates
//!
//! Requests go through [`AuthClient`], so an expired access credential is
//! refreshed like any other call. When the session ends the agent stops and
//! reports [`PollStatus::SessionEnded`].

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::client::{AuthClient, ClientError, OutgoingCall};

/// Errors from the polling agent
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Polling agent is already running")]
    AlreadyRunning,

    #[error("Poll failed: {0}")]
    Fetch(#[from] ClientError),
}

/// Lifecycle of a polling agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Never started
    Idle,
    Running,
    /// Stopped on request
    Stopped,
    /// Stopped because the credentials could not be refreshed
    SessionEnded(String),
}

impl PollStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, PollStatus::Running)
    }

    pub fn is_session_ended(&self) -> bool {
        matches!(self, PollStatus::SessionEnded(_))
    }
}

/// Callback type for when a new payload is fetched
pub type PollCallback = Box<dyn Fn(&PollSnapshot) + Send + Sync>;

/// A fetched payload and when it arrived
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

/// Configuration for the polling agent
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Interval between polls
    pub interval: Duration,
    /// Whether to poll immediately on start
    pub fetch_on_start: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            fetch_on_start: true,
        }
    }
}

impl PollConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            fetch_on_start: true,
        }
    }
}

/// Status and the cancellation token of the current run, changed together
struct Lifecycle {
    status: PollStatus,
    cancel: CancellationToken,
}

/// Agent that polls one API path at a fixed interval
pub struct PollingAgent {
    client: AuthClient,
    path: String,
    config: PollConfig,
    lifecycle: Mutex<Lifecycle>,
    latest: RwLock<Option<PollSnapshot>>,
    on_update: RwLock<Option<PollCallback>>,
}

impl PollingAgent {
    pub fn new(client: AuthClient, path: impl Into<String>, config: PollConfig) -> Self {
        Self {
            client,
            path: path.into(),
            config,
            lifecycle: Mutex::new(Lifecycle {
                status: PollStatus::Idle,
                cancel: CancellationToken::new(),
            }),
            latest: RwLock::new(None),
            on_update: RwLock::new(None),
        }
    }

    /// Polls `path` at the client's configured default interval
    pub fn with_default_interval(client: AuthClient, path: impl Into<String>) -> Self {
        let interval = client.config().poll_interval();
        Self::new(client, path, PollConfig::with_interval(interval))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sets a callback to be called when a payload is fetched
    pub async fn on_update<F>(&self, callback: F)
    where
        F: Fn(&PollSnapshot) + Send + Sync + 'static,
    {
        *self.on_update.write().await = Some(Box::new(callback));
    }

    /// Most recent successfully fetched payload
    pub async fn latest(&self) -> Option<PollSnapshot> {
        self.latest.read().await.clone()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current status; never blocks on a running poll
    pub fn status(&self) -> PollStatus {
        self.lifecycle().status.clone()
    }

    /// Fetches once outside the loop, recording the snapshot
    pub async fn poll_now(&self) -> Result<PollSnapshot, PollError> {
        let payload: serde_json::Value = self
            .client
            .send_json(OutgoingCall::get(self.path.as_str()))
            .await?;

        let snapshot = PollSnapshot {
            payload,
            fetched_at: Utc::now(),
        };
        tracing::debug!("Polled {} at {}", self.path, snapshot.fetched_at);

        if let Some(ref callback) = *self.on_update.read().await {
            callback(&snapshot);
        }
        *self.latest.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Polls once, logging failures; false once the session has ended
    async fn tick(&self) -> bool {
        match self.poll_now().await {
            Ok(_) => true,
            Err(PollError::Fetch(e @ ClientError::SessionEnded(_))) => {
                tracing::warn!("Stopping poll of {}: {}", self.path, e);
                self.lifecycle().status = PollStatus::SessionEnded(e.to_string());
                false
            }
            Err(e) => {
                tracing::warn!("Failed to poll {}: {}", self.path, e);
                true
            }
        }
    }

    /// Polls until [`stop`](Self::stop) is called or the session ends
    pub async fn run(&self) -> Result<(), PollError> {
        let cancel = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.status.is_running() {
                return Err(PollError::AlreadyRunning);
            }
            // Fresh token so a previous stop() does not cancel this run
            lifecycle.cancel = CancellationToken::new();
            lifecycle.status = PollStatus::Running;
            lifecycle.cancel.clone()
        };

        tracing::info!("Polling {} every {:?}", self.path, self.config.interval);

        if self.config.fetch_on_start && !self.tick().await {
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    if !self.tick().await {
                        return Ok(());
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Polling of {} cancelled", self.path);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Cancels a running loop; a no-op otherwise
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.status.is_running() {
            lifecycle.cancel.cancel();
            lifecycle.status = PollStatus::Stopped;
        }
    }
}
