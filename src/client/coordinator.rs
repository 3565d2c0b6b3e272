//! Refresh coordinator - single-flight credential refresh on 401
//!
//! Every call goes through [`RefreshCoordinator::execute`]. A 401 on a
//! non-exempt call that has not been retried either starts the one refresh
//! (`Idle` -> `Refreshing`) or, when a refresh is already running, queues a
//! one-shot waiter. When the refresh settles the waiters are notified in
//! enqueue order and every call is replayed once.
//!
//! The state mutex is never held across an `.await`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::{Response, StatusCode};
use tokio::sync::{oneshot, RwLock};

use super::dispatcher::Dispatcher;
use super::error::{ClientError, RefreshError};
use super::request::OutgoingCall;
use crate::auth::TokenStore;
use crate::security::Sanitizer;

/// Callback invoked with the sign-in location once the session has ended
pub type SessionEndedCallback = Box<dyn Fn(&str) + Send + Sync>;

type Waiter = oneshot::Sender<Result<(), RefreshError>>;

/// Observable refresh state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<Waiter>,
}

enum Role<'a> {
    Leader(RefreshGuard<'a>),
    Follower(oneshot::Receiver<Result<(), RefreshError>>),
}

/// Returns the state to `Idle` when the leading refresh ends
///
/// If the leader future is dropped before settling, queued waiters are
/// dropped with it and observe a closed channel.
struct RefreshGuard<'a> {
    state: &'a Mutex<RefreshState>,
    armed: bool,
}

impl RefreshGuard<'_> {
    fn settle(mut self, outcome: &Result<(), RefreshError>) {
        self.armed = false;
        let waiters = drain(self.state);
        tracing::debug!("Refresh settled, notifying {} queued call(s)", waiters.len());
        for waiter in waiters {
            // A closed receiver means that caller went away; nothing to do
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let abandoned = drain(self.state);
            tracing::warn!(
                "Credential refresh abandoned with {} queued call(s)",
                abandoned.len()
            );
        }
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn drain(state: &Mutex<RefreshState>) -> VecDeque<Waiter> {
    let mut state = lock(state);
    state.refreshing = false;
    std::mem::take(&mut state.waiters)
}

/// Wraps dispatched calls with detection of authentication failure,
/// serialized refresh and a single replay
pub struct RefreshCoordinator {
    dispatcher: Dispatcher,
    tokens: Arc<TokenStore>,
    state: Mutex<RefreshState>,
    on_session_ended: RwLock<Option<SessionEndedCallback>>,
    refresh_count: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(dispatcher: Dispatcher, tokens: Arc<TokenStore>) -> Self {
        Self {
            dispatcher,
            tokens,
            state: Mutex::new(RefreshState::default()),
            on_session_ended: RwLock::new(None),
            refresh_count: AtomicU64::new(0),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Current refresh phase
    pub fn phase(&self) -> RefreshPhase {
        if lock(&self.state).refreshing {
            RefreshPhase::Refreshing
        } else {
            RefreshPhase::Idle
        }
    }

    /// Number of calls waiting on the in-flight refresh
    pub fn queued(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Number of refresh calls issued since creation
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Sets the callback invoked when the session ends
    pub async fn on_session_ended<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.on_session_ended.write().await = Some(Box::new(callback));
    }

    /// Sends a call, refreshing credentials and replaying once on 401
    ///
    /// Success responses pass through unchanged. Any other status is
    /// returned as [`ClientError::Http`]; a 401 is only intercepted when the
    /// call is neither exempt nor already retried.
    pub async fn execute(&self, mut call: OutgoingCall) -> Result<Response, ClientError> {
        loop {
            let response = self.dispatcher.send(&call).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status != StatusCode::UNAUTHORIZED
                || call.is_retried()
                || self.dispatcher.config().is_exempt(call.path())
            {
                return Err(http_error(response).await);
            }

            call.mark_retried();
            self.await_fresh_credential(call.path()).await?;
        }
    }

    async fn await_fresh_credential(&self, path: &str) -> Result<(), ClientError> {
        let role = {
            let mut state = lock(&self.state);
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Role::Follower(rx)
            } else {
                state.refreshing = true;
                Role::Leader(RefreshGuard {
                    state: &self.state,
                    armed: true,
                })
            }
        };

        match role {
            Role::Follower(rx) => {
                tracing::debug!("Queued {} behind in-flight refresh", path);
                match rx.await {
                    Ok(outcome) => outcome.map_err(ClientError::from),
                    Err(_) => Err(ClientError::RefreshAbandoned),
                }
            }
            Role::Leader(guard) => {
                tracing::info!("Access credential rejected on {}, refreshing", path);
                let outcome = self.refresh_credentials().await;
                guard.settle(&outcome);

                if let Err(e) = &outcome {
                    self.end_session(e).await;
                }
                outcome.map_err(ClientError::from)
            }
        }
    }

    /// Obtains a new access credential; clears both on failure
    async fn refresh_credentials(&self) -> Result<(), RefreshError> {
        let Some(refresh) = self.tokens.get_refresh() else {
            self.tokens.clear_all();
            return Err(RefreshError::MissingRefreshToken);
        };

        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        match self.dispatcher.refresh_access(&refresh).await {
            Ok(refreshed) => {
                tracing::info!(
                    "Access credential refreshed ({})",
                    Sanitizer::sanitize_token(&refreshed.access)
                );
                self.tokens.set_access(Some(refreshed.access.as_str()));
                if let Some(rotated) = refreshed.refresh {
                    self.tokens.set_refresh(Some(rotated.as_str()));
                }
                Ok(())
            }
            Err(e) => {
                self.tokens.clear_all();
                Err(e)
            }
        }
    }

    async fn end_session(&self, reason: &RefreshError) {
        let redirect = &self.dispatcher.config().signin_redirect;
        tracing::warn!("Session ended ({}), redirecting to {}", reason, redirect);
        if let Some(ref callback) = *self.on_session_ended.read().await {
            callback(redirect);
        }
    }
}

async fn http_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Http { status, body }
}
