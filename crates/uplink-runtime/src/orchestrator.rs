//! The orchestrator: public API over the session lifecycle.
//!
//! Login is resolved synchronously within `create_session` (the caller
//! learns immediately whether a second factor is needed); uploads always
//! run as a background task. The orchestrator owns the reaper task and is
//! responsible for joining it on shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use uplink_agent::{AutomationAgent, LoginOutcome, SecondFactorOutcome};
use uplink_core::{Credentials, SessionId, SessionState, UploadResult, WorkItem};

use crate::errors::{OrchestratorError, SessionFailure};
use crate::reaper;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionView};

/// Orchestrator tuning knobs.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Cap on concurrently live sessions.
    pub max_concurrent_sessions: usize,
    /// Overall session lifetime.
    pub session_timeout: Duration,
    /// How long a session may sit in `awaiting_2fa`.
    pub second_factor_wait: Duration,
    /// Interval between reaper sweeps.
    pub reaper_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 10,
            session_timeout: Duration::from_secs(600),
            second_factor_wait: Duration::from_secs(90),
            reaper_interval: Duration::from_secs(30),
        }
    }
}

/// Reply to a second-factor submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondFactorReply {
    /// Whether the code was accepted.
    pub success: bool,
    /// Session state after the submission.
    pub state: SessionState,
    /// Human-readable outcome, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// What went wrong, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct ReaperHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Drives upload sessions from creation to eviction.
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    agent: Arc<dyn AutomationAgent>,
    config: OrchestratorConfig,
    reaper: Mutex<Option<ReaperHandle>>,
}

impl Orchestrator {
    /// Create an orchestrator over the given agent. The reaper is not
    /// started until [`start_reaper`](Self::start_reaper).
    pub fn new(agent: Arc<dyn AutomationAgent>, config: OrchestratorConfig) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(SessionRegistry::new(config.max_concurrent_sessions)),
            agent,
            config,
            reaper: Mutex::new(None),
        })
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// The orchestrator's configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start the background reaper. Idempotent.
    pub fn start_reaper(&self) {
        let mut slot = self.reaper.lock();
        if slot.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let task = reaper::spawn(
            Arc::clone(&self.registry),
            self.config.clone(),
            token.clone(),
        );
        *slot = Some(ReaperHandle { token, task });
    }

    /// Create a session and resolve its login synchronously.
    ///
    /// On return the session is either suspended in `awaiting_2fa`,
    /// uploading in the background, or already in `error` with the cause
    /// recorded in the view. The only synchronous error is
    /// [`OrchestratorError::CapacityExceeded`], raised before any agent
    /// resources are allocated.
    #[instrument(skip_all, fields(items = work_items.len()))]
    pub async fn create_session(
        self: &Arc<Self>,
        credentials: Credentials,
        work_items: Vec<WorkItem>,
        scratch_dir: Option<PathBuf>,
    ) -> Result<SessionView, OrchestratorError> {
        let session = Arc::new(Session::new(
            credentials.username.clone(),
            work_items,
            scratch_dir,
        ));
        self.registry.insert(Arc::clone(&session))?;
        info!(
            session_id = %session.id(),
            owner = session.owner(),
            items = session.total_items(),
            "session created"
        );

        match self.agent.initialize().await {
            Ok(handle) => session.install_agent(handle).await,
            Err(err) => {
                let _ = session.fail(&SessionFailure::Initialization(err.to_string()));
                // No handle was installed; this reclaims the scratch dir.
                session.teardown().await;
                return Ok(session.snapshot(self.config.session_timeout));
            }
        }

        if session.transition(SessionState::Login) {
            session.set_message("Logging in...");
            match session.agent_login(&credentials).await {
                Some(Ok(LoginOutcome::Authenticated)) => {
                    self.begin_uploads(&session);
                }
                Some(Ok(LoginOutcome::NeedsSecondFactor)) => {
                    if session.transition(SessionState::Awaiting2fa) {
                        session.set_message(
                            "Two-factor authentication required. Enter the code from your device.",
                        );
                    }
                }
                Some(Err(err)) => {
                    if session.fail(&SessionFailure::Authentication(err.to_string())) {
                        session.release_agent().await;
                    }
                }
                // Handle already released: the session was cancelled while
                // login was queued. Nothing left to do.
                None => {}
            }
        }

        Ok(session.snapshot(self.config.session_timeout))
    }

    /// Submit a second-factor code for a suspended session.
    ///
    /// An invalid code leaves the session in `awaiting_2fa` for a retry; a
    /// stale session (expired or already evicted) is reported as not found
    /// and never revived.
    #[instrument(skip(self, code), fields(session_id = %id))]
    pub async fn submit_second_factor(
        self: &Arc<Self>,
        id: &SessionId,
        code: &str,
    ) -> Result<SecondFactorReply, OrchestratorError> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;
        if session.is_expired(self.config.session_timeout) {
            // The reaper owns teardown of expired sessions.
            return Err(OrchestratorError::NotFound(id.to_string()));
        }

        let state = session.state();
        if state != SessionState::Awaiting2fa {
            return Ok(SecondFactorReply {
                success: false,
                state,
                message: None,
                error: Some(format!(
                    "session is not awaiting a second factor (state: {state})"
                )),
            });
        }
        if session.second_factor_expired(self.config.second_factor_wait) {
            if session.fail(&SessionFailure::SecondFactorTimeout) {
                session.release_agent().await;
            }
            return Ok(SecondFactorReply {
                success: false,
                state: session.state(),
                message: None,
                error: Some(SessionFailure::SecondFactorTimeout.to_string()),
            });
        }

        match session.agent_submit_code(code).await {
            Some(Ok(SecondFactorOutcome::Authenticated)) => {
                // Concurrent submits race to this transition; only the
                // winner starts the upload task.
                self.begin_uploads(&session);
                Ok(SecondFactorReply {
                    success: true,
                    state: session.state(),
                    message: Some("Authentication complete. Starting upload...".into()),
                    error: None,
                })
            }
            Some(Ok(SecondFactorOutcome::InvalidCode)) => {
                debug!(session_id = %id, "second factor code rejected");
                Ok(SecondFactorReply {
                    success: false,
                    state: session.state(),
                    message: None,
                    error: Some("invalid code, please try again".into()),
                })
            }
            Some(Err(err)) => {
                if session.fail(&SessionFailure::Authentication(err.to_string())) {
                    session.release_agent().await;
                }
                Ok(SecondFactorReply {
                    success: false,
                    state: session.state(),
                    message: None,
                    error: Some(err.to_string()),
                })
            }
            None => Ok(SecondFactorReply {
                success: false,
                state: session.state(),
                message: None,
                error: Some("session is no longer active".into()),
            }),
        }
    }

    /// Point-in-time status of a session.
    pub fn get_status(&self, id: &SessionId) -> Result<SessionView, OrchestratorError> {
        self.registry
            .get(id)
            .map(|session| session.snapshot(self.config.session_timeout))
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// Cancel a session: force it terminal, tear down its resources, and
    /// remove it from the registry. Waits for any in-flight agent call to
    /// return before resources are released. Returns `false` when no such
    /// session is live (including a second cancel of the same session).
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn cancel(&self, id: &SessionId) -> bool {
        let Some(session) = self.registry.get(id) else {
            return false;
        };
        let _ = session.mark_cancelled();
        session.teardown().await;
        let _ = self.registry.remove(id);
        info!(session_id = %id, "session cancelled");
        true
    }

    /// Stop the reaper, then cancel and tear down every remaining session.
    pub async fn shutdown(&self) {
        let handle = self.reaper.lock().take();
        if let Some(ReaperHandle { token, task }) = handle {
            token.cancel();
            if let Err(err) = task.await {
                warn!(%err, "reaper task join failed");
            }
        }

        let sessions = self.registry.drain();
        info!(count = sessions.len(), "draining sessions for shutdown");
        for session in sessions {
            let _ = session.mark_cancelled();
            session.teardown().await;
        }
    }

    /// Move an authenticated session into `uploading` and spawn its upload
    /// task. A no-op if another caller (or a cancellation) won the race.
    fn begin_uploads(self: &Arc<Self>, session: &Arc<Session>) {
        if !session.transition(SessionState::Authenticated) {
            return;
        }
        session.set_message("Login successful. Starting upload...");
        let this = Arc::clone(self);
        let session = Arc::clone(session);
        drop(tokio::spawn(async move {
            this.run_uploads(session).await;
        }));
    }

    /// Upload work items strictly in order, one at a time. Per-item
    /// failures are recorded and the run continues; the loop stops early
    /// only when the session leaves `uploading` (cancelled, failed, or
    /// evicted underneath it).
    async fn run_uploads(&self, session: Arc<Session>) {
        if !session.transition(SessionState::Uploading) {
            return;
        }
        let total = session.total_items();

        while let Some((index, item)) = session.next_item() {
            session.set_message(format!(
                "Uploading {} ({}/{total})",
                item.filename,
                index + 1
            ));
            match session.agent_upload(&item).await {
                Some(Ok(url)) => {
                    debug!(
                        session_id = %session.id(),
                        file = %item.filename,
                        "item uploaded"
                    );
                    session.push_result(UploadResult::ok(&item.filename, url));
                }
                Some(Err(err)) => {
                    warn!(
                        session_id = %session.id(),
                        file = %item.filename,
                        category = err.category(),
                        %err,
                        "item upload failed"
                    );
                    session.push_result(UploadResult::failed(&item.filename, err.to_string()));
                }
                // Handle released underneath us: cancelled or evicted.
                None => return,
            }
        }

        let completed = session
            .snapshot(self.config.session_timeout)
            .completed_files;
        if session.transition(SessionState::Done) {
            session.set_message(format!(
                "Upload complete! {completed}/{total} files uploaded successfully."
            ));
            info!(
                session_id = %session.id(),
                completed,
                total,
                "session done"
            );
            // Results stay readable until eviction; the browser-side
            // resources are no longer needed.
            session.release_agent().await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
