//! A single upload session: immutable identity plus guarded mutable state.
//!
//! Lock discipline: `inner` (a `parking_lot::Mutex`) guards the small
//! mutable core and is only ever held for field reads/writes, never across
//! an await. The agent handle sits behind a `tokio::sync::Mutex` because
//! agent calls are long-lived awaits; holding that lock is what "one
//! in-flight call per session" means.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use uplink_agent::{AgentError, AgentHandle, LoginOutcome, SecondFactorOutcome};
use uplink_core::{Credentials, SessionId, SessionState, UploadResult, WorkItem};

use crate::errors::SessionFailure;

/// Mutable session core, guarded by [`Session::inner`].
struct SessionInner {
    state: SessionState,
    /// Index of the next work item to upload; equals `results.len()`.
    cursor: usize,
    results: Vec<UploadResult>,
    message: Option<String>,
    last_error: Option<String>,
    /// Set on entering `awaiting_2fa`, cleared on leaving it.
    awaiting_since: Option<Instant>,
}

/// A live upload session.
pub struct Session {
    id: SessionId,
    owner: String,
    created_at: DateTime<Utc>,
    started: Instant,
    work_items: Vec<WorkItem>,
    scratch_dir: Option<PathBuf>,
    inner: Mutex<SessionInner>,
    agent: tokio::sync::Mutex<Option<Box<dyn AgentHandle>>>,
}

impl Session {
    pub(crate) fn new(
        owner: impl Into<String>,
        work_items: Vec<WorkItem>,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            owner: owner.into(),
            created_at: Utc::now(),
            started: Instant::now(),
            work_items,
            scratch_dir,
            inner: Mutex::new(SessionInner {
                state: SessionState::Initializing,
                cursor: 0,
                results: Vec::new(),
                message: None,
                last_error: None,
                awaiting_since: None,
            }),
            agent: tokio::sync::Mutex::new(None),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Username the session was created for.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Number of work items queued at creation.
    pub fn total_items(&self) -> usize {
        self.work_items.len()
    }

    /// Whether the session has outlived the overall timeout.
    pub fn is_expired(&self, session_timeout: Duration) -> bool {
        self.started.elapsed() >= session_timeout
    }

    /// Whether the session has sat in `awaiting_2fa` past the window.
    /// Always `false` outside that state.
    pub fn second_factor_expired(&self, window: Duration) -> bool {
        self.inner
            .lock()
            .awaiting_since
            .is_some_and(|since| since.elapsed() >= window)
    }

    /// Whether the given state transition is part of the lifecycle machine.
    fn allowed(from: SessionState, to: SessionState) -> bool {
        use SessionState as S;
        if from.is_terminal() {
            return false;
        }
        match to {
            S::Error | S::Cancelled => true,
            S::Login => from == S::Initializing,
            S::Awaiting2fa => from == S::Login,
            S::Authenticated => matches!(from, S::Login | S::Awaiting2fa),
            S::Uploading => from == S::Authenticated,
            S::Done => from == S::Uploading,
            S::Initializing => false,
        }
    }

    /// Attempt a state transition. Returns `false` (leaving state untouched)
    /// when the move is not part of the lifecycle machine; in particular,
    /// nothing ever leaves a terminal state, which is how a cancellation
    /// supersedes the outcome of a call still in flight.
    pub(crate) fn transition(&self, to: SessionState) -> bool {
        let mut inner = self.inner.lock();
        if !Self::allowed(inner.state, to) {
            debug!(session_id = %self.id, from = %inner.state, to = %to, "transition refused");
            return false;
        }
        debug!(session_id = %self.id, from = %inner.state, to = %to, "state change");
        inner.awaiting_since =
            (to == SessionState::Awaiting2fa).then(Instant::now);
        inner.state = to;
        true
    }

    /// Move the session to `error`, recording the failure. No-op on an
    /// already-terminal session.
    pub(crate) fn fail(&self, failure: &SessionFailure) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        warn!(
            session_id = %self.id,
            category = failure.category(),
            %failure,
            "session failed"
        );
        inner.state = SessionState::Error;
        inner.last_error = Some(failure.to_string());
        inner.message = None;
        inner.awaiting_since = None;
        true
    }

    /// Move the session to `cancelled`. No-op on an already-terminal
    /// session.
    pub(crate) fn mark_cancelled(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        debug!(session_id = %self.id, from = %inner.state, "state change to cancelled");
        inner.state = SessionState::Cancelled;
        inner.message = Some("Session cancelled".into());
        inner.awaiting_since = None;
        true
    }

    /// Update the progress message. Ignored once the session is terminal so
    /// a racing upload loop cannot overwrite a final message.
    pub(crate) fn set_message(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        if !inner.state.is_terminal() {
            inner.message = Some(message.into());
        }
    }

    /// Record one item's outcome and advance the cursor.
    pub(crate) fn push_result(&self, result: UploadResult) {
        let mut inner = self.inner.lock();
        inner.results.push(result);
        inner.cursor = inner.results.len();
    }

    /// The next item to upload, while the session is still `uploading`.
    pub(crate) fn next_item(&self) -> Option<(usize, WorkItem)> {
        let inner = self.inner.lock();
        if inner.state != SessionState::Uploading {
            return None;
        }
        self.work_items
            .get(inner.cursor)
            .map(|item| (inner.cursor, item.clone()))
    }

    pub(crate) async fn install_agent(&self, handle: Box<dyn AgentHandle>) {
        *self.agent.lock().await = Some(handle);
    }

    /// Run `attempt_login` on the session's agent handle. `None` means the
    /// handle was already released (session cancelled or evicted).
    pub(crate) async fn agent_login(
        &self,
        credentials: &Credentials,
    ) -> Option<Result<LoginOutcome, AgentError>> {
        let mut guard = self.agent.lock().await;
        match guard.as_mut() {
            Some(handle) => Some(handle.attempt_login(credentials).await),
            None => None,
        }
    }

    /// Run `submit_second_factor` on the session's agent handle.
    pub(crate) async fn agent_submit_code(
        &self,
        code: &str,
    ) -> Option<Result<SecondFactorOutcome, AgentError>> {
        let mut guard = self.agent.lock().await;
        match guard.as_mut() {
            Some(handle) => Some(handle.submit_second_factor(code).await),
            None => None,
        }
    }

    /// Run `upload_item` on the session's agent handle.
    pub(crate) async fn agent_upload(
        &self,
        item: &WorkItem,
    ) -> Option<Result<String, AgentError>> {
        let mut guard = self.agent.lock().await;
        match guard.as_mut() {
            Some(handle) => Some(handle.upload_item(item).await),
            None => None,
        }
    }

    /// Tear down the agent handle, if still installed. Taking the handle
    /// out of the `Option` makes this exactly-once; awaiting the mutex is
    /// what delays the release until any in-flight call has returned.
    pub(crate) async fn release_agent(&self) {
        if let Some(mut handle) = self.agent.lock().await.take() {
            handle.teardown().await;
            debug!(session_id = %self.id, "agent handle released");
        }
    }

    /// Full resource teardown: agent handle plus the session's scratch
    /// directory. Results stay readable afterwards.
    pub(crate) async fn teardown(&self) {
        self.release_agent().await;
        if let Some(dir) = &self.scratch_dir {
            if let Err(err) = tokio::fs::remove_dir_all(dir).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(session_id = %self.id, %err, "failed to remove scratch dir");
                }
            }
        }
    }

    /// Point-in-time read model of the session.
    pub fn snapshot(&self, session_timeout: Duration) -> SessionView {
        let inner = self.inner.lock();
        let total = self.work_items.len();
        let attempted = inner.results.len();
        let completed = inner.results.iter().filter(|r| r.success).count();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let progress = if total == 0 {
            0
        } else {
            ((attempted as f64 / total as f64) * 100.0).round() as u8
        };
        let current_file = if inner.state == SessionState::Uploading {
            self.work_items
                .get(inner.cursor)
                .map(|item| item.filename.clone())
        } else {
            None
        };
        let remaining = session_timeout.saturating_sub(self.started.elapsed());

        SessionView {
            session_id: self.id.clone(),
            state: inner.state,
            needs_second_factor: inner.state == SessionState::Awaiting2fa,
            progress,
            current_file,
            total_files: total,
            completed_files: completed,
            results: inner.results.clone(),
            message: inner.message.clone(),
            error: inner.last_error.clone(),
            created_at: self.created_at,
            time_remaining_seconds: remaining.as_secs(),
        }
    }
}

/// Serializable point-in-time view of a session, as returned by status
/// polls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session identifier.
    pub session_id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Whether the caller must submit a second-factor code.
    pub needs_second_factor: bool,
    /// Percentage of items attempted (0-100).
    pub progress: u8,
    /// Filename currently being uploaded, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    /// Number of items queued at creation.
    pub total_files: usize,
    /// Number of items uploaded successfully so far.
    pub completed_files: usize,
    /// Per-item outcomes, in work-item order.
    pub results: Vec<UploadResult>,
    /// Human-readable progress message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last fatal error, when the session is in `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Seconds until the session expires.
    pub time_remaining_seconds: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
