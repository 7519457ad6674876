//! Orchestrator error types.

/// Errors surfaced synchronously to API callers.
///
/// Everything else that can go wrong with a session (bad credentials,
/// timed-out second factor, failed items) is recorded on the session itself
/// and observed through status polls.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The registry is at its concurrent-session cap. Raised before any
    /// agent resources are allocated; the caller may retry later.
    #[error("maximum of {limit} concurrent upload sessions reached")]
    CapacityExceeded {
        /// The configured session cap.
        limit: usize,
    },

    /// No live session with this ID (unknown, expired, or already evicted).
    #[error("session not found or expired: {0}")]
    NotFound(String),
}

impl OrchestratorError {
    /// Whether the caller can sensibly retry the same request.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::CapacityExceeded { .. } => true,
            Self::NotFound(_) => false,
        }
    }

    /// Error category string for log fields.
    pub fn category(&self) -> &str {
        match self {
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::NotFound(_) => "not_found",
        }
    }
}

/// Session-fatal failure categories.
///
/// A failure moves the session to `error` and is recorded as its last
/// error; the session sticks around (results intact) until the reaper
/// evicts it.
#[derive(Debug, thiserror::Error)]
pub enum SessionFailure {
    /// Agent resources could not be allocated.
    #[error("agent initialization failed: {0}")]
    Initialization(String),

    /// Login or second-factor submission failed outright.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The session sat in `awaiting_2fa` past the configured window.
    #[error("second factor window expired")]
    SecondFactorTimeout,

    /// Anything that does not fit the categories above.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl SessionFailure {
    /// Failure category string for log fields.
    pub fn category(&self) -> &str {
        match self {
            Self::Initialization(_) => "initialization",
            Self::Authentication(_) => "authentication",
            Self::SecondFactorTimeout => "second_factor_timeout",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
