//! The automation agent contract.
//!
//! Login and second-factor results are tagged variants, not errors: "needs a
//! second factor" and "wrong code" are expected outcomes the orchestrator
//! branches on, while [`AgentError`] is reserved for genuine failures.

use async_trait::async_trait;

use uplink_core::{Credentials, WorkItem};

use crate::error::AgentError;

/// Outcome of a login attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; the session is authenticated.
    Authenticated,
    /// Credentials accepted but a one-time code is required.
    NeedsSecondFactor,
}

/// Outcome of submitting a one-time code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecondFactorOutcome {
    /// Code accepted; the session is authenticated.
    Authenticated,
    /// Code rejected; the caller may retry with a fresh code.
    InvalidCode,
}

/// Factory for per-session agent handles.
///
/// One implementation is shared across all sessions; each
/// [`initialize`](Self::initialize) call allocates an isolated handle
/// (browser context, temp profile) owned by exactly one session.
#[async_trait]
pub trait AutomationAgent: Send + Sync {
    /// Allocate agent resources for a new session.
    async fn initialize(&self) -> Result<Box<dyn AgentHandle>, AgentError>;
}

/// A live, exclusively-owned automation handle for one session.
///
/// Methods take `&mut self`: a handle serves at most one in-flight call at a
/// time, matching the single-browser-page execution model underneath.
#[async_trait]
pub trait AgentHandle: Send {
    /// Submit credentials on the login page.
    async fn attempt_login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, AgentError>;

    /// Submit a one-time second-factor code.
    async fn submit_second_factor(
        &mut self,
        code: &str,
    ) -> Result<SecondFactorOutcome, AgentError>;

    /// Upload a single work item, returning its public reference URL.
    async fn upload_item(&mut self, item: &WorkItem) -> Result<String, AgentError>;

    /// Release all agent resources. Infallible and safe to call once per
    /// handle; ownership transfer (`Option::take`) upstream guarantees it is
    /// never called twice.
    async fn teardown(&mut self);
}

impl std::fmt::Debug for dyn AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn AgentHandle")
    }
}
