//! Scripted async test double.
//!
//! `ScriptedAgent` plays back a scripted sequence of outcomes and records
//! every call, so lifecycle tests can assert on what the orchestrator did
//! without a real driver. Cloning the agent clones a probe onto the same
//! shared script state.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use uplink_core::{Credentials, WorkItem};

use crate::error::AgentError;
use crate::traits::{AgentHandle, AutomationAgent, LoginOutcome, SecondFactorOutcome};

enum LoginStep {
    Authenticated,
    NeedsSecondFactor,
    Fail(String),
}

struct ScriptState {
    init_error: Option<String>,
    login_plan: Mutex<VecDeque<LoginStep>>,
    accepted_code: String,
    failing_items: HashSet<String>,
    upload_delay: Duration,
    initialized: AtomicUsize,
    teardowns: AtomicUsize,
    uploads: Mutex<Vec<String>>,
}

/// Builder for a [`ScriptedAgent`].
pub struct ScriptedAgentBuilder {
    init_error: Option<String>,
    login_plan: VecDeque<LoginStep>,
    accepted_code: String,
    failing_items: HashSet<String>,
    upload_delay: Duration,
}

impl ScriptedAgentBuilder {
    /// Fail every `initialize` call with the given message.
    #[must_use]
    pub fn fail_initialize(mut self, message: impl Into<String>) -> Self {
        self.init_error = Some(message.into());
        self
    }

    /// Queue a login attempt that authenticates immediately.
    #[must_use]
    pub fn login_succeeds(mut self) -> Self {
        self.login_plan.push_back(LoginStep::Authenticated);
        self
    }

    /// Queue a login attempt that requires a second factor.
    #[must_use]
    pub fn needs_second_factor(mut self) -> Self {
        self.login_plan.push_back(LoginStep::NeedsSecondFactor);
        self
    }

    /// Queue a login attempt that fails outright.
    #[must_use]
    pub fn login_fails(mut self, message: impl Into<String>) -> Self {
        self.login_plan.push_back(LoginStep::Fail(message.into()));
        self
    }

    /// Set the one second-factor code the script accepts
    /// (default `"123456"`).
    #[must_use]
    pub fn accept_code(mut self, code: impl Into<String>) -> Self {
        self.accepted_code = code.into();
        self
    }

    /// Make uploads of the named file fail.
    #[must_use]
    pub fn fail_item(mut self, filename: impl Into<String>) -> Self {
        let _ = self.failing_items.insert(filename.into());
        self
    }

    /// Delay each upload call, keeping the agent handle busy for the
    /// duration (useful for cancellation tests).
    #[must_use]
    pub fn upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    /// Finish the script.
    #[must_use]
    pub fn build(self) -> ScriptedAgent {
        ScriptedAgent {
            state: Arc::new(ScriptState {
                init_error: self.init_error,
                login_plan: Mutex::new(self.login_plan),
                accepted_code: self.accepted_code,
                failing_items: self.failing_items,
                upload_delay: self.upload_delay,
                initialized: AtomicUsize::new(0),
                teardowns: AtomicUsize::new(0),
                uploads: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// An [`AutomationAgent`] that plays back scripted outcomes.
///
/// When the login plan runs out, further login attempts authenticate
/// immediately.
#[derive(Clone)]
pub struct ScriptedAgent {
    state: Arc<ScriptState>,
}

impl ScriptedAgent {
    /// Start building a script.
    #[must_use]
    pub fn builder() -> ScriptedAgentBuilder {
        ScriptedAgentBuilder {
            init_error: None,
            login_plan: VecDeque::new(),
            accepted_code: "123456".into(),
            failing_items: HashSet::new(),
            upload_delay: Duration::ZERO,
        }
    }

    /// How many handles were initialized.
    pub fn initialized_count(&self) -> usize {
        self.state.initialized.load(Ordering::SeqCst)
    }

    /// How many handles were torn down.
    pub fn teardown_count(&self) -> usize {
        self.state.teardowns.load(Ordering::SeqCst)
    }

    /// Filenames of every upload attempted, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.state.uploads.lock().clone()
    }
}

#[async_trait]
impl AutomationAgent for ScriptedAgent {
    async fn initialize(&self) -> Result<Box<dyn AgentHandle>, AgentError> {
        if let Some(message) = &self.state.init_error {
            return Err(AgentError::Initialization(message.clone()));
        }
        let _ = self.state.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedHandle {
            state: Arc::clone(&self.state),
            torn_down: false,
        }))
    }
}

struct ScriptedHandle {
    state: Arc<ScriptState>,
    torn_down: bool,
}

#[async_trait]
impl AgentHandle for ScriptedHandle {
    async fn attempt_login(
        &mut self,
        _credentials: &Credentials,
    ) -> Result<LoginOutcome, AgentError> {
        let step = self.state.login_plan.lock().pop_front();
        match step {
            Some(LoginStep::Authenticated) | None => Ok(LoginOutcome::Authenticated),
            Some(LoginStep::NeedsSecondFactor) => Ok(LoginOutcome::NeedsSecondFactor),
            Some(LoginStep::Fail(message)) => Err(AgentError::Automation(message)),
        }
    }

    async fn submit_second_factor(
        &mut self,
        code: &str,
    ) -> Result<SecondFactorOutcome, AgentError> {
        if code == self.state.accepted_code {
            Ok(SecondFactorOutcome::Authenticated)
        } else {
            Ok(SecondFactorOutcome::InvalidCode)
        }
    }

    async fn upload_item(&mut self, item: &WorkItem) -> Result<String, AgentError> {
        if !self.state.upload_delay.is_zero() {
            tokio::time::sleep(self.state.upload_delay).await;
        }
        self.state.uploads.lock().push(item.filename.clone());
        if self.state.failing_items.contains(&item.filename) {
            Err(AgentError::Automation(format!(
                "scripted failure for {}",
                item.filename
            )))
        } else {
            Ok(format!("https://cdn.test/{}", item.filename))
        }
    }

    async fn teardown(&mut self) {
        if !self.torn_down {
            self.torn_down = true;
            let _ = self.state.teardowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
