//! Worker-pool adapter for synchronous drivers.
//!
//! Browser automation libraries block the calling thread, which would stall
//! the async scheduler if called directly. [`PooledAgent`] bridges the gap:
//! every driver call is shipped to `tokio::task::spawn_blocking`, moving the
//! driver into the closure and back out, so the async side only ever awaits.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use uplink_core::{Credentials, WorkItem};

use crate::error::AgentError;
use crate::traits::{AgentHandle, AutomationAgent, LoginOutcome, SecondFactorOutcome};

/// A synchronous automation driver. Implementations block the calling
/// thread and must therefore only run on the blocking worker pool.
#[cfg_attr(test, mockall::automock)]
pub trait BlockingDriver: Send + 'static {
    /// Submit credentials on the login page.
    fn attempt_login(&mut self, credentials: &Credentials) -> Result<LoginOutcome, AgentError>;

    /// Submit a one-time second-factor code.
    fn submit_second_factor(&mut self, code: &str) -> Result<SecondFactorOutcome, AgentError>;

    /// Upload a single work item, returning its public reference URL.
    fn upload_item(&mut self, item: &WorkItem) -> Result<String, AgentError>;

    /// Release driver resources. Must be safe to call on a partially
    /// initialized driver.
    fn teardown(&mut self);
}

/// Launches a fresh [`BlockingDriver`] per session.
pub trait BlockingDriverFactory: Send + Sync + 'static {
    /// Launch a new driver instance (browser, context, page).
    fn launch(&self) -> Result<Box<dyn BlockingDriver>, AgentError>;
}

/// [`AutomationAgent`] implementation that runs a [`BlockingDriver`] on the
/// blocking worker pool.
pub struct PooledAgent<F> {
    factory: Arc<F>,
}

impl<F: BlockingDriverFactory> PooledAgent<F> {
    /// Wrap a driver factory.
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }
}

#[async_trait]
impl<F: BlockingDriverFactory> AutomationAgent for PooledAgent<F> {
    async fn initialize(&self) -> Result<Box<dyn AgentHandle>, AgentError> {
        // Launching is as blocking as any driver call (a real browser takes
        // seconds to start), so it goes to the worker pool too.
        let factory = Arc::clone(&self.factory);
        let joined = tokio::task::spawn_blocking(move || factory.launch()).await;
        let driver = match joined {
            Ok(launched) => launched?,
            Err(err) => return Err(AgentError::Worker(format!("initialize: {err}"))),
        };
        Ok(Box::new(PooledHandle {
            driver: Some(driver),
        }))
    }
}

/// Per-session handle owning one blocking driver.
///
/// The driver lives in an `Option` so each dispatch can move it into the
/// blocking closure and back; `None` between calls only ever occurs after
/// teardown or a worker panic.
struct PooledHandle {
    driver: Option<Box<dyn BlockingDriver>>,
}

impl PooledHandle {
    async fn dispatch<T, F>(&mut self, op: &'static str, call: F) -> Result<T, AgentError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn BlockingDriver) -> Result<T, AgentError> + Send + 'static,
    {
        let mut driver = self
            .driver
            .take()
            .ok_or_else(|| AgentError::Automation(format!("{op}: driver already released")))?;

        let joined = tokio::task::spawn_blocking(move || {
            let out = call(driver.as_mut());
            (driver, out)
        })
        .await;

        match joined {
            Ok((driver, out)) => {
                self.driver = Some(driver);
                out
            }
            // The driver is lost with the panicked task; leave `None` so
            // later calls fail fast instead of hanging on a dead browser.
            Err(err) => Err(AgentError::Worker(format!("{op}: {err}"))),
        }
    }
}

#[async_trait]
impl AgentHandle for PooledHandle {
    async fn attempt_login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, AgentError> {
        let credentials = credentials.clone();
        self.dispatch("attempt_login", move |driver| {
            driver.attempt_login(&credentials)
        })
        .await
    }

    async fn submit_second_factor(
        &mut self,
        code: &str,
    ) -> Result<SecondFactorOutcome, AgentError> {
        let code = code.to_owned();
        self.dispatch("submit_second_factor", move |driver| {
            driver.submit_second_factor(&code)
        })
        .await
    }

    async fn upload_item(&mut self, item: &WorkItem) -> Result<String, AgentError> {
        let item = item.clone();
        self.dispatch("upload_item", move |driver| driver.upload_item(&item))
            .await
    }

    async fn teardown(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        let joined = tokio::task::spawn_blocking(move || driver.teardown()).await;
        if let Err(err) = joined {
            warn!(%err, "driver teardown task failed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
