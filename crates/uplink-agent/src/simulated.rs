//! Deterministic stand-in driver.
//!
//! `SimulatedDriver` walks the same lifecycle a real browser driver would
//! (login, optional second factor, per-item uploads) without touching any
//! site. The daemon wires it through [`PooledAgent`](crate::PooledAgent) by
//! default, so the full worker-pool path is exercised even in simulation.

use std::thread;
use std::time::Duration;

use tracing::debug;

use uplink_core::{Credentials, WorkItem};

use crate::error::AgentError;
use crate::pool::{BlockingDriver, BlockingDriverFactory};
use crate::traits::{LoginOutcome, SecondFactorOutcome};

/// Behavior knobs for the simulated driver.
#[derive(Clone, Debug)]
pub struct SimulatedDriverConfig {
    /// Whether login requires a second factor.
    pub requires_second_factor: bool,
    /// The one code the simulator accepts.
    pub accepted_code: String,
    /// Base URL fabricated upload references are rooted at.
    pub image_base_url: String,
    /// Per-step blocking delay, approximating real page interaction.
    pub step_delay: Duration,
}

impl Default for SimulatedDriverConfig {
    fn default() -> Self {
        Self {
            requires_second_factor: false,
            accepted_code: "123456".into(),
            image_base_url: "https://cdn.luminate.example.com/images".into(),
            step_delay: Duration::from_millis(50),
        }
    }
}

/// A [`BlockingDriver`] that fabricates outcomes instead of driving a
/// browser.
pub struct SimulatedDriver {
    config: SimulatedDriverConfig,
    authenticated: bool,
}

impl SimulatedDriver {
    /// Create a driver with the given behavior.
    pub fn new(config: SimulatedDriverConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    fn pause(&self) {
        if !self.config.step_delay.is_zero() {
            thread::sleep(self.config.step_delay);
        }
    }
}

impl BlockingDriver for SimulatedDriver {
    fn attempt_login(&mut self, credentials: &Credentials) -> Result<LoginOutcome, AgentError> {
        self.pause();
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(AgentError::Automation("empty credentials".into()));
        }
        if self.config.requires_second_factor {
            debug!(username = %credentials.username, "simulated login, second factor required");
            Ok(LoginOutcome::NeedsSecondFactor)
        } else {
            debug!(username = %credentials.username, "simulated login accepted");
            self.authenticated = true;
            Ok(LoginOutcome::Authenticated)
        }
    }

    fn submit_second_factor(&mut self, code: &str) -> Result<SecondFactorOutcome, AgentError> {
        self.pause();
        if code == self.config.accepted_code {
            self.authenticated = true;
            Ok(SecondFactorOutcome::Authenticated)
        } else {
            Ok(SecondFactorOutcome::InvalidCode)
        }
    }

    fn upload_item(&mut self, item: &WorkItem) -> Result<String, AgentError> {
        self.pause();
        if !self.authenticated {
            return Err(AgentError::Automation("not authenticated".into()));
        }
        Ok(format!(
            "{}/{}",
            self.config.image_base_url.trim_end_matches('/'),
            item.filename
        ))
    }

    fn teardown(&mut self) {
        self.authenticated = false;
    }
}

/// Factory producing fresh [`SimulatedDriver`]s, one per session.
#[derive(Clone, Debug)]
pub struct SimulatedDriverFactory {
    config: SimulatedDriverConfig,
}

impl SimulatedDriverFactory {
    /// Create a factory with the given per-driver behavior.
    pub fn new(config: SimulatedDriverConfig) -> Self {
        Self { config }
    }
}

impl BlockingDriverFactory for SimulatedDriverFactory {
    fn launch(&self) -> Result<Box<dyn BlockingDriver>, AgentError> {
        Ok(Box::new(SimulatedDriver::new(self.config.clone())))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SimulatedDriverConfig {
        SimulatedDriverConfig {
            step_delay: Duration::ZERO,
            ..SimulatedDriverConfig::default()
        }
    }

    fn creds() -> Credentials {
        Credentials {
            username: "user@example.com".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn login_without_second_factor() {
        let mut driver = SimulatedDriver::new(fast_config());
        let outcome = driver.attempt_login(&creds()).unwrap();
        assert_eq!(outcome, LoginOutcome::Authenticated);
    }

    #[test]
    fn login_with_second_factor() {
        let mut driver = SimulatedDriver::new(SimulatedDriverConfig {
            requires_second_factor: true,
            ..fast_config()
        });
        let outcome = driver.attempt_login(&creds()).unwrap();
        assert_eq!(outcome, LoginOutcome::NeedsSecondFactor);
    }

    #[test]
    fn empty_credentials_rejected() {
        let mut driver = SimulatedDriver::new(fast_config());
        let err = driver
            .attempt_login(&Credentials {
                username: String::new(),
                password: String::new(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("empty credentials"));
    }

    #[test]
    fn correct_code_authenticates() {
        let mut driver = SimulatedDriver::new(SimulatedDriverConfig {
            requires_second_factor: true,
            ..fast_config()
        });
        let _ = driver.attempt_login(&creds()).unwrap();
        let outcome = driver.submit_second_factor("123456").unwrap();
        assert_eq!(outcome, SecondFactorOutcome::Authenticated);
    }

    #[test]
    fn wrong_code_is_invalid_not_error() {
        let mut driver = SimulatedDriver::new(SimulatedDriverConfig {
            requires_second_factor: true,
            ..fast_config()
        });
        let _ = driver.attempt_login(&creds()).unwrap();
        let outcome = driver.submit_second_factor("000000").unwrap();
        assert_eq!(outcome, SecondFactorOutcome::InvalidCode);
    }

    #[test]
    fn upload_requires_authentication() {
        let mut driver = SimulatedDriver::new(fast_config());
        let err = driver
            .upload_item(&WorkItem::new("a.jpg", "/tmp/a.jpg"))
            .unwrap_err();
        assert!(err.to_string().contains("not authenticated"));
    }

    #[test]
    fn upload_fabricates_reference_url() {
        let mut driver = SimulatedDriver::new(fast_config());
        let _ = driver.attempt_login(&creds()).unwrap();
        let url = driver
            .upload_item(&WorkItem::new("dish.jpg", "/tmp/dish.jpg"))
            .unwrap();
        assert_eq!(url, "https://cdn.luminate.example.com/images/dish.jpg");
    }

    #[test]
    fn factory_launches_fresh_drivers() {
        let factory = SimulatedDriverFactory::new(fast_config());
        let mut a = factory.launch().unwrap();
        let mut b = factory.launch().unwrap();
        let _ = a.attempt_login(&creds()).unwrap();
        // `b` has its own state and is still unauthenticated.
        assert!(
            b.upload_item(&WorkItem::new("x.jpg", "/tmp/x.jpg"))
                .is_err()
        );
    }
}
