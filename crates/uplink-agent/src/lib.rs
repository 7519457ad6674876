//! # uplink-agent
//!
//! The automation-agent seam of the Uplink orchestrator.
//!
//! The orchestrator never talks to a browser directly; it drives sessions
//! through the async [`AutomationAgent`]/[`AgentHandle`] traits. Production
//! drivers are synchronous (browser automation blocks its thread), so this
//! crate also defines the [`BlockingDriver`] contract and the
//! [`PooledAgent`] adapter that executes driver calls on the runtime's
//! blocking worker pool.
//!
//! Two in-tree implementations exist:
//! - [`SimulatedDriver`] — a deterministic stand-in driver, the daemon's
//!   default when no real browser driver is wired in.
//! - [`ScriptedAgent`] — an async test double with call recording, used by
//!   the runtime and server test suites.

#![deny(unsafe_code)]

pub mod error;
pub mod pool;
pub mod scripted;
pub mod simulated;
pub mod traits;

pub use error::AgentError;
pub use pool::{BlockingDriver, BlockingDriverFactory, PooledAgent};
pub use scripted::ScriptedAgent;
pub use simulated::{SimulatedDriver, SimulatedDriverConfig, SimulatedDriverFactory};
pub use traits::{AgentHandle, AutomationAgent, LoginOutcome, SecondFactorOutcome};
