//! # uplink-runtime
//!
//! Session lifecycle orchestration for long-running batch uploads.
//!
//! A session walks `initializing → login → [awaiting_2fa] → authenticated →
//! uploading → done`, with `error` and `cancelled` absorbing from any
//! non-terminal state. The [`Orchestrator`] owns the capacity-bounded
//! [`SessionRegistry`], drives sessions through the automation agent seam,
//! and runs a background reaper that reclaims expired and finished sessions.
//!
//! Uploads run strictly in order, one at a time; a failed item is recorded
//! in the session's results and the run continues.

#![deny(unsafe_code)]

pub mod errors;
pub mod orchestrator;
mod reaper;
pub mod registry;
pub mod session;

pub use errors::{OrchestratorError, SessionFailure};
pub use orchestrator::{Orchestrator, OrchestratorConfig, SecondFactorReply};
pub use registry::SessionRegistry;
pub use session::{Session, SessionView};
