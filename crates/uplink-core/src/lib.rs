//! # uplink-core
//!
//! Foundation types for the Uplink upload orchestrator: branded ID newtypes
//! and the shared domain/wire types (credentials, work items, per-item
//! results, session lifecycle states).
//!
//! This crate is dependency-light by design; every other `uplink-*` crate
//! builds on it.

#![deny(unsafe_code)]

pub mod ids;
pub mod types;

pub use ids::SessionId;
pub use types::{Credentials, SessionState, UploadResult, WorkItem};
