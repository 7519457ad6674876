//! # uplink-server
//!
//! Axum HTTP surface over the upload orchestrator: session creation,
//! second-factor submission, status polling, cancellation, and `/health`,
//! plus graceful-shutdown coordination for the daemon's background tasks.

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use server::{AppState, UplinkServer};
pub use shutdown::ShutdownCoordinator;
