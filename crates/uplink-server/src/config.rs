//! Server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Uplink HTTP server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8000`).
    pub port: u16,
    /// Maximum accepted upload size per file, in megabytes.
    pub max_upload_size_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_size_mb: 10,
        }
    }
}
