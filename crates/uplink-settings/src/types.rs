//! Settings schema with compiled defaults.
//!
//! The JSON file uses camelCase keys; unknown keys are preserved by the
//! deep-merge but dropped on deserialization.

use serde::{Deserialize, Serialize};

/// Root settings document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UplinkSettings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Session orchestration settings.
    pub orchestrator: OrchestratorSettings,
    /// Automation agent settings.
    pub agent: AgentSettings,
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Maximum accepted upload size per file, in megabytes.
    pub max_upload_size_mb: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_size_mb: 10,
        }
    }
}

/// Session orchestration settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorSettings {
    /// Cap on concurrently live sessions.
    pub max_concurrent_sessions: usize,
    /// Overall session lifetime, in seconds.
    pub session_timeout_secs: u64,
    /// How long a session may sit in `awaiting_2fa`, in seconds.
    pub second_factor_wait_secs: u64,
    /// Interval between reaper sweeps, in seconds.
    pub reaper_interval_secs: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 10,
            session_timeout_secs: 600,
            second_factor_wait_secs: 90,
            reaper_interval_secs: 30,
        }
    }
}

/// Automation agent settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Run the browser headless.
    pub headless: bool,
    /// Admin console login page.
    pub login_url: String,
    /// Image library page where uploads land.
    pub image_library_url: String,
    /// Public base URL uploaded images are served from.
    pub image_base_url: String,
    /// Per-step delay for the simulated driver, in milliseconds.
    pub simulate_delay_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            headless: true,
            login_url: "https://admin.luminate.example.com/login".into(),
            image_library_url: "https://admin.luminate.example.com/images".into(),
            image_base_url: "https://cdn.luminate.example.com/images".into(),
            simulate_delay_ms: 50,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_settings() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8000);
        assert_eq!(s.max_upload_size_mb, 10);
    }

    #[test]
    fn default_orchestrator_settings() {
        let s = OrchestratorSettings::default();
        assert_eq!(s.max_concurrent_sessions, 10);
        assert_eq!(s.session_timeout_secs, 600);
        assert_eq!(s.second_factor_wait_secs, 90);
        assert_eq!(s.reaper_interval_secs, 30);
    }

    #[test]
    fn default_agent_settings() {
        let s = AgentSettings::default();
        assert!(s.headless);
        assert!(s.login_url.ends_with("/login"));
    }

    #[test]
    fn serde_roundtrip() {
        let settings = UplinkSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: UplinkSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.port, settings.server.port);
        assert_eq!(
            back.orchestrator.session_timeout_secs,
            settings.orchestrator.session_timeout_secs
        );
    }

    #[test]
    fn camel_case_keys() {
        let json = serde_json::to_value(UplinkSettings::default()).unwrap();
        assert!(json["orchestrator"]["maxConcurrentSessions"].is_number());
        assert!(json["orchestrator"]["secondFactorWaitSecs"].is_number());
        assert!(json["server"]["maxUploadSizeMb"].is_number());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let json = r#"{"server": {"port": 9000}}"#;
        let settings: UplinkSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.orchestrator.max_concurrent_sessions, 10);
    }
}
