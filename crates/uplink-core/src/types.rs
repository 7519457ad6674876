//! Shared domain and wire types for upload sessions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Login credentials for the target admin console.
///
/// `Debug` redacts the password so credentials never leak into logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account username (usually an email address).
    pub username: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single file queued for upload, fixed at session creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Display filename, used for result reporting.
    pub filename: String,
    /// Path to the staged file on local disk.
    pub path: PathBuf,
}

impl WorkItem {
    /// Create a work item from a filename and staged path.
    #[must_use]
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
        }
    }
}

/// Outcome of one upload attempt, index-aligned with the session's work
/// items. Appended as each item completes; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Filename of the item this result belongs to.
    pub filename: String,
    /// Whether the upload succeeded.
    pub success: bool,
    /// Public reference URL for the uploaded item, when successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Failure description, when unsuccessful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    /// Build a success result carrying the item's public reference.
    #[must_use]
    pub fn ok(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            success: true,
            url: Some(url.into()),
            error: None,
        }
    }

    /// Build a failure result carrying the error description.
    #[must_use]
    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            success: false,
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Lifecycle state of an upload session.
///
/// The happy path is `Initializing → Login → Authenticated → Uploading →
/// Done`, with an optional suspension in `Awaiting2fa` between login and
/// authentication. `Error` and `Cancelled` absorb from any non-terminal
/// state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Agent resources are being allocated.
    Initializing,
    /// Credentials are being submitted.
    Login,
    /// Suspended waiting for an out-of-band one-time code.
    #[serde(rename = "awaiting_2fa")]
    Awaiting2fa,
    /// Login complete; uploads not yet started.
    Authenticated,
    /// Work items are being uploaded in order.
    Uploading,
    /// All items attempted; results are final.
    Done,
    /// A fatal failure ended the session.
    Error,
    /// The caller cancelled the session.
    Cancelled,
}

impl SessionState {
    /// Whether this state is terminal (no further transitions allowed).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    /// Wire spelling of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Login => "login",
            Self::Awaiting2fa => "awaiting_2fa",
            Self::Authenticated => "authenticated",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "chef@example.com".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("chef@example.com"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn work_item_new() {
        let item = WorkItem::new("dish.jpg", "/tmp/staged/dish.jpg");
        assert_eq!(item.filename, "dish.jpg");
        assert_eq!(item.path, PathBuf::from("/tmp/staged/dish.jpg"));
    }

    #[test]
    fn upload_result_ok() {
        let r = UploadResult::ok("a.jpg", "https://cdn.example.com/a.jpg");
        assert!(r.success);
        assert_eq!(r.url.as_deref(), Some("https://cdn.example.com/a.jpg"));
        assert!(r.error.is_none());
    }

    #[test]
    fn upload_result_failed() {
        let r = UploadResult::failed("b.jpg", "upload button not found");
        assert!(!r.success);
        assert!(r.url.is_none());
        assert_eq!(r.error.as_deref(), Some("upload button not found"));
    }

    #[test]
    fn upload_result_omits_none_fields() {
        let json = serde_json::to_value(UploadResult::ok("a.jpg", "u")).unwrap();
        assert!(json.get("error").is_none());
        let json = serde_json::to_value(UploadResult::failed("b.jpg", "e")).unwrap();
        assert!(json.get("url").is_none());
    }

    #[test]
    fn state_wire_values() {
        assert_eq!(
            serde_json::to_string(&SessionState::Awaiting2fa).unwrap(),
            "\"awaiting_2fa\""
        );
        assert_eq!(
            serde_json::to_string(&SessionState::Initializing).unwrap(),
            "\"initializing\""
        );
        assert_eq!(
            serde_json::to_string(&SessionState::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn state_serde_roundtrip() {
        let states = [
            SessionState::Initializing,
            SessionState::Login,
            SessionState::Awaiting2fa,
            SessionState::Authenticated,
            SessionState::Uploading,
            SessionState::Done,
            SessionState::Error,
            SessionState::Cancelled,
        ];
        for s in states {
            let json = serde_json::to_string(&s).unwrap();
            let back: SessionState = serde_json::from_str(&json).unwrap();
            assert_eq!(s, back);
        }
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Initializing.is_terminal());
        assert!(!SessionState::Login.is_terminal());
        assert!(!SessionState::Awaiting2fa.is_terminal());
        assert!(!SessionState::Authenticated.is_terminal());
        assert!(!SessionState::Uploading.is_terminal());
    }

    #[test]
    fn state_display_matches_wire() {
        assert_eq!(SessionState::Awaiting2fa.to_string(), "awaiting_2fa");
        assert_eq!(SessionState::Uploading.to_string(), "uploading");
    }
}
