//! # uplink-settings
//!
//! Configuration management with layered sources for the Uplink daemon.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`UplinkSettings::default()`]
//! 2. **User file** — `~/.uplink/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `UPLINK_*` overrides (highest priority)
//!
//! There is no ambient settings singleton: the daemon loads settings once at
//! startup and passes them down explicitly.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
