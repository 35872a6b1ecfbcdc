//! Practice settings loading from physio.toml
//!
//! This module loads the practice configuration from a TOML file: which store backend
//! to run against, the practice time zone, where exported invoices are written, and who
//! the acting therapist is. Every field has a default so a missing file is not an error.

use crate::errors::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "physio.toml";

/// Which store implementation to build at startup
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process stores; nothing survives a restart
    Memory,
    /// `SeaORM` stores against `DATABASE_URL`
    #[default]
    Database,
}

/// Configuration structure representing the entire physio.toml file
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Store backend
    pub backend: Backend,
    /// Practice time zone as minutes east of UTC (330 for IST)
    pub utc_offset_minutes: i32,
    /// Directory exported invoice documents are written to
    pub output_dir: PathBuf,
    /// Acting therapist
    pub therapist: TherapistConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            utc_offset_minutes: 0,
            output_dir: PathBuf::from("invoices"),
            therapist: TherapistConfig::default(),
        }
    }
}

/// Identity of the therapist issuing invoices
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TherapistConfig {
    /// Stable user identifier, recorded as `created_by` and used to key the profile
    pub uid: String,
    /// Name printed on invoices
    pub display_name: Option<String>,
    /// Contact email
    pub email: Option<String>,
}

impl Default for TherapistConfig {
    fn default() -> Self {
        Self {
            uid: "local".to_string(),
            display_name: None,
            email: None,
        }
    }
}

impl Settings {
    /// Practice time zone offset.
    ///
    /// # Errors
    /// Returns `Error::Config` when the offset is more than a day either way.
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "utc_offset_minutes {} is out of range",
                    self.utc_offset_minutes
                ),
            })
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from `PHYSIO_CONFIG` or `./physio.toml`, falling back to defaults when
/// the file does not exist.
pub fn load_default_config() -> Result<Settings> {
    let path = std::env::var("PHYSIO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        load_config(&path)
    } else {
        info!("No config file at {}, using defaults.", path);
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            backend = "memory"
            utc_offset_minutes = 330
            output_dir = "out/invoices"

            [therapist]
            uid = "therapist-1"
            display_name = "Dr. Asha Rao"
            email = "asha@example.com"
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.backend, Backend::Memory);
        assert_eq!(settings.offset().unwrap().local_minus_utc(), 330 * 60);
        assert_eq!(settings.output_dir, PathBuf::from("out/invoices"));
        assert_eq!(settings.therapist.uid, "therapist-1");
        assert_eq!(settings.therapist.display_name.as_deref(), Some("Dr. Asha Rao"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.backend, Backend::Database);
        assert_eq!(settings.utc_offset_minutes, 0);
        assert_eq!(settings.therapist.uid, "local");
        assert!(settings.therapist.email.is_none());
    }

    #[test]
    fn test_out_of_range_offset_is_config_error() {
        let settings = Settings {
            utc_offset_minutes: 24 * 60,
            ..Settings::default()
        };
        assert!(matches!(settings.offset(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result: std::result::Result<Settings, _> = toml::from_str(r#"backend = "firestore""#);
        assert!(result.is_err());
    }
}
