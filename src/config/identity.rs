//! Therapist identity from settings and environment variables.
//!
//! `THERAPIST_UID`, `THERAPIST_NAME` and `THERAPIST_EMAIL` override the `[therapist]`
//! block of the settings file, so credentials can live in `.env` rather than in the
//! checked-in config.

use crate::config::settings::TherapistConfig;
use crate::core::profile::TherapistIdentity;

/// Builds the acting therapist identity, preferring environment variables over config.
#[must_use]
pub fn therapist_identity(config: &TherapistConfig) -> TherapistIdentity {
    TherapistIdentity {
        uid: std::env::var("THERAPIST_UID").unwrap_or_else(|_| config.uid.clone()),
        display_name: std::env::var("THERAPIST_NAME")
            .ok()
            .or_else(|| config.display_name.clone()),
        email: std::env::var("THERAPIST_EMAIL")
            .ok()
            .or_else(|| config.email.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_falls_back_to_config() {
        let config = TherapistConfig {
            uid: "therapist-7".to_string(),
            display_name: Some("Dr. Meera".to_string()),
            email: None,
        };

        let identity = therapist_identity(&config);
        // Overrides may be exported on a developer machine; only assert unset ones
        if std::env::var("THERAPIST_UID").is_err() {
            assert_eq!(identity.uid, "therapist-7");
        }
        if std::env::var("THERAPIST_NAME").is_err() {
            assert_eq!(identity.display_name.as_deref(), Some("Dr. Meera"));
        }
        if std::env::var("THERAPIST_EMAIL").is_err() {
            assert!(identity.email.is_none());
        }
    }
}
