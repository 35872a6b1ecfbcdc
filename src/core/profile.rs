//! Therapist profile - Registration details and the identity printed on invoices.

use crate::core::calendar::PracticeCalendar;
use crate::errors::Result;
use crate::models::{TherapistProfile, TherapistSnapshot};
use crate::store::ProfileStore;
use tracing::info;

/// The acting user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TherapistIdentity {
    /// Stable user identifier
    pub uid: String,
    /// Name to print, if the provider has one
    pub display_name: Option<String>,
    /// Contact email, if the provider has one
    pub email: Option<String>,
}

impl TherapistIdentity {
    /// Display name, falling back to the part of the email before `@`.
    #[must_use]
    pub fn name(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or_default()
            .to_string()
    }
}

/// Partial profile edit; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New registration number
    pub registration_number: Option<String>,
    /// New practice address
    pub address: Option<String>,
}

/// Stored profile for `uid`, if any.
pub async fn get_profile(store: &dyn ProfileStore, uid: &str) -> Result<Option<TherapistProfile>> {
    store.get(uid).await
}

/// Merges `update` into the stored profile, creating it if missing.
pub async fn update_profile(
    store: &dyn ProfileStore,
    calendar: &PracticeCalendar,
    uid: &str,
    update: ProfileUpdate,
) -> Result<TherapistProfile> {
    let existing = store.get(uid).await?;
    let (registration_number, address) = existing
        .map(|p| (p.registration_number, p.address))
        .unwrap_or_default();

    let profile = TherapistProfile {
        uid: uid.to_string(),
        registration_number: update
            .registration_number
            .map_or(registration_number, |v| v.trim().to_string()),
        address: update.address.map_or(address, |v| v.trim().to_string()),
        updated_at: calendar.now(),
    };
    let saved = store.upsert(profile).await?;
    info!("Updated therapist profile for {}", uid);
    Ok(saved)
}

/// Captures the therapist details to copy into an invoice; absent values become "".
#[must_use]
pub fn therapist_snapshot(
    identity: &TherapistIdentity,
    profile: Option<&TherapistProfile>,
) -> TherapistSnapshot {
    TherapistSnapshot {
        uid: identity.uid.clone(),
        name: identity.name(),
        email: identity.email.clone().unwrap_or_default(),
        registration_number: profile
            .map(|p| p.registration_number.clone())
            .unwrap_or_default(),
        address: profile.map(|p| p.address.clone()).unwrap_or_default(),
    }
}
