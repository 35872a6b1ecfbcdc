//! Patient business logic - Registering, editing and removing patients.
//!
//! Each patient gets a short human-readable code when registered. Deleting a patient removes
//! their attendance history as well; issued invoices are kept because they carry their own
//! copy of the patient details.

use crate::core::calendar::PracticeCalendar;
use crate::errors::{Error, Result};
use crate::models::{NewPatient, Patient, PatientDraft, PatientUpdate};
use crate::store::{AttendanceStore, PatientStore};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, instrument};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Builds a code of the form `PT-<last six digits of epoch millis>-<four random characters>`.
pub fn generate_patient_code<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let suffix: String = (0..4)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect();
    format!("PT-{millis:06}-{suffix}")
}

fn require_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "Patient name is required"));
    }
    Ok(name.to_string())
}

/// Registers a new patient.
///
/// # Errors
/// Returns [`Error::Validation`] if the name is blank.
#[instrument(skip(store, calendar, new_patient))]
pub async fn add_patient(
    store: &dyn PatientStore,
    calendar: &PracticeCalendar,
    new_patient: NewPatient,
) -> Result<Patient> {
    let name = require_name(&new_patient.name)?;
    let now = calendar.now();
    let patient_code = generate_patient_code(now, &mut rand::thread_rng());

    let patient = store
        .create(PatientDraft {
            name,
            patient_code,
            contact: new_patient.contact.trim().to_string(),
            address: new_patient.address.trim().to_string(),
            created_at: now,
        })
        .await?;
    info!("Registered patient {} ({})", patient.id, patient.patient_code);
    Ok(patient)
}

/// Looks up a patient by id.
pub async fn get_patient(store: &dyn PatientStore, patient_id: i64) -> Result<Patient> {
    store.get(patient_id).await?.ok_or(Error::NotFound {
        entity: "patient",
        id: patient_id,
    })
}

/// Every patient, newest first.
pub async fn list_patients(store: &dyn PatientStore) -> Result<Vec<Patient>> {
    store.list().await
}

/// Applies a partial edit. A name, if given, must not be blank.
pub async fn update_patient(
    store: &dyn PatientStore,
    calendar: &PracticeCalendar,
    patient_id: i64,
    mut update: PatientUpdate,
) -> Result<Patient> {
    if let Some(name) = update.name.as_deref() {
        update.name = Some(require_name(name)?);
    }
    store.update(patient_id, update, calendar.now()).await
}

/// Removes a patient and their attendance history.
///
/// The patient goes first; if that fails, the history is left as it was.
pub async fn delete_patient(
    patients: &dyn PatientStore,
    attendance: &dyn AttendanceStore,
    patient_id: i64,
) -> Result<()> {
    patients.delete(patient_id).await?;
    let removed = attendance.delete_by_patient(patient_id).await?;
    info!(
        "Deleted patient {} with {} attendance records",
        patient_id, removed
    );
    Ok(())
}
