//! Domain records shared by the stores, the billing core and the renderer.
//!
//! These are plain values. Database entities live in [`crate::entities`] and are converted
//! into these types at the store boundary, so the in-memory and database backends hand out
//! identical shapes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// Outcome of a scheduled session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// The patient attended; billable
    Present,
    /// The patient did not attend
    Absent,
}

impl AttendanceStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(Error::validation(
                "status",
                format!("Unknown attendance status '{other}'"),
            )),
        }
    }
}

/// One timestamped present/absent event for a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Assigned by the attendance store
    pub id: i64,
    /// Patient this session belongs to
    pub patient_id: i64,
    /// Present or absent
    pub status: AttendanceStatus,
    /// When the session took place
    pub timestamp: DateTime<Utc>,
}

/// A patient of the practice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Store identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Human-readable code, e.g. `PT-482913-K2QZ`
    pub patient_code: String,
    /// Phone or other contact detail
    pub contact: String,
    /// Postal address
    pub address: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// Last edit, if any
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied when registering a patient
#[derive(Debug, Clone, Default)]
pub struct NewPatient {
    /// Display name
    pub name: String,
    /// Phone or other contact detail
    pub contact: String,
    /// Postal address
    pub address: String,
}

/// A patient row ready to insert; the store assigns `id`
#[derive(Debug, Clone)]
pub struct PatientDraft {
    /// Display name
    pub name: String,
    /// Generated human-readable code
    pub patient_code: String,
    /// Phone or other contact detail
    pub contact: String,
    /// Postal address
    pub address: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Partial patient edit; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    /// New display name
    pub name: Option<String>,
    /// New contact detail
    pub contact: Option<String>,
    /// New address
    pub address: Option<String>,
}

/// Inclusive calendar-day billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First billed day
    pub start: NaiveDate,
    /// Last billed day
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting an end date before the start date.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::validation(
                "date_range",
                "End date cannot be before start date",
            ));
        }
        Ok(Self { start, end })
    }
}

/// Session stub copied by value into an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSession {
    /// Session date; same instant as `timestamp`
    pub date: DateTime<Utc>,
    /// Always `Present` for billed sessions
    pub status: AttendanceStatus,
    /// Original attendance timestamp
    pub timestamp: DateTime<Utc>,
}

impl From<&AttendanceRecord> for InvoiceSession {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            date: record.timestamp,
            status: record.status,
            timestamp: record.timestamp,
        }
    }
}

/// Patient identity captured at billing time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSnapshot {
    /// Source patient id
    pub patient_id: i64,
    /// Display name at billing time
    pub name: String,
    /// Contact detail at billing time
    pub contact: String,
    /// Address at billing time
    pub address: String,
}

impl From<&Patient> for PatientSnapshot {
    fn from(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id,
            name: patient.name.clone(),
            contact: patient.contact.clone(),
            address: patient.address.clone(),
        }
    }
}

/// Therapist identity captured at billing time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TherapistSnapshot {
    /// Identifier of the acting user
    pub uid: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Professional registration number; empty when not on file
    pub registration_number: String,
    /// Practice address; empty when not on file
    pub address: String,
}

/// Invoice contents before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    /// Allocated sequential number
    pub invoice_number: String,
    /// Source patient id
    pub patient_id: i64,
    /// Patient display name
    pub patient_name: String,
    /// Full name as it should appear on the bill
    pub patient_full_name: String,
    /// Patient contact
    pub patient_contact: String,
    /// Patient address
    pub patient_address: String,
    /// Therapist display name
    pub therapist_name: String,
    /// Therapist email
    pub therapist_email: String,
    /// Therapist registration number, possibly empty
    pub therapist_registration_number: String,
    /// Therapist address, possibly empty
    pub therapist_address: String,
    /// Billed period
    pub date_range: DateRange,
    /// Present sessions in the period
    pub sessions: Vec<InvoiceSession>,
    /// Amount charged per attended session
    pub per_session_rate: f64,
    /// All sessions (present and absent) in the period
    pub total_sessions: u32,
    /// Present sessions in the period
    pub present_sessions: u32,
    /// `present_sessions * per_session_rate`
    pub total_amount: f64,
    /// Payment flag
    pub is_paid: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Acting user id
    pub created_by: String,
}

impl InvoiceDraft {
    /// Attaches the store-assigned id.
    #[must_use]
    pub fn with_id(self, id: i64) -> Invoice {
        Invoice {
            id,
            invoice_number: self.invoice_number,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            patient_full_name: self.patient_full_name,
            patient_contact: self.patient_contact,
            patient_address: self.patient_address,
            therapist_name: self.therapist_name,
            therapist_email: self.therapist_email,
            therapist_registration_number: self.therapist_registration_number,
            therapist_address: self.therapist_address,
            date_range: self.date_range,
            sessions: self.sessions,
            per_session_rate: self.per_session_rate,
            total_sessions: self.total_sessions,
            present_sessions: self.present_sessions,
            total_amount: self.total_amount,
            is_paid: self.is_paid,
            created_at: self.created_at,
            created_by: self.created_by,
        }
    }
}

/// A stored billing document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Store identifier
    pub id: i64,
    /// `INV-<year>-<sequence>`
    pub invoice_number: String,
    /// Source patient id
    pub patient_id: i64,
    /// Patient display name at billing time
    pub patient_name: String,
    /// Full name on the bill
    pub patient_full_name: String,
    /// Patient contact at billing time
    pub patient_contact: String,
    /// Patient address at billing time
    pub patient_address: String,
    /// Therapist display name at billing time
    pub therapist_name: String,
    /// Therapist email at billing time
    pub therapist_email: String,
    /// Registration number, empty when not on file
    pub therapist_registration_number: String,
    /// Practice address, empty when not on file
    pub therapist_address: String,
    /// Billed period
    pub date_range: DateRange,
    /// Billed sessions
    pub sessions: Vec<InvoiceSession>,
    /// Amount charged per attended session
    pub per_session_rate: f64,
    /// All sessions in the period
    pub total_sessions: u32,
    /// Attended sessions in the period
    pub present_sessions: u32,
    /// Stored total, never recomputed
    pub total_amount: f64,
    /// Payment flag
    pub is_paid: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Acting user id
    pub created_by: String,
}

/// Newest first, ties broken by ascending id.
pub fn sort_invoices(invoices: &mut [Invoice]) {
    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

/// Registration details kept for the acting therapist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TherapistProfile {
    /// Identifier of the user this profile belongs to
    pub uid: String,
    /// Professional registration number
    pub registration_number: String,
    /// Practice address
    pub address: String,
    /// Last change
    pub updated_at: DateTime<Utc>,
}
