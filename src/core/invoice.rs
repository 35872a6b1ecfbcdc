//! Invoice aggregation - Turns attendance history into a numbered, persisted invoice.
//!
//! The aggregator reads a patient's full attendance history, keeps the records whose
//! timestamp falls inside the billing period (boundary days included in full), counts them,
//! allocates an invoice number and writes the assembled record. Patient and therapist details
//! are copied into the invoice by value, so later edits to either never change an issued bill.

use crate::core::calendar::PracticeCalendar;
use crate::core::numbering::NumberingService;
use crate::errors::{Error, Result};
use crate::models::{
    AttendanceRecord, AttendanceStatus, DateRange, Invoice, InvoiceDraft, InvoiceSession,
    PatientSnapshot, TherapistSnapshot,
};
use crate::store::{AttendanceStore, InvoiceStore};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Everything the caller supplies to bill one patient for one period
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    /// Patient details as they are right now
    pub patient: PatientSnapshot,
    /// Acting therapist details as they are right now
    pub therapist: TherapistSnapshot,
    /// Inclusive billing period
    pub date_range: DateRange,
    /// Name to print on the bill; may differ from the patient's display name
    pub full_name: String,
    /// Amount charged per attended session
    pub per_session_rate: f64,
}

impl InvoiceRequest {
    /// Checks caller preconditions without touching any store.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        validate_terms(&self.date_range, &self.full_name, self.per_session_rate)
    }
}

/// Checks the billing period, printed name and rate of a request.
///
/// # Errors
/// Returns [`Error::Validation`] naming the first offending field.
pub fn validate_terms(
    date_range: &DateRange,
    full_name: &str,
    per_session_rate: f64,
) -> Result<()> {
    if date_range.end < date_range.start {
        return Err(Error::validation(
            "date_range",
            "End date cannot be before start date",
        ));
    }
    if !per_session_rate.is_finite() || per_session_rate <= 0.0 {
        return Err(Error::validation(
            "per_session_rate",
            "Please enter a valid per session rate",
        ));
    }
    if full_name.trim().is_empty() {
        return Err(Error::validation(
            "full_name",
            "Please enter the patient's full name",
        ));
    }
    Ok(())
}

/// Counts and billable sessions for one period
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionTally {
    /// Present and absent records in range
    pub total_sessions: u32,
    /// Present records in range
    pub present_sessions: u32,
    /// Present records in range, in attendance-history order
    pub sessions: Vec<InvoiceSession>,
}

/// Selects the records of `range` and counts them.
///
/// `records` is expected newest first, as the attendance store returns it; that order is
/// kept in [`SessionTally::sessions`].
#[must_use]
pub fn tally_sessions(
    records: &[AttendanceRecord],
    range: &DateRange,
    calendar: &PracticeCalendar,
) -> SessionTally {
    let mut tally = SessionTally::default();
    for record in records
        .iter()
        .filter(|record| calendar.contains(range, record.timestamp))
    {
        tally.total_sessions = tally.total_sessions.saturating_add(1);
        if record.status == AttendanceStatus::Present {
            tally.present_sessions = tally.present_sessions.saturating_add(1);
            tally.sessions.push(InvoiceSession::from(record));
        }
    }
    tally
}

/// What an invoice for a period would contain, without allocating a number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePreview {
    /// Period previewed
    pub date_range: DateRange,
    /// Sessions found in it
    pub tally: SessionTally,
}

impl InvoicePreview {
    /// Whether there is anything to bill.
    #[must_use]
    pub const fn can_generate(&self) -> bool {
        self.tally.present_sessions > 0
    }

    /// Total that would be charged at `per_session_rate`.
    #[must_use]
    pub fn amount_at(&self, per_session_rate: f64) -> f64 {
        f64::from(self.tally.present_sessions) * per_session_rate
    }
}

/// Builds invoices from attendance
#[derive(Clone)]
pub struct InvoiceAggregator {
    attendance: Arc<dyn AttendanceStore>,
    invoices: Arc<dyn InvoiceStore>,
    numbering: NumberingService,
    calendar: PracticeCalendar,
}

impl InvoiceAggregator {
    /// Aggregator reading `attendance`, writing `invoices` and numbering with `numbering`.
    #[must_use]
    pub fn new(
        attendance: Arc<dyn AttendanceStore>,
        invoices: Arc<dyn InvoiceStore>,
        numbering: NumberingService,
        calendar: PracticeCalendar,
    ) -> Self {
        Self {
            attendance,
            invoices,
            numbering,
            calendar,
        }
    }

    /// Counts the sessions a period would bill.
    pub async fn preview(&self, patient_id: i64, date_range: DateRange) -> Result<InvoicePreview> {
        let records = self.attendance.list_by_patient(patient_id).await?;
        Ok(InvoicePreview {
            date_range,
            tally: tally_sessions(&records, &date_range, &self.calendar),
        })
    }

    /// Assembles, numbers and persists an invoice.
    ///
    /// A period with no present sessions produces a legal zero-value invoice; use
    /// [`InvoiceAggregator::preview`] first to warn the user.
    ///
    /// # Arguments
    /// * `request` - Patient, therapist, billing period, printed name and rate
    ///
    /// # Errors
    /// * [`Error::Validation`] before any store is touched
    /// * [`Error::StoreUnavailable`] if the attendance history cannot be read
    /// * [`Error::NumberingUnavailable`] if no number could be allocated; nothing is saved
    /// * [`Error::PersistenceFailed`] if saving failed; the allocated number is not reused
    #[instrument(skip(self, request), fields(patient_id = request.patient.patient_id))]
    pub async fn build_invoice(&self, request: InvoiceRequest) -> Result<Invoice> {
        request.validate()?;

        let records = self
            .attendance
            .list_by_patient(request.patient.patient_id)
            .await?;
        let tally = tally_sessions(&records, &request.date_range, &self.calendar);
        if tally.present_sessions == 0 {
            warn!(
                "Billing patient {} with no attended sessions between {} and {}",
                request.patient.patient_id, request.date_range.start, request.date_range.end
            );
        }

        let invoice_number = self.numbering.next_invoice_number().await?;
        let total_amount = f64::from(tally.present_sessions) * request.per_session_rate;

        let draft = InvoiceDraft {
            invoice_number: invoice_number.clone(),
            patient_id: request.patient.patient_id,
            patient_name: request.patient.name,
            patient_full_name: request.full_name.trim().to_string(),
            patient_contact: request.patient.contact,
            patient_address: request.patient.address,
            therapist_name: request.therapist.name,
            therapist_email: request.therapist.email,
            therapist_registration_number: request.therapist.registration_number,
            therapist_address: request.therapist.address,
            date_range: request.date_range,
            sessions: tally.sessions,
            per_session_rate: request.per_session_rate,
            total_sessions: tally.total_sessions,
            present_sessions: tally.present_sessions,
            total_amount,
            is_paid: false,
            created_at: self.calendar.now(),
            created_by: request.therapist.uid,
        };

        let invoice = self.invoices.create(draft).await.map_err(|e| {
            error!("Invoice {} allocated but not saved: {}", invoice_number, e);
            Error::PersistenceFailed {
                invoice_number: invoice_number.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(
            "Created invoice {} for patient {}: {} of {} sessions, total {}",
            invoice.invoice_number,
            invoice.patient_id,
            invoice.present_sessions,
            invoice.total_sessions,
            invoice.total_amount
        );
        Ok(invoice)
    }
}
