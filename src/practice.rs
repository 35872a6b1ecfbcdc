//! Practice context - The shared state every front end works through.
//!
//! A [`Practice`] is built once at startup from the chosen backend, the practice calendar
//! and the acting therapist. Its methods are the boundary where store failures are logged
//! and turned into something presentable: list reads come back as a [`Listing`] carrying a
//! banner instead of an error, and the paid toggle is applied to the caller's list before
//! the store confirms it.

use crate::core::analytics::{PracticeAttendance, practice_attendance};
use crate::core::calendar::PracticeCalendar;
use crate::core::invoice::{InvoiceAggregator, InvoicePreview, InvoiceRequest, validate_terms};
use crate::core::numbering::NumberingService;
use crate::core::profile::{ProfileUpdate, TherapistIdentity, therapist_snapshot};
use crate::core::{attendance, patient, profile};
use crate::errors::{Error, Result};
use crate::models::{
    AttendanceRecord, AttendanceStatus, DateRange, Invoice, NewPatient, Patient, PatientSnapshot,
    PatientUpdate, TherapistProfile,
};
use crate::render::{DocumentRenderer, export_invoice};
use crate::store::Stores;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Items of a read, plus a banner to show if the read failed
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    /// What was read; empty when the read failed
    pub items: Vec<T>,
    /// User-facing error message, if any
    pub banner: Option<String>,
}

impl<T> Listing<T> {
    /// Wraps a read result, logging a failure and converting it into a banner.
    pub fn from_result(result: Result<Vec<T>>, what: &str) -> Self {
        match result {
            Ok(items) => Self {
                items,
                banner: None,
            },
            Err(e) => {
                error!("Failed to load {}: {}", what, e);
                Self {
                    items: Vec::new(),
                    banner: Some(e.user_message()),
                }
            }
        }
    }
}

/// A computed read, plus a banner to show if it could not be computed
#[derive(Debug, Clone, PartialEq)]
pub struct Report<T> {
    /// What was computed; the empty value when the read failed
    pub value: T,
    /// User-facing error message, if any
    pub banner: Option<String>,
}

impl<T: Default> Report<T> {
    /// Wraps a computed result, logging a failure and converting it into a banner.
    pub fn from_result(result: Result<T>, what: &str) -> Self {
        match result {
            Ok(value) => Self {
                value,
                banner: None,
            },
            Err(e) => {
                error!("Failed to load {}: {}", what, e);
                Self {
                    value: T::default(),
                    banner: Some(e.user_message()),
                }
            }
        }
    }
}

/// Outcome of issuing an invoice
#[derive(Debug)]
pub struct IssuedInvoice {
    /// The stored invoice
    pub invoice: Invoice,
    /// Where the document was written, or why it was not
    pub document: Result<PathBuf>,
}

/// Flips `is_paid` on the invoice in `invoices` immediately, then persists the change.
///
/// If the store rejects the change the local copy is reverted in place and the error is
/// returned. Other invoices in the list are never touched.
pub async fn toggle_invoice_paid(
    stores: &Stores,
    invoices: &mut [Invoice],
    invoice_id: i64,
    is_paid: bool,
) -> Result<()> {
    let Some(local) = invoices.iter_mut().find(|invoice| invoice.id == invoice_id) else {
        return Err(Error::NotFound {
            entity: "invoice",
            id: invoice_id,
        });
    };
    let previous = local.is_paid;
    local.is_paid = is_paid;

    if let Err(e) = stores.invoices.set_paid(invoice_id, is_paid).await {
        warn!(
            "Reverting paid flag of invoice {} after failure: {}",
            invoice_id, e
        );
        local.is_paid = previous;
        return Err(e);
    }
    Ok(())
}

/// Shared state for all practice operations
#[derive(Clone)]
pub struct Practice {
    stores: Stores,
    calendar: PracticeCalendar,
    identity: TherapistIdentity,
    aggregator: InvoiceAggregator,
    renderer: Arc<dyn DocumentRenderer>,
    output_dir: PathBuf,
}

impl Practice {
    /// Builds the context for a backend, calendar and acting therapist.
    #[must_use]
    pub fn new(
        stores: Stores,
        calendar: PracticeCalendar,
        identity: TherapistIdentity,
        renderer: Arc<dyn DocumentRenderer>,
        output_dir: PathBuf,
    ) -> Self {
        let numbering = NumberingService::new(Arc::clone(&stores.counters), calendar.clone());
        let aggregator = InvoiceAggregator::new(
            Arc::clone(&stores.attendance),
            Arc::clone(&stores.invoices),
            numbering,
            calendar.clone(),
        );
        Self {
            stores,
            calendar,
            identity,
            aggregator,
            renderer,
            output_dir,
        }
    }

    /// Backend handles
    #[must_use]
    pub const fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Practice calendar
    #[must_use]
    pub const fn calendar(&self) -> &PracticeCalendar {
        &self.calendar
    }

    /// Acting therapist
    #[must_use]
    pub const fn identity(&self) -> &TherapistIdentity {
        &self.identity
    }

    /// Directory rendered documents are written to
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    // Patients

    /// See [`patient::add_patient`].
    pub async fn add_patient(&self, new_patient: NewPatient) -> Result<Patient> {
        patient::add_patient(self.stores.patients.as_ref(), &self.calendar, new_patient).await
    }

    /// See [`patient::get_patient`].
    pub async fn patient(&self, patient_id: i64) -> Result<Patient> {
        patient::get_patient(self.stores.patients.as_ref(), patient_id).await
    }

    /// All patients, newest first.
    pub async fn patients(&self) -> Listing<Patient> {
        Listing::from_result(
            patient::list_patients(self.stores.patients.as_ref()).await,
            "patients",
        )
    }

    /// See [`patient::update_patient`].
    pub async fn update_patient(&self, patient_id: i64, update: PatientUpdate) -> Result<Patient> {
        patient::update_patient(
            self.stores.patients.as_ref(),
            &self.calendar,
            patient_id,
            update,
        )
        .await
    }

    /// See [`patient::delete_patient`].
    pub async fn delete_patient(&self, patient_id: i64) -> Result<()> {
        patient::delete_patient(
            self.stores.patients.as_ref(),
            self.stores.attendance.as_ref(),
            patient_id,
        )
        .await
    }

    // Attendance

    /// Marks today's session for a patient.
    pub async fn mark_attendance(
        &self,
        patient_id: i64,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord> {
        attendance::mark_attendance(
            self.stores.attendance.as_ref(),
            &self.calendar,
            patient_id,
            status,
        )
        .await
    }

    /// Backdates a session.
    pub async fn record_past_attendance(
        &self,
        patient_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        attendance::record_past_attendance(
            self.stores.attendance.as_ref(),
            &self.calendar,
            patient_id,
            status,
            timestamp,
        )
        .await
    }

    /// Edits a session's status, restamping it with the current time.
    pub async fn update_attendance(
        &self,
        attendance_id: i64,
        status: AttendanceStatus,
    ) -> Result<()> {
        attendance::update_attendance(
            self.stores.attendance.as_ref(),
            &self.calendar,
            attendance_id,
            status,
        )
        .await
    }

    /// Removes a session.
    pub async fn delete_attendance(&self, attendance_id: i64) -> Result<()> {
        attendance::delete_attendance(self.stores.attendance.as_ref(), attendance_id).await
    }

    /// A patient's sessions, newest first.
    pub async fn attendance_history(&self, patient_id: i64) -> Listing<AttendanceRecord> {
        Listing::from_result(
            attendance::attendance_history(self.stores.attendance.as_ref(), patient_id).await,
            "attendance history",
        )
    }

    /// The record shown as today's status for a patient.
    pub async fn todays_record(&self, patient_id: i64) -> Result<Option<AttendanceRecord>> {
        let history =
            attendance::attendance_history(self.stores.attendance.as_ref(), patient_id).await?;
        Ok(attendance::todays_record(&history, &self.calendar).cloned())
    }

    // Profile

    /// The acting therapist's stored profile.
    pub async fn profile(&self) -> Result<Option<TherapistProfile>> {
        profile::get_profile(self.stores.profiles.as_ref(), &self.identity.uid).await
    }

    /// Merges changes into the acting therapist's profile.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<TherapistProfile> {
        profile::update_profile(
            self.stores.profiles.as_ref(),
            &self.calendar,
            &self.identity.uid,
            update,
        )
        .await
    }

    // Invoices

    /// The current calendar month, the default billing period.
    #[must_use]
    pub fn this_month(&self) -> DateRange {
        self.calendar.this_month()
    }

    /// What an invoice for the period would contain; allocates nothing.
    pub async fn preview_invoice(
        &self,
        patient_id: i64,
        date_range: DateRange,
    ) -> Result<InvoicePreview> {
        self.aggregator.preview(patient_id, date_range).await
    }

    /// Issues an invoice for a patient and renders its document.
    ///
    /// The invoice is stored before rendering starts. A render failure is reported in
    /// [`IssuedInvoice::document`] and does not undo the invoice;
    /// [`Practice::regenerate_document`] retries it.
    ///
    /// An unreadable therapist profile is treated as absent, leaving its lines blank.
    ///
    /// # Errors
    /// Fails only if nothing was stored: validation, patient lookup, numbering or
    /// persistence errors.
    #[instrument(skip(self, full_name))]
    pub async fn generate_invoice(
        &self,
        patient_id: i64,
        date_range: DateRange,
        full_name: &str,
        per_session_rate: f64,
    ) -> Result<IssuedInvoice> {
        validate_terms(&date_range, full_name, per_session_rate)?;

        let patient = self.patient(patient_id).await?;
        let stored_profile = self.profile().await.unwrap_or_else(|e| {
            warn!(
                "Issuing invoice without stored profile for {}: {}",
                self.identity.uid, e
            );
            None
        });
        let request = InvoiceRequest {
            patient: PatientSnapshot::from(&patient),
            therapist: therapist_snapshot(&self.identity, stored_profile.as_ref()),
            date_range,
            full_name: full_name.to_string(),
            per_session_rate,
        };

        let invoice = self.aggregator.build_invoice(request).await?;
        let document = export_invoice(self.renderer.as_ref(), &invoice, &self.output_dir).await;
        if let Err(e) = &document {
            warn!(
                "Invoice {} stored without a document: {}",
                invoice.invoice_number, e
            );
        }
        Ok(IssuedInvoice { invoice, document })
    }

    /// Looks up one invoice.
    pub async fn get_invoice(&self, invoice_id: i64) -> Result<Invoice> {
        self.stores
            .invoices
            .get(invoice_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "invoice",
                id: invoice_id,
            })
    }

    /// A patient's invoices, newest first.
    pub async fn invoices_for_patient(&self, patient_id: i64) -> Listing<Invoice> {
        Listing::from_result(
            self.stores.invoices.list_by_patient(patient_id).await,
            "invoices",
        )
    }

    /// Every invoice, newest first.
    pub async fn all_invoices(&self) -> Listing<Invoice> {
        Listing::from_result(self.stores.invoices.list_all().await, "invoices")
    }

    /// Renders a stored invoice again and writes it to the output directory.
    pub async fn regenerate_document(&self, invoice_id: i64) -> Result<PathBuf> {
        let invoice = self.get_invoice(invoice_id).await?;
        export_invoice(self.renderer.as_ref(), &invoice, &self.output_dir).await
    }

    /// See [`toggle_invoice_paid`].
    pub async fn toggle_invoice_paid(
        &self,
        invoices: &mut [Invoice],
        invoice_id: i64,
        is_paid: bool,
    ) -> Result<()> {
        toggle_invoice_paid(&self.stores, invoices, invoice_id, is_paid).await
    }

    /// Permanently removes an invoice; attendance is untouched.
    pub async fn delete_invoice(&self, invoice_id: i64) -> Result<()> {
        self.stores.invoices.delete(invoice_id).await?;
        info!("Deleted invoice {}", invoice_id);
        Ok(())
    }

    // Analytics

    /// Attendance overview across every patient, lowest rate first.
    pub async fn practice_attendance(
        &self,
        date_range: Option<DateRange>,
    ) -> Report<PracticeAttendance> {
        Report::from_result(
            self.load_practice_attendance(date_range).await,
            "attendance overview",
        )
    }

    async fn load_practice_attendance(
        &self,
        date_range: Option<DateRange>,
    ) -> Result<PracticeAttendance> {
        let patients = self.stores.patients.list().await?;
        let mut histories = Vec::with_capacity(patients.len());
        for patient in patients {
            let records = self.stores.attendance.list_by_patient(patient.id).await?;
            histories.push((patient, records));
        }
        Ok(practice_attendance(
            &histories,
            date_range.as_ref(),
            &self.calendar,
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::render::pdf::PdfRenderer;
    use crate::test_utils::*;
    use chrono::{NaiveDate, TimeZone};

    fn practice_with(stores: Stores, output_dir: PathBuf) -> Practice {
        let calendar = test_calendar(fixed_clock_at(2026, 2, 10));
        Practice::new(
            stores,
            calendar.clone(),
            TherapistIdentity {
                uid: "therapist-1".to_string(),
                display_name: None,
                email: Some("asha@physio.in".to_string()),
            },
            Arc::new(PdfRenderer::new(calendar)),
            output_dir,
        )
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_invoice_end_to_end() -> Result<()> {
        init_test_tracing();
        let dir = std::env::temp_dir().join(format!("physio-practice-{}", std::process::id()));
        let db = setup_test_db().await?;
        let practice = practice_with(Stores::database(db), dir.clone());

        let patient = practice
            .add_patient(NewPatient {
                name: "Ravi".to_string(),
                contact: "98860 00000".to_string(),
                address: "Indiranagar".to_string(),
            })
            .await?;
        practice
            .update_profile(ProfileUpdate {
                registration_number: Some("IAP-77".to_string()),
                address: None,
            })
            .await?;
        for (day, status) in [
            (5, AttendanceStatus::Present),
            (6, AttendanceStatus::Absent),
            (7, AttendanceStatus::Present),
        ] {
            let at = Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap();
            practice.record_past_attendance(patient.id, status, at).await?;
        }

        let issued = practice
            .generate_invoice(patient.id, january(), "Ravi Kumar", 500.0)
            .await?;
        let path = issued.document?;

        assert_eq!(issued.invoice.invoice_number, "INV-2026-001");
        assert_eq!(issued.invoice.present_sessions, 2);
        assert_eq!(issued.invoice.therapist_name, "asha");
        assert_eq!(issued.invoice.therapist_registration_number, "IAP-77");
        assert_eq!(issued.invoice.therapist_address, "");
        assert!(path.ends_with("Invoice_Ravi_INV-2026-001.pdf"));
        assert_eq!(
            practice.regenerate_document(issued.invoice.id).await?,
            path
        );

        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_profile_leaves_profile_lines_blank() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("physio-no-profile-{}", std::process::id()));
        let stores = Stores {
            profiles: Arc::new(FailingProfileStore),
            ..Stores::in_memory()
        };
        let practice = practice_with(stores, dir.clone());
        let patient = practice
            .add_patient(NewPatient {
                name: "Ravi".to_string(),
                ..NewPatient::default()
            })
            .await?;
        let at = Utc.with_ymd_and_hms(2026, 1, 12, 10, 0, 0).unwrap();
        practice
            .record_past_attendance(patient.id, AttendanceStatus::Present, at)
            .await?;

        let issued = practice
            .generate_invoice(patient.id, january(), "Ravi Kumar", 800.0)
            .await?;

        assert_eq!(issued.invoice.invoice_number, "INV-2026-001");
        assert_eq!(issued.invoice.therapist_name, "asha");
        assert_eq!(issued.invoice.therapist_registration_number, "");
        assert_eq!(issued.invoice.therapist_address, "");
        assert!(issued.document.is_ok());

        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_validates_before_lookup() {
        let practice = practice_with(Stores::in_memory(), std::env::temp_dir());
        // Patient 42 does not exist; validation must still win
        let result = practice.generate_invoice(42, january(), "Ravi", 0.0).await;
        assert!(matches!(
            result,
            Err(Error::Validation {
                field: "per_session_rate",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_paid_toggle_changes_only_target() -> Result<()> {
        let stores = Stores::in_memory();
        let target = stores
            .invoices
            .create(sample_draft("INV-2026-001", 1, 2))
            .await?;
        let other = stores
            .invoices
            .create(sample_draft("INV-2026-002", 1, 1))
            .await?;
        let practice = practice_with(stores, std::env::temp_dir());

        let mut listed = practice.all_invoices().await.items;
        practice
            .toggle_invoice_paid(&mut listed, target.id, true)
            .await?;

        let mut expected = target.clone();
        expected.is_paid = true;
        assert_eq!(practice.get_invoice(target.id).await?, expected);
        assert_eq!(practice.get_invoice(other.id).await?, other);
        assert!(listed.iter().find(|i| i.id == target.id).unwrap().is_paid);
        assert!(!listed.iter().find(|i| i.id == other.id).unwrap().is_paid);
        Ok(())
    }

    #[tokio::test]
    async fn test_paid_toggle_reverts_on_failure() {
        let stores = Stores::in_memory();
        let mut invoices = vec![sample_invoice(1, 1)];
        let id = invoices[0].id;
        // The store has never seen this invoice, so the update fails
        let result = toggle_invoice_paid(&stores, &mut invoices, id, true).await;
        assert!(result.is_err());
        assert!(!invoices[0].is_paid);
    }

    #[test]
    fn test_failed_read_becomes_banner() {
        let listing: Listing<Invoice> = Listing::from_result(
            Err(Error::StoreUnavailable {
                reason: "connection reset".to_string(),
            }),
            "invoices",
        );
        assert!(listing.items.is_empty());
        assert_eq!(
            listing.banner.as_deref(),
            Some("Could not reach the server. Showing no results for now.")
        );
    }

    #[tokio::test]
    async fn test_failed_overview_read_becomes_banner() {
        let stores = Stores {
            patients: Arc::new(FailingPatientStore),
            ..Stores::in_memory()
        };
        let practice = practice_with(stores, std::env::temp_dir());

        let report = practice.practice_attendance(None).await;

        assert_eq!(report.value, PracticeAttendance::default());
        assert_eq!(
            report.banner.as_deref(),
            Some("Could not reach the server. Showing no results for now.")
        );
    }

    #[tokio::test]
    async fn test_delete_invoice_keeps_attendance() -> Result<()> {
        let practice = practice_with(Stores::in_memory(), std::env::temp_dir());
        let patient = practice
            .add_patient(NewPatient {
                name: "Leela".to_string(),
                ..NewPatient::default()
            })
            .await?;
        let at = Utc.with_ymd_and_hms(2026, 1, 9, 10, 0, 0).unwrap();
        practice
            .record_past_attendance(patient.id, AttendanceStatus::Present, at)
            .await?;
        let invoice = practice
            .stores()
            .invoices
            .create(sample_draft("INV-2026-001", patient.id, 1))
            .await?;

        practice.delete_invoice(invoice.id).await?;

        assert!(practice.invoices_for_patient(patient.id).await.items.is_empty());
        assert_eq!(practice.attendance_history(patient.id).await.items.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_analytics_across_patients() -> Result<()> {
        let practice = practice_with(Stores::in_memory(), std::env::temp_dir());
        let steady = practice
            .add_patient(NewPatient {
                name: "Steady".to_string(),
                ..NewPatient::default()
            })
            .await?;
        let patchy = practice
            .add_patient(NewPatient {
                name: "Patchy".to_string(),
                ..NewPatient::default()
            })
            .await?;
        let at = Utc.with_ymd_and_hms(2026, 1, 9, 10, 0, 0).unwrap();
        practice
            .record_past_attendance(steady.id, AttendanceStatus::Present, at)
            .await?;
        practice
            .record_past_attendance(patchy.id, AttendanceStatus::Absent, at)
            .await?;

        let report = practice.practice_attendance(None).await;
        assert!(report.banner.is_none());
        let overview = report.value;
        assert_eq!(overview.patients[0].patient_name, "Patchy");
        assert_eq!(overview.overall.attendance_rate, 50);
        Ok(())
    }
}
