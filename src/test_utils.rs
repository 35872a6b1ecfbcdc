//! Shared test utilities for physio-billing.
//!
//! This module provides helpers for setting up test databases, pinned clocks, sample
//! records with sensible defaults, and stores that fail on demand.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        calendar::{FixedClock, PracticeCalendar},
        invoice::InvoiceAggregator,
        numbering::NumberingService,
    },
    errors::{Error, Result},
    models::{
        AttendanceStatus, DateRange, Invoice, InvoiceDraft, InvoiceSession, Patient, PatientDraft,
        PatientSnapshot, PatientUpdate, TherapistProfile, TherapistSnapshot,
    },
    store::{CounterStore, InvoiceStore, PatientStore, ProfileStore, Stores, memory::MemoryStore},
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Routes `tracing` output through the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A clock pinned at noon UTC on the given day.
pub fn fixed_clock_at(year: i32, month: u32, day: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
    ))
}

/// A UTC practice calendar reading `clock`.
pub fn test_calendar(clock: Arc<FixedClock>) -> PracticeCalendar {
    PracticeCalendar::new(FixedOffset::east_opt(0).unwrap(), clock)
}

/// An aggregator wired to `stores` with a UTC calendar reading `clock`.
pub fn test_aggregator(stores: &Stores, clock: Arc<FixedClock>) -> InvoiceAggregator {
    let calendar = test_calendar(clock);
    InvoiceAggregator::new(
        Arc::clone(&stores.attendance),
        Arc::clone(&stores.invoices),
        NumberingService::new(Arc::clone(&stores.counters), calendar.clone()),
        calendar,
    )
}

/// A patient row with sensible defaults.
///
/// # Defaults
/// * `contact`: "98450 00000"
/// * `address`: "12 MG Road, Bengaluru"
/// * `created_at`: 2026-01-01 09:00 UTC
pub fn sample_patient_draft(name: &str) -> PatientDraft {
    PatientDraft {
        name: name.to_string(),
        patient_code: format!("PT-000001-{}", name.len()),
        contact: "98450 00000".to_string(),
        address: "12 MG Road, Bengaluru".to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
    }
}

/// A stored patient with the same defaults as [`sample_patient_draft`].
pub fn sample_patient(id: i64, name: &str) -> Patient {
    let draft = sample_patient_draft(name);
    Patient {
        id,
        name: draft.name,
        patient_code: draft.patient_code,
        contact: draft.contact,
        address: draft.address,
        created_at: draft.created_at,
        updated_at: None,
    }
}

/// Snapshot of [`sample_patient`].
pub fn sample_patient_snapshot(id: i64, name: &str) -> PatientSnapshot {
    PatientSnapshot::from(&sample_patient(id, name))
}

/// Therapist `therapist-1` with a full profile.
pub fn sample_therapist_snapshot() -> TherapistSnapshot {
    TherapistSnapshot {
        uid: "therapist-1".to_string(),
        name: "Dr. Asha Nair".to_string(),
        email: "asha@physio.in".to_string(),
        registration_number: "IAP-L-1042".to_string(),
        address: "3 Residency Road\nBengaluru".to_string(),
    }
}

fn sample_sessions(count: u32) -> Vec<InvoiceSession> {
    let first = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
    (0..count)
        .rev()
        .map(|day| {
            let at = first + TimeDelta::hours(i64::from(day) * 9);
            InvoiceSession {
                date: at,
                status: AttendanceStatus::Present,
                timestamp: at,
            }
        })
        .collect()
}

/// An invoice draft for "Ravi" billing `sessions` present sessions at 500, newest first.
pub fn sample_draft(invoice_number: &str, patient_id: i64, sessions: u32) -> InvoiceDraft {
    let therapist = sample_therapist_snapshot();
    InvoiceDraft {
        invoice_number: invoice_number.to_string(),
        patient_id,
        patient_name: "Ravi".to_string(),
        patient_full_name: "Ravi Kumar".to_string(),
        patient_contact: "98450 00000".to_string(),
        patient_address: "12 MG Road, Bengaluru".to_string(),
        therapist_name: therapist.name,
        therapist_email: therapist.email,
        therapist_registration_number: therapist.registration_number,
        therapist_address: therapist.address,
        date_range: DateRange {
            start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        },
        sessions: sample_sessions(sessions),
        per_session_rate: 500.0,
        total_sessions: sessions,
        present_sessions: sessions,
        total_amount: f64::from(sessions) * 500.0,
        is_paid: false,
        created_at: Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap(),
        created_by: therapist.uid,
    }
}

/// Invoice 1, `INV-2026-001`, with `present` billed sessions out of `total`.
pub fn sample_invoice(total: u32, present: u32) -> Invoice {
    let mut draft = sample_draft("INV-2026-001", 1, present);
    draft.total_sessions = total;
    draft.with_id(1)
}

/// A counter whose backend is never reachable
pub struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn transactional_increment(&self, _key: &str) -> Result<u64> {
        Err(Error::StoreUnavailable {
            reason: "counter backend offline".to_string(),
        })
    }
}

fn offline(what: &str) -> Error {
    Error::StoreUnavailable {
        reason: format!("{what} offline"),
    }
}

/// A profile store whose backend is never reachable
pub struct FailingProfileStore;

#[async_trait]
impl ProfileStore for FailingProfileStore {
    async fn get(&self, _uid: &str) -> Result<Option<TherapistProfile>> {
        Err(offline("profiles"))
    }

    async fn upsert(&self, _profile: TherapistProfile) -> Result<TherapistProfile> {
        Err(offline("profiles"))
    }
}

/// A patient store whose backend is never reachable
pub struct FailingPatientStore;

#[async_trait]
impl PatientStore for FailingPatientStore {
    async fn create(&self, _draft: PatientDraft) -> Result<Patient> {
        Err(offline("patients"))
    }

    async fn get(&self, _patient_id: i64) -> Result<Option<Patient>> {
        Err(offline("patients"))
    }

    async fn list(&self) -> Result<Vec<Patient>> {
        Err(offline("patients"))
    }

    async fn update(
        &self,
        _patient_id: i64,
        _update: PatientUpdate,
        _updated_at: DateTime<Utc>,
    ) -> Result<Patient> {
        Err(offline("patients"))
    }

    async fn delete(&self, _patient_id: i64) -> Result<()> {
        Err(offline("patients"))
    }
}

/// An in-memory invoice store that rejects a set number of `create` calls first
pub struct FlakyInvoiceStore {
    inner: MemoryStore,
    failures_left: AtomicUsize,
}

impl FlakyInvoiceStore {
    /// Fails the next `count` creates, then behaves normally.
    pub fn failing_next(count: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            failures_left: AtomicUsize::new(count),
        }
    }
}

#[async_trait]
impl InvoiceStore for FlakyInvoiceStore {
    async fn create(&self, draft: InvoiceDraft) -> Result<Invoice> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::StoreUnavailable {
                reason: "write timed out".to_string(),
            });
        }
        InvoiceStore::create(&self.inner, draft).await
    }

    async fn get(&self, invoice_id: i64) -> Result<Option<Invoice>> {
        InvoiceStore::get(&self.inner, invoice_id).await
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Invoice>> {
        InvoiceStore::list_by_patient(&self.inner, patient_id).await
    }

    async fn list_all(&self) -> Result<Vec<Invoice>> {
        self.inner.list_all().await
    }

    async fn set_paid(&self, invoice_id: i64, is_paid: bool) -> Result<()> {
        self.inner.set_paid(invoice_id, is_paid).await
    }

    async fn delete(&self, invoice_id: i64) -> Result<()> {
        InvoiceStore::delete(&self.inner, invoice_id).await
    }
}
