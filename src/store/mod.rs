//! Store seams between the billing core and its backend.
//!
//! Each collection the practice keeps is behind a trait. [`memory`] holds in-process
//! implementations used for demos and tests; [`database`] holds the `SeaORM` ones. A
//! [`Stores`] bundle is built once at startup and passed down, so nothing below this
//! point branches on which backend is running.

/// `SeaORM`-backed stores
pub mod database;
/// In-process stores
pub mod memory;

use crate::errors::Result;
use crate::models::{
    AttendanceRecord, AttendanceStatus, Invoice, InvoiceDraft, Patient, PatientDraft,
    PatientUpdate, TherapistProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Per-patient attendance events
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// All records for a patient, newest first.
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<AttendanceRecord>>;

    /// Stores a new record and returns it with its assigned id.
    async fn create(
        &self,
        patient_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;

    /// Overwrites status and timestamp of an existing record.
    async fn update(
        &self,
        attendance_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;

    /// Permanently removes one record.
    async fn delete(&self, attendance_id: i64) -> Result<()>;

    /// Permanently removes every record of a patient, returning how many were removed.
    async fn delete_by_patient(&self, patient_id: i64) -> Result<u64>;
}

/// Issued invoices
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persists a draft and returns it with its assigned id.
    async fn create(&self, draft: InvoiceDraft) -> Result<Invoice>;

    /// Looks up one invoice.
    async fn get(&self, invoice_id: i64) -> Result<Option<Invoice>>;

    /// A patient's invoices, newest `created_at` first, ties by ascending id.
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Invoice>>;

    /// Every invoice, same ordering as [`InvoiceStore::list_by_patient`].
    async fn list_all(&self) -> Result<Vec<Invoice>>;

    /// Sets the paid flag and nothing else.
    async fn set_paid(&self, invoice_id: i64, is_paid: bool) -> Result<()>;

    /// Permanently removes an invoice.
    async fn delete(&self, invoice_id: i64) -> Result<()>;
}

/// Keyed counters with an atomic increment
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically adds one to the counter at `key`, creating it at zero first if missing,
    /// and returns the new value.
    async fn transactional_increment(&self, key: &str) -> Result<u64>;
}

/// Patient records
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Persists a new patient.
    async fn create(&self, draft: PatientDraft) -> Result<Patient>;

    /// Looks up one patient.
    async fn get(&self, patient_id: i64) -> Result<Option<Patient>>;

    /// Every patient, newest first.
    async fn list(&self) -> Result<Vec<Patient>>;

    /// Applies a partial edit and stamps `updated_at`.
    async fn update(
        &self,
        patient_id: i64,
        update: PatientUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Patient>;

    /// Permanently removes a patient.
    async fn delete(&self, patient_id: i64) -> Result<()>;
}

/// Therapist registration details
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile for `uid`, if one was ever saved.
    async fn get(&self, uid: &str) -> Result<Option<TherapistProfile>>;

    /// Inserts or replaces the profile.
    async fn upsert(&self, profile: TherapistProfile) -> Result<TherapistProfile>;
}

/// One handle per collection, chosen once at startup
#[derive(Clone)]
pub struct Stores {
    /// Patient records
    pub patients: Arc<dyn PatientStore>,
    /// Attendance events
    pub attendance: Arc<dyn AttendanceStore>,
    /// Issued invoices
    pub invoices: Arc<dyn InvoiceStore>,
    /// Invoice number counters
    pub counters: Arc<dyn CounterStore>,
    /// Therapist profiles
    pub profiles: Arc<dyn ProfileStore>,
}

impl Stores {
    /// Fresh in-process stores.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            patients: Arc::clone(&store) as Arc<dyn PatientStore>,
            attendance: Arc::clone(&store) as Arc<dyn AttendanceStore>,
            invoices: Arc::clone(&store) as Arc<dyn InvoiceStore>,
            counters: Arc::clone(&store) as Arc<dyn CounterStore>,
            profiles: store,
        }
    }

    /// Stores backed by an open database connection.
    #[must_use]
    pub fn database(db: DatabaseConnection) -> Self {
        let store = Arc::new(database::DatabaseStore::new(db));
        Self {
            patients: Arc::clone(&store) as Arc<dyn PatientStore>,
            attendance: Arc::clone(&store) as Arc<dyn AttendanceStore>,
            invoices: Arc::clone(&store) as Arc<dyn InvoiceStore>,
            counters: Arc::clone(&store) as Arc<dyn CounterStore>,
            profiles: store,
        }
    }
}
