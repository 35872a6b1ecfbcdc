//! In-process implementations of every store trait.
//!
//! All collections sit behind one mutex, so each operation (including the counter
//! increment) is atomic with respect to every other. The lock is never held across an
//! `.await`.

use super::{AttendanceStore, CounterStore, InvoiceStore, PatientStore, ProfileStore};
use crate::errors::{Error, Result};
use crate::models::{
    AttendanceRecord, AttendanceStatus, Invoice, InvoiceDraft, Patient, PatientDraft,
    PatientUpdate, TherapistProfile, sort_invoices,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    patients: BTreeMap<i64, Patient>,
    attendance: BTreeMap<i64, AttendanceRecord>,
    invoices: BTreeMap<i64, Invoice>,
    counters: HashMap<String, u64>,
    profiles: HashMap<String, TherapistProfile>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Every collection held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| Error::StoreUnavailable {
            reason: "Failed to acquire memory store lock".to_string(),
        })
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<AttendanceRecord>> {
        let state = self.lock()?;
        let mut records: Vec<AttendanceRecord> = state
            .attendance
            .values()
            .filter(|record| record.patient_id == patient_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn create(
        &self,
        patient_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let mut state = self.lock()?;
        let record = AttendanceRecord {
            id: state.allocate_id(),
            patient_id,
            status,
            timestamp,
        };
        state.attendance.insert(record.id, record.clone());
        debug!(
            "Memory store: attendance {} for patient {} ({})",
            record.id, patient_id, status
        );
        Ok(record)
    }

    async fn update(
        &self,
        attendance_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let record = state
            .attendance
            .get_mut(&attendance_id)
            .ok_or(Error::NotFound {
                entity: "attendance record",
                id: attendance_id,
            })?;
        record.status = status;
        record.timestamp = timestamp;
        Ok(())
    }

    async fn delete(&self, attendance_id: i64) -> Result<()> {
        self.lock()?.attendance.remove(&attendance_id);
        Ok(())
    }

    async fn delete_by_patient(&self, patient_id: i64) -> Result<u64> {
        let mut state = self.lock()?;
        let before = state.attendance.len();
        state
            .attendance
            .retain(|_, record| record.patient_id != patient_id);
        Ok((before - state.attendance.len()) as u64)
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn create(&self, draft: InvoiceDraft) -> Result<Invoice> {
        let mut state = self.lock()?;
        let invoice = draft.with_id(state.allocate_id());
        state.invoices.insert(invoice.id, invoice.clone());
        info!(
            "Memory store: saved invoice {} as id {}",
            invoice.invoice_number, invoice.id
        );
        Ok(invoice)
    }

    async fn get(&self, invoice_id: i64) -> Result<Option<Invoice>> {
        Ok(self.lock()?.invoices.get(&invoice_id).cloned())
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self
            .lock()?
            .invoices
            .values()
            .filter(|invoice| invoice.patient_id == patient_id)
            .cloned()
            .collect();
        sort_invoices(&mut invoices);
        Ok(invoices)
    }

    async fn list_all(&self) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self.lock()?.invoices.values().cloned().collect();
        sort_invoices(&mut invoices);
        Ok(invoices)
    }

    async fn set_paid(&self, invoice_id: i64, is_paid: bool) -> Result<()> {
        let mut state = self.lock()?;
        let invoice = state.invoices.get_mut(&invoice_id).ok_or(Error::NotFound {
            entity: "invoice",
            id: invoice_id,
        })?;
        invoice.is_paid = is_paid;
        Ok(())
    }

    async fn delete(&self, invoice_id: i64) -> Result<()> {
        self.lock()?.invoices.remove(&invoice_id);
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn transactional_increment(&self, key: &str) -> Result<u64> {
        let mut state = self.lock()?;
        let count = state.counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn create(&self, draft: PatientDraft) -> Result<Patient> {
        let mut state = self.lock()?;
        let patient = Patient {
            id: state.allocate_id(),
            name: draft.name,
            patient_code: draft.patient_code,
            contact: draft.contact,
            address: draft.address,
            created_at: draft.created_at,
            updated_at: None,
        };
        state.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get(&self, patient_id: i64) -> Result<Option<Patient>> {
        Ok(self.lock()?.patients.get(&patient_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.lock()?.patients.values().cloned().collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(patients)
    }

    async fn update(
        &self,
        patient_id: i64,
        update: PatientUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Patient> {
        let mut state = self.lock()?;
        let patient = state.patients.get_mut(&patient_id).ok_or(Error::NotFound {
            entity: "patient",
            id: patient_id,
        })?;
        if let Some(name) = update.name {
            patient.name = name;
        }
        if let Some(contact) = update.contact {
            patient.contact = contact;
        }
        if let Some(address) = update.address {
            patient.address = address;
        }
        patient.updated_at = Some(updated_at);
        Ok(patient.clone())
    }

    async fn delete(&self, patient_id: i64) -> Result<()> {
        self.lock()?.patients.remove(&patient_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, uid: &str) -> Result<Option<TherapistProfile>> {
        Ok(self.lock()?.profiles.get(uid).cloned())
    }

    async fn upsert(&self, profile: TherapistProfile) -> Result<TherapistProfile> {
        self.lock()?
            .profiles
            .insert(profile.uid.clone(), profile.clone());
        Ok(profile)
    }
}
