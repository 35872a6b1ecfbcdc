//! `SeaORM` implementations of every store trait.
//!
//! Entity models are converted into [`crate::models`] values at this boundary. Writes that
//! touch more than one table (an invoice and its sessions) run inside one transaction.
//! The counter increment is an insert-if-absent followed by an atomic
//! `count = count + 1` update inside a transaction, so concurrent callers never read the
//! same base value.

use super::{AttendanceStore, CounterStore, InvoiceStore, PatientStore, ProfileStore};
use crate::entities::{
    Attendance, Invoice as InvoiceEntity, InvoiceCounter, InvoiceSession, Patient as PatientEntity,
    TherapistProfile as ProfileEntity, attendance, invoice, invoice_counter, invoice_session,
    patient, therapist_profile,
};
use crate::errors::{Error, Result};
use crate::models::{
    AttendanceRecord, AttendanceStatus, DateRange, Invoice, InvoiceDraft, InvoiceSession as Session,
    Patient, PatientDraft, PatientUpdate, TherapistProfile, sort_invoices,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{IntoActiveModel, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Every collection stored through one `SeaORM` connection
#[derive(Debug)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    /// Wraps an open connection; tables must already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Underlying connection
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn count_from_db(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::StoreUnavailable {
        reason: format!("Stored {column} value {value} is out of range"),
    })
}

fn attendance_from_model(model: attendance::Model) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: model.id,
        patient_id: model.patient_id,
        status: model.status.parse()?,
        timestamp: model.timestamp,
    })
}

fn patient_from_model(model: patient::Model) -> Patient {
    Patient {
        id: model.id,
        name: model.name,
        patient_code: model.patient_code,
        contact: model.contact,
        address: model.address,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn profile_from_model(model: therapist_profile::Model) -> TherapistProfile {
    TherapistProfile {
        uid: model.uid,
        registration_number: model.registration_number,
        address: model.address,
        updated_at: model.updated_at,
    }
}

fn invoice_from_models(
    model: invoice::Model,
    mut sessions: Vec<invoice_session::Model>,
) -> Result<Invoice> {
    sessions.sort_by_key(|session| session.position);
    let sessions = sessions
        .into_iter()
        .map(|session| {
            Ok(Session {
                date: session.date,
                status: session.status.parse()?,
                timestamp: session.timestamp,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Invoice {
        id: model.id,
        invoice_number: model.invoice_number,
        patient_id: model.patient_id,
        patient_name: model.patient_name,
        patient_full_name: model.patient_full_name,
        patient_contact: model.patient_contact,
        patient_address: model.patient_address,
        therapist_name: model.therapist_name,
        therapist_email: model.therapist_email,
        therapist_registration_number: model.therapist_registration_number,
        therapist_address: model.therapist_address,
        date_range: DateRange {
            start: model.start_date,
            end: model.end_date,
        },
        sessions,
        per_session_rate: model.per_session_rate,
        total_sessions: count_from_db(model.total_sessions, "total_sessions")?,
        present_sessions: count_from_db(model.present_sessions, "present_sessions")?,
        total_amount: model.total_amount,
        is_paid: model.is_paid,
        created_at: model.created_at,
        created_by: model.created_by,
    })
}

fn invoices_from_rows(
    rows: Vec<(invoice::Model, Vec<invoice_session::Model>)>,
) -> Result<Vec<Invoice>> {
    let mut invoices = rows
        .into_iter()
        .map(|(model, sessions)| invoice_from_models(model, sessions))
        .collect::<Result<Vec<_>>>()?;
    sort_invoices(&mut invoices);
    Ok(invoices)
}

#[async_trait]
impl AttendanceStore for DatabaseStore {
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<AttendanceRecord>> {
        Attendance::find()
            .filter(attendance::Column::PatientId.eq(patient_id))
            .order_by_desc(attendance::Column::Timestamp)
            .order_by_desc(attendance::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(attendance_from_model)
            .collect()
    }

    #[instrument(skip(self))]
    async fn create(
        &self,
        patient_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let model = attendance::ActiveModel {
            patient_id: Set(patient_id),
            status: Set(status.as_str().to_string()),
            timestamp: Set(timestamp),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        debug!("Created attendance_id {} for patient_id {}", model.id, patient_id);
        attendance_from_model(model)
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        attendance_id: i64,
        status: AttendanceStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let mut record = Attendance::find_by_id(attendance_id)
            .one(&self.db)
            .await?
            .ok_or(Error::NotFound {
                entity: "attendance record",
                id: attendance_id,
            })?
            .into_active_model();
        record.status = Set(status.as_str().to_string());
        record.timestamp = Set(timestamp);
        record.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, attendance_id: i64) -> Result<()> {
        let result = Attendance::delete_by_id(attendance_id).exec(&self.db).await?;
        debug!(
            "Deleted attendance_id {} ({} rows)",
            attendance_id, result.rows_affected
        );
        Ok(())
    }

    async fn delete_by_patient(&self, patient_id: i64) -> Result<u64> {
        let result = Attendance::delete_many()
            .filter(attendance::Column::PatientId.eq(patient_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl InvoiceStore for DatabaseStore {
    #[instrument(skip(self, draft), fields(invoice_number = %draft.invoice_number))]
    async fn create(&self, draft: InvoiceDraft) -> Result<Invoice> {
        let txn = self.db.begin().await?;

        let model = invoice::ActiveModel {
            invoice_number: Set(draft.invoice_number.clone()),
            patient_id: Set(draft.patient_id),
            patient_name: Set(draft.patient_name.clone()),
            patient_full_name: Set(draft.patient_full_name.clone()),
            patient_contact: Set(draft.patient_contact.clone()),
            patient_address: Set(draft.patient_address.clone()),
            therapist_name: Set(draft.therapist_name.clone()),
            therapist_email: Set(draft.therapist_email.clone()),
            therapist_registration_number: Set(draft.therapist_registration_number.clone()),
            therapist_address: Set(draft.therapist_address.clone()),
            start_date: Set(draft.date_range.start),
            end_date: Set(draft.date_range.end),
            per_session_rate: Set(draft.per_session_rate),
            total_sessions: Set(i64::from(draft.total_sessions)),
            present_sessions: Set(i64::from(draft.present_sessions)),
            total_amount: Set(draft.total_amount),
            is_paid: Set(draft.is_paid),
            created_at: Set(draft.created_at),
            created_by: Set(draft.created_by.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut session_rows = Vec::with_capacity(draft.sessions.len());
        for (position, session) in draft.sessions.iter().enumerate() {
            session_rows.push(invoice_session::ActiveModel {
                invoice_id: Set(model.id),
                position: Set(i32::try_from(position).map_err(|_| Error::StoreUnavailable {
                    reason: "Too many sessions on one invoice".to_string(),
                })?),
                date: Set(session.date),
                status: Set(session.status.as_str().to_string()),
                timestamp: Set(session.timestamp),
                ..Default::default()
            });
        }
        if !session_rows.is_empty() {
            InvoiceSession::insert_many(session_rows).exec(&txn).await?;
        }

        txn.commit().await?;
        info!("Saved invoice {} as id {}", draft.invoice_number, model.id);
        Ok(draft.with_id(model.id))
    }

    async fn get(&self, invoice_id: i64) -> Result<Option<Invoice>> {
        let Some(model) = InvoiceEntity::find_by_id(invoice_id).one(&self.db).await? else {
            return Ok(None);
        };
        let sessions = model.find_related(InvoiceSession).all(&self.db).await?;
        invoice_from_models(model, sessions).map(Some)
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Invoice>> {
        let rows = InvoiceEntity::find()
            .filter(invoice::Column::PatientId.eq(patient_id))
            .find_with_related(InvoiceSession)
            .all(&self.db)
            .await?;
        invoices_from_rows(rows)
    }

    async fn list_all(&self) -> Result<Vec<Invoice>> {
        let rows = InvoiceEntity::find()
            .find_with_related(InvoiceSession)
            .all(&self.db)
            .await?;
        invoices_from_rows(rows)
    }

    #[instrument(skip(self))]
    async fn set_paid(&self, invoice_id: i64, is_paid: bool) -> Result<()> {
        let result = InvoiceEntity::update_many()
            .col_expr(invoice::Column::IsPaid, Expr::value(is_paid))
            .filter(invoice::Column::Id.eq(invoice_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::NotFound {
                entity: "invoice",
                id: invoice_id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, invoice_id: i64) -> Result<()> {
        let txn = self.db.begin().await?;
        InvoiceSession::delete_many()
            .filter(invoice_session::Column::InvoiceId.eq(invoice_id))
            .exec(&txn)
            .await?;
        let result = InvoiceEntity::delete_by_id(invoice_id).exec(&txn).await?;
        txn.commit().await?;
        if result.rows_affected == 0 {
            warn!("Invoice {} was already deleted", invoice_id);
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for DatabaseStore {
    #[instrument(skip(self))]
    async fn transactional_increment(&self, key: &str) -> Result<u64> {
        let txn = self.db.begin().await?;

        // Lazily create the row at zero; a concurrent creator makes this a no-op
        InvoiceCounter::insert(invoice_counter::ActiveModel {
            key: Set(key.to_string()),
            count: Set(0),
        })
        .on_conflict(
            OnConflict::column(invoice_counter::Column::Key)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        InvoiceCounter::update_many()
            .col_expr(
                invoice_counter::Column::Count,
                Expr::col(invoice_counter::Column::Count).add(1),
            )
            .filter(invoice_counter::Column::Key.eq(key))
            .exec(&txn)
            .await?;

        let counter = InvoiceCounter::find_by_id(key.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| Error::StoreUnavailable {
                reason: format!("Counter {key} vanished mid-transaction"),
            })?;

        txn.commit().await?;

        u64::try_from(counter.count).map_err(|_| Error::StoreUnavailable {
            reason: format!("Counter {key} holds negative value {}", counter.count),
        })
    }
}

#[async_trait]
impl PatientStore for DatabaseStore {
    #[instrument(skip(self, draft), fields(patient_code = %draft.patient_code))]
    async fn create(&self, draft: PatientDraft) -> Result<Patient> {
        let model = patient::ActiveModel {
            name: Set(draft.name),
            patient_code: Set(draft.patient_code),
            contact: Set(draft.contact),
            address: Set(draft.address),
            created_at: Set(draft.created_at),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(patient_from_model(model))
    }

    async fn get(&self, patient_id: i64) -> Result<Option<Patient>> {
        Ok(PatientEntity::find_by_id(patient_id)
            .one(&self.db)
            .await?
            .map(patient_from_model))
    }

    async fn list(&self) -> Result<Vec<Patient>> {
        Ok(PatientEntity::find()
            .order_by_desc(patient::Column::CreatedAt)
            .order_by_asc(patient::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(patient_from_model)
            .collect())
    }

    #[instrument(skip(self, update))]
    async fn update(
        &self,
        patient_id: i64,
        update: PatientUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Patient> {
        let mut model = PatientEntity::find_by_id(patient_id)
            .one(&self.db)
            .await?
            .ok_or(Error::NotFound {
                entity: "patient",
                id: patient_id,
            })?
            .into_active_model();
        if let Some(name) = update.name {
            model.name = Set(name);
        }
        if let Some(contact) = update.contact {
            model.contact = Set(contact);
        }
        if let Some(address) = update.address {
            model.address = Set(address);
        }
        model.updated_at = Set(Some(updated_at));
        Ok(patient_from_model(model.update(&self.db).await?))
    }

    async fn delete(&self, patient_id: i64) -> Result<()> {
        PatientEntity::delete_by_id(patient_id).exec(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for DatabaseStore {
    async fn get(&self, uid: &str) -> Result<Option<TherapistProfile>> {
        Ok(ProfileEntity::find_by_id(uid.to_string())
            .one(&self.db)
            .await?
            .map(profile_from_model))
    }

    async fn upsert(&self, profile: TherapistProfile) -> Result<TherapistProfile> {
        ProfileEntity::insert(therapist_profile::ActiveModel {
            uid: Set(profile.uid.clone()),
            registration_number: Set(profile.registration_number.clone()),
            address: Set(profile.address.clone()),
            updated_at: Set(profile.updated_at),
        })
        .on_conflict(
            OnConflict::column(therapist_profile::Column::Uid)
                .update_columns([
                    therapist_profile::Column::RegistrationNumber,
                    therapist_profile::Column::Address,
                    therapist_profile::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(profile)
    }
}
