//! Invoice entity - A billing document with denormalized patient and therapist fields.
//!
//! Billed sessions are stored in `invoice_sessions`. Counts and `total_amount` are written
//! once at creation; only `is_paid` changes afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier for the invoice
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sequential number, e.g. `INV-2026-001`
    #[sea_orm(unique)]
    pub invoice_number: String,
    /// Source patient (no foreign key; invoices outlive patients)
    pub patient_id: i64,
    /// Patient display name at billing time
    pub patient_name: String,
    /// Full name printed on the bill
    pub patient_full_name: String,
    /// Patient contact at billing time
    pub patient_contact: String,
    /// Patient address at billing time
    pub patient_address: String,
    /// Therapist display name at billing time
    pub therapist_name: String,
    /// Therapist email at billing time
    pub therapist_email: String,
    /// Therapist registration number, empty when not on file
    pub therapist_registration_number: String,
    /// Therapist address, empty when not on file
    pub therapist_address: String,
    /// First billed day
    pub start_date: Date,
    /// Last billed day
    pub end_date: Date,
    /// Amount charged per attended session
    pub per_session_rate: f64,
    /// All sessions in the period
    pub total_sessions: i64,
    /// Attended sessions in the period
    pub present_sessions: i64,
    /// `present_sessions * per_session_rate`
    pub total_amount: f64,
    /// Payment flag
    pub is_paid: bool,
    /// When the invoice was issued
    pub created_at: DateTimeUtc,
    /// User who issued it
    pub created_by: String,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One invoice has many billed sessions
    #[sea_orm(has_many = "super::invoice_session::Entity")]
    Sessions,
}

impl Related<super::invoice_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
