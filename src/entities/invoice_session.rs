//! Invoice session entity - Billed session copied by value into an invoice.
//!
//! `position` keeps the order the sessions were billed in.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_sessions")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning invoice
    pub invoice_id: i64,
    /// Zero-based position within the invoice
    pub position: i32,
    /// Session date
    pub date: DateTimeUtc,
    /// Attendance status at billing time
    pub status: String,
    /// Original attendance timestamp
    pub timestamp: DateTimeUtc,
}

/// Defines relationships between `InvoiceSession` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each session row belongs to one invoice
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id"
    )]
    Invoice,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
