//! Patient entity - One row per patient of the practice.
//!
//! Attendance rows reference patients. Invoices only copy patient fields, so they carry
//! no relation here and survive a patient's deletion.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Patient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    /// Unique identifier for the patient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Human-readable code shown to the practitioner (e.g. `PT-482913-K2QZ`)
    #[sea_orm(unique)]
    pub patient_code: String,
    /// Phone number or other contact detail
    pub contact: String,
    /// Postal address
    pub address: String,
    /// When the patient was registered
    pub created_at: DateTimeUtc,
    /// When the record was last edited
    pub updated_at: Option<DateTimeUtc>,
}

/// Defines relationships between Patient and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One patient has many attendance records
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
