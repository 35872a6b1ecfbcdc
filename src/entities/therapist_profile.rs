//! Therapist profile entity - Registration details for the acting user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Therapist profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "therapist_profiles")]
pub struct Model {
    /// Identifier of the user this profile belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub uid: String,
    /// Professional registration number
    pub registration_number: String,
    /// Practice address
    pub address: String,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// `TherapistProfile` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
