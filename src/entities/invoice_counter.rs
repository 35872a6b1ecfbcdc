//! Invoice counter entity - One row per calendar year.
//!
//! Rows are created lazily by the first number allocated in a year and are only ever
//! touched through the numbering service's transactional increment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice counter database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_counters")]
pub struct Model {
    /// Counter key, the four-digit year (e.g. `"2026"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Last number issued for this key
    pub count: i64,
}

/// `InvoiceCounter` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
