//! Database configuration module for physio-billing.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    Attendance, Invoice, InvoiceCounter, InvoiceSession, Patient, TherapistProfile,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/physio_billing.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Directory holding a file-backed `SQLite` database, if the URL names one.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Establishes a connection to the database named by [`get_database_url`].
///
/// The parent directory of a file-backed `SQLite` database is created first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_parent_dir(&database_url) {
        tokio::fs::create_dir_all(dir).await?;
    }
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables that do not exist yet.
///
/// Parents are created before children so the foreign keys from attendance to patients
/// and from invoice sessions to invoices resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut patient_table = schema.create_table_from_entity(Patient);
    let mut attendance_table = schema.create_table_from_entity(Attendance);
    let mut invoice_table = schema.create_table_from_entity(Invoice);
    let mut invoice_session_table = schema.create_table_from_entity(InvoiceSession);
    let mut counter_table = schema.create_table_from_entity(InvoiceCounter);
    let mut profile_table = schema.create_table_from_entity(TherapistProfile);

    for table in [
        patient_table.if_not_exists(),
        attendance_table.if_not_exists(),
        invoice_table.if_not_exists(),
        invoice_session_table.if_not_exists(),
        counter_table.if_not_exists(),
        profile_table.if_not_exists(),
    ] {
        db.execute(builder.build(&*table)).await?;
    }

    info!("Database tables ensured.");
    Ok(())
}

/// Connects and makes sure the schema exists.
pub async fn init_database() -> Result<DatabaseConnection> {
    let db = create_connection().await?;
    create_tables(&db).await?;
    Ok(db)
}
