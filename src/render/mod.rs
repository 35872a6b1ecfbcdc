//! Invoice document rendering.
//!
//! A [`DocumentRenderer`] turns a stored [`Invoice`] into file bytes. Rendering only reads the
//! stored record, so a failed render can be retried at any time without touching the store.

pub mod format;
pub mod layout;
pub mod pdf;

use crate::errors::{Error, Result};
use crate::models::Invoice;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Produces a downloadable document for an invoice
pub trait DocumentRenderer: Send + Sync {
    /// File extension without the dot, e.g. `pdf`
    fn extension(&self) -> &'static str;

    /// Renders the full document.
    ///
    /// # Errors
    /// Returns [`Error::RenderFailed`] naming the invoice.
    fn render(&self, invoice: &Invoice) -> Result<Vec<u8>>;
}

/// Replaces every character that is not an ASCII letter or digit with `_`.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `Invoice_<sanitized patient name>_<invoice number>.<extension>`
#[must_use]
pub fn invoice_file_name(invoice: &Invoice, extension: &str) -> String {
    format!(
        "Invoice_{}_{}.{extension}",
        sanitize(&invoice.patient_name),
        invoice.invoice_number
    )
}

/// Renders `invoice` and writes it into `dir`, returning the written path.
///
/// # Errors
/// Any failure, including file I/O, is reported as [`Error::RenderFailed`]; the stored
/// invoice is unaffected.
pub async fn export_invoice(
    renderer: &dyn DocumentRenderer,
    invoice: &Invoice,
    dir: &Path,
) -> Result<PathBuf> {
    let io_failed = |e: std::io::Error| {
        error!("Writing invoice {} failed: {}", invoice.invoice_number, e);
        Error::RenderFailed {
            invoice_number: invoice.invoice_number.clone(),
            reason: e.to_string(),
        }
    };

    let bytes = renderer.render(invoice).inspect_err(|e| {
        error!("Rendering invoice {} failed: {}", invoice.invoice_number, e);
    })?;

    tokio::fs::create_dir_all(dir).await.map_err(io_failed)?;
    let path = dir.join(invoice_file_name(invoice, renderer.extension()));
    tokio::fs::write(&path, bytes).await.map_err(io_failed)?;

    info!(
        "Exported invoice {} to {}",
        invoice.invoice_number,
        path.display()
    );
    Ok(path)
}
