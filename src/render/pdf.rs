//! PDF output via `printpdf`, drawing the pages produced by [`super::layout`].

use super::DocumentRenderer;
use super::layout::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM, layout_invoice};
use crate::core::calendar::PracticeCalendar;
use crate::errors::{Error, Result};
use crate::models::Invoice;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;
use tracing::debug;

/// Renders invoices as A4 PDF documents using the built-in Helvetica faces
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    calendar: PracticeCalendar,
}

impl PdfRenderer {
    /// Renderer printing dates in the practice time zone of `calendar`.
    #[must_use]
    pub const fn new(calendar: PracticeCalendar) -> Self {
        Self { calendar }
    }
}

fn render_failed(invoice: &Invoice, reason: impl std::fmt::Display) -> Error {
    Error::RenderFailed {
        invoice_number: invoice.invoice_number.clone(),
        reason: reason.to_string(),
    }
}

impl DocumentRenderer for PdfRenderer {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, invoice: &Invoice) -> Result<Vec<u8>> {
        let pages = layout_invoice(invoice, self.calendar.offset(), self.calendar.today());
        let title = format!("Invoice {}", invoice.invoice_number);

        let (doc, first_page, first_layer) = PdfDocument::new(
            &title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| render_failed(invoice, format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| render_failed(invoice, format!("PDF font error: {e}")))?;

        for (index, page) in pages.iter().enumerate() {
            let (page_index, layer_index) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
            };
            let layer = doc.get_page(page_index).get_layer(layer_index);
            for run in &page.runs {
                let font = if run.bold { &bold } else { &regular };
                layer.use_text(run.text.as_str(), run.size, Mm(run.x), Mm(run.y), font);
            }
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| render_failed(invoice, format!("PDF save error: {e}")))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| render_failed(invoice, format!("PDF buffer error: {e}")))?;

        debug!(
            "Rendered {} as {} pages, {} bytes",
            invoice.invoice_number,
            pages.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}
