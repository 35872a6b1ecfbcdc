//! Page layout for invoice documents, independent of the output format.
//!
//! Coordinates are millimetres from the bottom-left corner of an A4 page, as PDF uses them.
//! Page 1 is the summary; the session ledger starts on page 2 and continues on further pages
//! when it does not fit.

use crate::models::Invoice;
use crate::render::format::{
    format_currency, format_ledger_date, format_long_date, format_period_long, format_period_short,
};
use chrono::{FixedOffset, NaiveDate};

/// A4 width
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 height
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const LEFT: f32 = 20.0;
const VALUE_COLUMN: f32 = 60.0;
const AMOUNT_COLUMN: f32 = 160.0;
const TOTALS_COLUMN: f32 = 120.0;
const DATE_COLUMN: f32 = 45.0;
const TOP: f32 = 277.0;
const FOOTER_Y: f32 = 15.0;
const SIGNATURE_Y: f32 = 55.0;
const LEDGER_ROW: f32 = 7.0;
// Rows stop above the signature block on every ledger page
const LEDGER_FLOOR: f32 = SIGNATURE_Y + 15.0;

/// One piece of text placed on a page
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Text to draw
    pub text: String,
    /// Distance from the left edge
    pub x: f32,
    /// Distance from the bottom edge
    pub y: f32,
    /// Font size in points
    pub size: f32,
    /// Bold face
    pub bold: bool,
}

/// Everything drawn on one page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    /// Text in drawing order
    pub runs: Vec<TextRun>,
}

impl PageLayout {
    /// Whether any run on the page reads exactly `text`.
    #[must_use]
    pub fn has_text(&self, text: &str) -> bool {
        self.runs.iter().any(|run| run.text == text)
    }

    /// Whether any run on the page starts with `prefix`.
    #[must_use]
    pub fn has_text_starting_with(&self, prefix: &str) -> bool {
        self.runs.iter().any(|run| run.text.starts_with(prefix))
    }
}

/// Writes runs top to bottom
struct PageWriter {
    page: PageLayout,
    y: f32,
}

impl PageWriter {
    const fn new() -> Self {
        Self {
            page: PageLayout { runs: Vec::new() },
            y: TOP,
        }
    }

    fn put(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, bold: bool) {
        self.page.runs.push(TextRun {
            text: text.into(),
            x,
            y,
            size,
            bold,
        });
    }

    fn text(&mut self, text: impl Into<String>, x: f32, size: f32, bold: bool) {
        let y = self.y;
        self.put(text, x, y, size, bold);
    }

    fn down(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Label in bold with its value in the value column, then moves down one line.
    fn field(&mut self, label: &str, value: &str) {
        self.text(label, LEFT, 10.0, true);
        self.text(value, VALUE_COLUMN, 10.0, false);
        self.down(6.0);
    }

    fn signature(&mut self, therapist_name: &str) {
        self.put("______________________", AMOUNT_COLUMN - 25.0, SIGNATURE_Y, 10.0, false);
        self.put(therapist_name, AMOUNT_COLUMN - 25.0, SIGNATURE_Y - 6.0, 10.0, true);
        self.put(
            "Authorized Signatory",
            AMOUNT_COLUMN - 25.0,
            SIGNATURE_Y - 11.0,
            9.0,
            false,
        );
    }

    fn footer(&mut self, text: impl Into<String>) {
        self.put(text, LEFT, FOOTER_Y, 8.0, false);
    }

    fn finish(self) -> PageLayout {
        self.page
    }
}

/// Text of the single line item on the summary page.
#[must_use]
pub fn line_item_description(invoice: &Invoice) -> String {
    format!(
        "Physiotherapy Sessions ({} sessions @ {} per session)",
        invoice.present_sessions,
        format_currency(invoice.per_session_rate)
    )
}

/// Lays out every page of `invoice`.
///
/// `offset` is the practice time zone used for the invoice date and ledger dates;
/// `generated_on` is printed in the summary footer.
#[must_use]
pub fn layout_invoice(
    invoice: &Invoice,
    offset: FixedOffset,
    generated_on: NaiveDate,
) -> Vec<PageLayout> {
    let mut pages = vec![summary_page(invoice, offset, generated_on)];
    pages.extend(ledger_pages(invoice, offset));
    pages
}

fn summary_page(invoice: &Invoice, offset: FixedOffset, generated_on: NaiveDate) -> PageLayout {
    let mut page = PageWriter::new();

    page.text(&invoice.therapist_name, LEFT, 18.0, true);
    page.down(7.0);
    if !invoice.therapist_registration_number.is_empty() {
        page.text(
            format!("Reg. No.: {}", invoice.therapist_registration_number),
            LEFT,
            10.0,
            false,
        );
        page.down(5.0);
    }
    for line in invoice
        .therapist_address
        .lines()
        .filter(|l| !l.trim().is_empty())
    {
        page.text(line.trim(), LEFT, 10.0, false);
        page.down(5.0);
    }
    if !invoice.therapist_email.is_empty() {
        page.text(&invoice.therapist_email, LEFT, 10.0, false);
        page.down(5.0);
    }

    page.down(8.0);
    page.text("INVOICE", LEFT, 16.0, true);
    page.down(9.0);
    page.field("Invoice No.", &invoice.invoice_number);
    page.field(
        "Invoice Date",
        &format_long_date(invoice.created_at.with_timezone(&offset).date_naive()),
    );
    page.field("Billing Period", &format_period_short(&invoice.date_range));

    page.down(6.0);
    page.text("Bill To", LEFT, 12.0, true);
    page.down(7.0);
    page.field("Name", &invoice.patient_full_name);
    if !invoice.patient_contact.is_empty() {
        page.field("Contact", &invoice.patient_contact);
    }
    if !invoice.patient_address.is_empty() {
        page.field("Address", &invoice.patient_address);
    }

    page.down(6.0);
    page.text("Services", LEFT, 12.0, true);
    page.down(7.0);
    page.text("Description", LEFT, 10.0, true);
    page.text("Amount", AMOUNT_COLUMN, 10.0, true);
    page.down(6.0);
    page.text(line_item_description(invoice), LEFT, 10.0, false);
    page.text(format_currency(invoice.total_amount), AMOUNT_COLUMN, 10.0, false);
    page.down(12.0);

    page.text("Subtotal", TOTALS_COLUMN, 10.0, false);
    page.text(format_currency(invoice.total_amount), AMOUNT_COLUMN, 10.0, false);
    page.down(6.0);
    page.text("Total", TOTALS_COLUMN, 11.0, true);
    page.text(format_currency(invoice.total_amount), AMOUNT_COLUMN, 11.0, true);

    page.signature(&invoice.therapist_name);
    page.footer(format!(
        "Generated on {} | This is a computer-generated invoice",
        format_long_date(generated_on)
    ));
    page.finish()
}

fn ledger_header(page: &mut PageWriter, invoice: &Invoice, continued: bool) {
    let title = if continued {
        "Session Records (continued)"
    } else {
        "Session Records"
    };
    page.text(title, LEFT, 16.0, true);
    page.down(7.0);
    page.text(
        format!(
            "{} | {}",
            invoice.patient_full_name, invoice.invoice_number
        ),
        LEFT,
        10.0,
        false,
    );
    page.down(6.0);
    if !continued {
        page.text(
            format!("Period: {}", format_period_long(&invoice.date_range)),
            LEFT,
            10.0,
            false,
        );
        page.down(5.0);
        page.text(
            format!("Total Attended: {} sessions", invoice.present_sessions),
            LEFT,
            10.0,
            false,
        );
        page.down(5.0);
    }
    page.down(5.0);
    page.text("S. No.", LEFT, 10.0, true);
    page.text("Date", DATE_COLUMN, 10.0, true);
    page.down(LEDGER_ROW);
}

fn ledger_pages(invoice: &Invoice, offset: FixedOffset) -> Vec<PageLayout> {
    let mut writers = Vec::new();
    let mut page = PageWriter::new();
    ledger_header(&mut page, invoice, false);

    if invoice.sessions.is_empty() {
        page.text("No attended sessions in this period", LEFT, 10.0, false);
    }
    for (index, session) in invoice.sessions.iter().enumerate() {
        if page.y < LEDGER_FLOOR {
            writers.push(page);
            page = PageWriter::new();
            ledger_header(&mut page, invoice, true);
        }
        page.text((index + 1).to_string(), LEFT, 10.0, false);
        page.text(
            format_ledger_date(session.timestamp, offset),
            DATE_COLUMN,
            10.0,
            false,
        );
        page.down(LEDGER_ROW);
    }
    writers.push(page);

    // Summary page counts as page 1
    let total_pages = writers.len() + 1;
    let last = writers.len() - 1;
    writers
        .into_iter()
        .enumerate()
        .map(|(i, mut page)| {
            if i == last {
                page.signature(&invoice.therapist_name);
            }
            page.footer(format!(
                "Page {} of {} | {} | {}",
                i + 2,
                total_pages,
                invoice.invoice_number,
                invoice.patient_full_name
            ));
            page.finish()
        })
        .collect()
}
