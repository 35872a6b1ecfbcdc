//! Display formatting for invoice documents.

use crate::models::DateRange;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// `Rs. ` followed by the amount with Indian digit grouping and at most two decimals.
///
/// ```
/// use physio_billing::render::format::format_currency;
/// assert_eq!(format_currency(100000.0), "Rs. 1,00,000");
/// assert_eq!(format_currency(1234.5), "Rs. 1,234.5");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_currency(amount: f64) -> String {
    let paise = (amount.abs() * 100.0).round() as u64;
    let rupees = group_indian(paise / 100);
    let fraction = paise % 100;
    let sign = if amount < 0.0 && paise > 0 { "-" } else { "" };

    if fraction == 0 {
        format!("Rs. {sign}{rupees}")
    } else if fraction % 10 == 0 {
        format!("Rs. {sign}{rupees}.{}", fraction / 10)
    } else {
        format!("Rs. {sign}{rupees}.{fraction:02}")
    }
}

/// Groups the last three digits, then every two: `12345678` becomes `1,23,45,678`.
fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

/// `05 Jan 2026`
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// `01 Jan - 31 Jan 2026`
#[must_use]
pub fn format_period_short(range: &DateRange) -> String {
    format!(
        "{} - {}",
        range.start.format("%d %b"),
        range.end.format("%d %b %Y")
    )
}

/// `01 Jan 2026 - 31 Jan 2026`
#[must_use]
pub fn format_period_long(range: &DateRange) -> String {
    format!(
        "{} - {}",
        format_long_date(range.start),
        format_long_date(range.end)
    )
}

/// `Mon, 05 Jan 2026`, in the practice time zone
#[must_use]
pub fn format_ledger_date(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).format("%a, %d %b %Y").to_string()
}
