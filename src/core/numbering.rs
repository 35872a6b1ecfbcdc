//! Invoice numbering - Sequential, per-year invoice numbers.
//!
//! One counter exists per calendar year, keyed by the year as a string. Every call performs a
//! single transactional increment and formats the result; nothing is cached locally, so a
//! failed increment never hands out a number.

use crate::core::calendar::PracticeCalendar;
use crate::errors::{Error, Result};
use crate::store::CounterStore;
use std::sync::Arc;
use tracing::{error, info};

/// Minimum zero-padded width of the sequence part
pub const SEQUENCE_WIDTH: usize = 3;

/// Formats `INV-<year>-<sequence>`, padding the sequence to at least three digits.
///
/// # Examples
/// ```
/// use physio_billing::core::numbering::format_invoice_number;
/// assert_eq!(format_invoice_number(2026, 7), "INV-2026-007");
/// assert_eq!(format_invoice_number(2026, 1001), "INV-2026-1001");
/// ```
#[must_use]
pub fn format_invoice_number(year: i32, sequence: u64) -> String {
    format!("INV-{year}-{sequence:0>SEQUENCE_WIDTH$}")
}

/// Allocates invoice numbers from a shared counter
#[derive(Clone)]
pub struct NumberingService {
    counters: Arc<dyn CounterStore>,
    calendar: PracticeCalendar,
}

impl NumberingService {
    /// Service allocating from `counters`, taking the year from `calendar`.
    #[must_use]
    pub fn new(counters: Arc<dyn CounterStore>, calendar: PracticeCalendar) -> Self {
        Self { counters, calendar }
    }

    /// Consumes the next number of the current year.
    ///
    /// The year is read from the clock at call time, so the first call after New Year
    /// starts the new year's counter at 1.
    ///
    /// # Errors
    /// Returns [`Error::NumberingUnavailable`] when the counter cannot be incremented. No
    /// number is consumed in that case.
    pub async fn next_invoice_number(&self) -> Result<String> {
        let year = self.calendar.current_year();
        let sequence = self
            .counters
            .transactional_increment(&year.to_string())
            .await
            .map_err(|e| {
                error!("Invoice counter for {} failed: {}", year, e);
                Error::NumberingUnavailable {
                    reason: e.to_string(),
                }
            })?;

        let number = format_invoice_number(year, sequence);
        info!("Allocated invoice number {}", number);
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::calendar::FixedClock;
    use crate::store::Stores;
    use crate::test_utils::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn service(stores: &Stores, clock: Arc<FixedClock>) -> NumberingService {
        let calendar = PracticeCalendar::new(FixedOffset::east_opt(0).unwrap(), clock);
        NumberingService::new(Arc::clone(&stores.counters), calendar)
    }

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(format_invoice_number(2026, 1), "INV-2026-001");
        assert_eq!(format_invoice_number(2026, 42), "INV-2026-042");
        assert_eq!(format_invoice_number(2026, 999), "INV-2026-999");
    }

    #[tokio::test]
    async fn test_seventh_call_of_the_year() -> Result<()> {
        let stores = Stores::in_memory();
        let numbering = service(&stores, fixed_clock_at(2026, 5, 1));
        let mut last = String::new();
        for _ in 0..7 {
            last = numbering.next_invoice_number().await?;
        }
        assert_eq!(last, "INV-2026-007");
        Ok(())
    }

    #[tokio::test]
    async fn test_thousand_and_first_call_widens() -> Result<()> {
        let stores = Stores::in_memory();
        let numbering = service(&stores, fixed_clock_at(2026, 5, 1));
        for _ in 0..1000 {
            numbering.next_invoice_number().await?;
        }
        assert_eq!(numbering.next_invoice_number().await?, "INV-2026-1001");
        Ok(())
    }

    #[tokio::test]
    async fn test_new_year_starts_a_fresh_counter() -> Result<()> {
        let stores = Stores::in_memory();
        let clock = fixed_clock_at(2026, 12, 31);
        let numbering = service(&stores, Arc::clone(&clock));

        assert_eq!(numbering.next_invoice_number().await?, "INV-2026-001");
        assert_eq!(numbering.next_invoice_number().await?, "INV-2026-002");

        clock.set(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 1).unwrap());
        assert_eq!(numbering.next_invoice_number().await?, "INV-2027-001");
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_allocation_is_unique() -> Result<()> {
        let db = setup_test_db().await?;
        let stores = Stores::database(db);
        let numbering = service(&stores, fixed_clock_at(2026, 3, 15));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..25 {
            let numbering = numbering.clone();
            tasks.spawn(async move { numbering.next_invoice_number().await });
        }

        let mut numbers = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            numbers.push(joined.unwrap()?);
        }
        numbers.sort();
        let expected: Vec<String> = (1..=25).map(|n| format_invoice_number(2026, n)).collect();
        assert_eq!(numbers, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_counter_issues_nothing() {
        let counters: Arc<dyn CounterStore> = Arc::new(FailingCounterStore);
        let calendar = PracticeCalendar::new(
            FixedOffset::east_opt(0).unwrap(),
            fixed_clock_at(2026, 1, 10),
        );
        let numbering = NumberingService::new(counters, calendar);

        let result = numbering.next_invoice_number().await;
        assert!(matches!(result, Err(Error::NumberingUnavailable { .. })));
    }
}
