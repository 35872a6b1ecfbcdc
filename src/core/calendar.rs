//! Practice-local calendar arithmetic.
//!
//! Day boundaries for billing periods and the year used for invoice numbering are taken in
//! the practice's time zone, expressed as a fixed UTC offset. The clock is injected so tests
//! can pin "now".

use crate::models::DateRange;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeDelta, Utc,
};
use std::sync::{Arc, Mutex};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock pinned at `instant`.
    #[must_use]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard = instant;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |guard| *guard)
    }
}

/// Clock plus practice time zone
#[derive(Clone)]
pub struct PracticeCalendar {
    offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PracticeCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeCalendar")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl PracticeCalendar {
    /// Calendar at `offset` reading time from `clock`.
    #[must_use]
    pub fn new(offset: FixedOffset, clock: Arc<dyn Clock>) -> Self {
        Self { offset, clock }
    }

    /// Calendar at `offset` reading the wall clock.
    #[must_use]
    pub fn system(offset: FixedOffset) -> Self {
        Self::new(offset, Arc::new(SystemClock))
    }

    /// UTC calendar reading the wall clock.
    #[must_use]
    pub fn utc() -> Self {
        Self::system(Utc.fix())
    }

    /// Practice UTC offset
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current instant
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the practice time zone
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }

    /// Calendar year used to key the invoice counter
    #[must_use]
    pub fn current_year(&self) -> i32 {
        self.today().year()
    }

    /// Practice-local calendar date of `instant`
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// First instant of `date`
    #[must_use]
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_to_utc(date.and_time(NaiveTime::MIN))
    }

    /// Last representable microsecond of `date`
    #[must_use]
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let next_midnight = self.start_of_day(date + Days::new(1));
        next_midnight - TimeDelta::microseconds(1)
    }

    /// Whether `instant` falls on a day inside `range`, boundary days included in full.
    #[must_use]
    pub fn contains(&self, range: &DateRange, instant: DateTime<Utc>) -> bool {
        instant >= self.start_of_day(range.start) && instant <= self.end_of_day(range.end)
    }

    /// Whether `instant` is on today's date
    #[must_use]
    pub fn is_today(&self, instant: DateTime<Utc>) -> bool {
        self.local_date(instant) == self.today()
    }

    /// The calendar month containing today
    #[must_use]
    pub fn this_month(&self) -> DateRange {
        month_of(self.today())
    }

    fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let utc = local - TimeDelta::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, Utc)
    }
}

/// First through last day of the month containing `date`.
#[must_use]
pub fn month_of(date: NaiveDate) -> DateRange {
    let start = date - Days::new(u64::from(date.day0()));
    let end = start + Months::new(1) - Days::new(1);
    DateRange { start, end }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::TimeZone;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn test_day_bounds_respect_offset() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 10, 6, 0, 0).unwrap()));
        let calendar = PracticeCalendar::new(ist(), clock);
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        assert_eq!(
            calendar.start_of_day(date),
            Utc.with_ymd_and_hms(2026, 3, 9, 18, 30, 0).unwrap()
        );
        assert_eq!(
            calendar.end_of_day(date) + TimeDelta::microseconds(1),
            Utc.with_ymd_and_hms(2026, 3, 10, 18, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_contains_is_inclusive_to_the_microsecond() {
        let calendar = PracticeCalendar::utc();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        )
        .unwrap();
        let last = calendar.end_of_day(range.end);

        assert!(calendar.contains(&range, calendar.start_of_day(range.start)));
        assert!(calendar.contains(&range, last));
        assert!(!calendar.contains(&range, last + TimeDelta::microseconds(1)));
        assert!(!calendar.contains(
            &range,
            calendar.start_of_day(range.start) - TimeDelta::microseconds(1)
        ));
    }

    #[test]
    fn test_current_year_uses_practice_zone() {
        // 20:00 UTC on New Year's Eve is already 1 January in IST
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 12, 31, 20, 0, 0).unwrap()));
        let calendar = PracticeCalendar::new(ist(), clock);
        assert_eq!(calendar.current_year(), 2026);
    }

    #[test]
    fn test_month_of_handles_short_months() {
        let range = month_of(NaiveDate::from_ymd_opt(2028, 2, 17).unwrap());
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());

        let range = month_of(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
    }

    #[test]
    fn test_fixed_clock_can_be_moved() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let later = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
