//! Attendance business logic - Marking, backdating, editing and removing session records.
//!
//! Records may be backdated but never placed in the future. Editing a record stamps it with
//! the current time. The store keeps no per-day uniqueness; the "today" record shown to the
//! practitioner is simply the newest one on today's date.

use crate::core::calendar::PracticeCalendar;
use crate::errors::{Error, Result};
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::store::AttendanceStore;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

/// Records a session for `patient_id` at the current time.
#[instrument(skip(store, calendar))]
pub async fn mark_attendance(
    store: &dyn AttendanceStore,
    calendar: &PracticeCalendar,
    patient_id: i64,
    status: AttendanceStatus,
) -> Result<AttendanceRecord> {
    let record = store.create(patient_id, status, calendar.now()).await?;
    info!("Marked patient {} {} for today", patient_id, status);
    Ok(record)
}

/// Records a session that took place earlier.
///
/// # Errors
/// Returns [`Error::Validation`] on the `timestamp` field if it lies in the future.
#[instrument(skip(store, calendar))]
pub async fn record_past_attendance(
    store: &dyn AttendanceStore,
    calendar: &PracticeCalendar,
    patient_id: i64,
    status: AttendanceStatus,
    timestamp: DateTime<Utc>,
) -> Result<AttendanceRecord> {
    if timestamp > calendar.now() {
        return Err(Error::validation(
            "timestamp",
            "Attendance cannot be recorded for a future date",
        ));
    }
    let record = store.create(patient_id, status, timestamp).await?;
    info!(
        "Recorded {} for patient {} on {}",
        status,
        patient_id,
        calendar.local_date(timestamp)
    );
    Ok(record)
}

/// Changes the status of an existing record and refreshes its timestamp to now.
pub async fn update_attendance(
    store: &dyn AttendanceStore,
    calendar: &PracticeCalendar,
    attendance_id: i64,
    status: AttendanceStatus,
) -> Result<()> {
    store.update(attendance_id, status, calendar.now()).await
}

/// Permanently removes a record.
pub async fn delete_attendance(store: &dyn AttendanceStore, attendance_id: i64) -> Result<()> {
    store.delete(attendance_id).await?;
    info!("Deleted attendance record {}", attendance_id);
    Ok(())
}

/// A patient's records, newest first.
pub async fn attendance_history(
    store: &dyn AttendanceStore,
    patient_id: i64,
) -> Result<Vec<AttendanceRecord>> {
    store.list_by_patient(patient_id).await
}

/// The newest record dated today, if any.
#[must_use]
pub fn todays_record<'a>(
    records: &'a [AttendanceRecord],
    calendar: &PracticeCalendar,
) -> Option<&'a AttendanceRecord> {
    records
        .iter()
        .filter(|record| calendar.is_today(record.timestamp))
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::test_utils::*;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mark_uses_current_time() -> Result<()> {
        let store = MemoryStore::default();
        let clock = fixed_clock_at(2026, 3, 4);
        let calendar = test_calendar(Arc::clone(&clock));

        let record = mark_attendance(&store, &calendar, 1, AttendanceStatus::Present).await?;
        assert_eq!(record.timestamp, calendar.now());
        assert_eq!(record.status, AttendanceStatus::Present);
        Ok(())
    }

    #[tokio::test]
    async fn test_future_backdate_is_rejected() -> Result<()> {
        let store = MemoryStore::default();
        let calendar = test_calendar(fixed_clock_at(2026, 3, 4));
        let tomorrow = calendar.now() + TimeDelta::days(1);

        let result =
            record_past_attendance(&store, &calendar, 1, AttendanceStatus::Absent, tomorrow).await;
        assert!(matches!(
            result,
            Err(Error::Validation {
                field: "timestamp",
                ..
            })
        ));
        assert!(attendance_history(&store, 1).await?.is_empty());

        let last_week = calendar.now() - TimeDelta::days(7);
        record_past_attendance(&store, &calendar, 1, AttendanceStatus::Absent, last_week).await?;
        assert_eq!(attendance_history(&store, 1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp() -> Result<()> {
        let store = MemoryStore::default();
        let clock = fixed_clock_at(2026, 3, 4);
        let calendar = test_calendar(Arc::clone(&clock));
        let record = mark_attendance(&store, &calendar, 1, AttendanceStatus::Absent).await?;

        let later = calendar.now() + TimeDelta::hours(3);
        clock.set(later);
        update_attendance(&store, &calendar, record.id, AttendanceStatus::Present).await?;

        let history = attendance_history(&store, 1).await?;
        assert_eq!(history[0].status, AttendanceStatus::Present);
        assert_eq!(history[0].timestamp, later);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_record() -> Result<()> {
        let store = MemoryStore::default();
        let calendar = test_calendar(fixed_clock_at(2026, 3, 4));
        let record = mark_attendance(&store, &calendar, 1, AttendanceStatus::Present).await?;

        delete_attendance(&store, record.id).await?;
        assert!(attendance_history(&store, 1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_todays_record_picks_newest_today() -> Result<()> {
        let store = MemoryStore::default();
        let clock = fixed_clock_at(2026, 3, 4);
        let calendar = test_calendar(Arc::clone(&clock));
        let yesterday = Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap();
        record_past_attendance(&store, &calendar, 1, AttendanceStatus::Present, yesterday).await?;
        assert!(todays_record(&attendance_history(&store, 1).await?, &calendar).is_none());

        mark_attendance(&store, &calendar, 1, AttendanceStatus::Absent).await?;
        clock.set(calendar.now() + TimeDelta::minutes(5));
        let newest = mark_attendance(&store, &calendar, 1, AttendanceStatus::Present).await?;

        let history = attendance_history(&store, 1).await?;
        assert_eq!(todays_record(&history, &calendar), Some(&newest));
        Ok(())
    }
}
