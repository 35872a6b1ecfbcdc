//! Attendance analytics - Present/absent percentages per patient and across the practice.

use crate::core::calendar::PracticeCalendar;
use crate::models::{AttendanceRecord, AttendanceStatus, DateRange, Patient};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counts and rate for a set of attendance records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttendanceSummary {
    /// Records counted
    pub total_sessions: u32,
    /// Present records
    pub present_count: u32,
    /// Absent records
    pub absent_count: u32,
    /// Whole-number percentage present, rounded half up; 0 when there are no records
    pub attendance_rate: u32,
}

/// Percentage of `present` out of `total`, rounded half up.
///
/// ```
/// use physio_billing::core::analytics::attendance_rate;
/// assert_eq!(attendance_rate(2, 3), 67);
/// assert_eq!(attendance_rate(1, 8), 13);
/// assert_eq!(attendance_rate(0, 0), 0);
/// ```
#[must_use]
pub fn attendance_rate(present: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (present, total) = (u64::from(present), u64::from(total));
    let rate = (200 * present + total) / (2 * total);
    u32::try_from(rate).unwrap_or(u32::MAX)
}

/// Summarizes `records`, optionally restricted to the days of `range`.
#[must_use]
pub fn summarize(
    records: &[AttendanceRecord],
    range: Option<&DateRange>,
    calendar: &PracticeCalendar,
) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();
    for record in records
        .iter()
        .filter(|record| range.is_none_or(|range| calendar.contains(range, record.timestamp)))
    {
        summary.total_sessions = summary.total_sessions.saturating_add(1);
        match record.status {
            AttendanceStatus::Present => {
                summary.present_count = summary.present_count.saturating_add(1);
            }
            AttendanceStatus::Absent => {
                summary.absent_count = summary.absent_count.saturating_add(1);
            }
        }
    }
    summary.attendance_rate = attendance_rate(summary.present_count, summary.total_sessions);
    summary
}

/// One patient's row in the practice overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientAttendance {
    /// Patient id
    pub patient_id: i64,
    /// Display name
    pub patient_name: String,
    /// Counts and rate
    pub summary: AttendanceSummary,
    /// Most recent counted session
    pub last_session: Option<DateTime<Utc>>,
}

/// Attendance across every patient
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PracticeAttendance {
    /// Lowest attendance rate first
    pub patients: Vec<PatientAttendance>,
    /// Totals over all patients
    pub overall: AttendanceSummary,
}

/// Builds the practice overview from each patient's attendance history.
///
/// Patients are ordered by ascending rate so the ones missing the most sessions come first;
/// equal rates keep the input order.
#[must_use]
pub fn practice_attendance(
    histories: &[(Patient, Vec<AttendanceRecord>)],
    range: Option<&DateRange>,
    calendar: &PracticeCalendar,
) -> PracticeAttendance {
    let mut overall = AttendanceSummary::default();
    let mut patients: Vec<PatientAttendance> = histories
        .iter()
        .map(|(patient, records)| {
            let summary = summarize(records, range, calendar);
            overall.total_sessions = overall.total_sessions.saturating_add(summary.total_sessions);
            overall.present_count = overall.present_count.saturating_add(summary.present_count);
            overall.absent_count = overall.absent_count.saturating_add(summary.absent_count);

            let last_session = records
                .iter()
                .filter(|r| range.is_none_or(|range| calendar.contains(range, r.timestamp)))
                .map(|r| r.timestamp)
                .max();

            PatientAttendance {
                patient_id: patient.id,
                patient_name: patient.name.clone(),
                summary,
                last_session,
            }
        })
        .collect();

    patients.sort_by_key(|row| row.summary.attendance_rate);
    overall.attendance_rate = attendance_rate(overall.present_count, overall.total_sessions);

    PracticeAttendance { patients, overall }
}
