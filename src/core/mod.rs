//! Core module - Billing and attendance logic independent of any storage backend or UI.
//!
//! Everything here talks to storage only through the traits in [`crate::store`] and reads
//! time only through [`calendar::PracticeCalendar`].

pub mod analytics;
pub mod attendance;
pub mod calendar;
pub mod invoice;
pub mod numbering;
pub mod patient;
pub mod profile;
