//! `SeaORM` entities for the practice database.
//!
//! Only [`crate::store::database`] uses these directly; everything else works with the
//! plain values in [`crate::models`].

pub mod attendance;
pub mod invoice;
pub mod invoice_counter;
pub mod invoice_session;
pub mod patient;
pub mod therapist_profile;

pub use attendance::{Column as AttendanceColumn, Entity as Attendance, Model as AttendanceModel};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel};
pub use invoice_counter::{
    Column as InvoiceCounterColumn, Entity as InvoiceCounter, Model as InvoiceCounterModel,
};
pub use invoice_session::{
    Column as InvoiceSessionColumn, Entity as InvoiceSession, Model as InvoiceSessionModel,
};
pub use patient::{Column as PatientColumn, Entity as Patient, Model as PatientModel};
pub use therapist_profile::{
    Column as TherapistProfileColumn, Entity as TherapistProfile, Model as TherapistProfileModel,
};
