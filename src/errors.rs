//! Unified error type for physio-billing.
//!
//! The variants follow the billing workflow: a request is validated, a number is allocated,
//! the invoice is persisted, then rendered. Each stage has its own variant so callers can
//! tell a burned invoice number from a failure that consumed nothing.

use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-side precondition was violated before any backend call was made
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending input field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The invoice counter could not be incremented; no number was issued
    #[error("Invoice numbering unavailable: {reason}")]
    NumberingUnavailable {
        /// Underlying failure
        reason: String,
    },

    /// A number was allocated but the invoice document failed to save
    #[error("Failed to save invoice {invoice_number}: {reason}")]
    PersistenceFailed {
        /// The number that is now permanently consumed
        invoice_number: String,
        /// Underlying failure
        reason: String,
    },

    /// Rendering a stored invoice failed; the invoice itself still exists
    #[error("Failed to render invoice {invoice_number}: {reason}")]
    RenderFailed {
        /// Number of the stored invoice
        invoice_number: String,
        /// Underlying failure
        reason: String,
    },

    /// The backing store could not be reached
    #[error("Store unavailable: {reason}")]
    StoreUnavailable {
        /// Underlying failure
        reason: String,
    },

    /// A record addressed by id does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record (`"invoice"`, `"patient"`, ...)
        entity: &'static str,
        /// The id that was looked up
        id: i64,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// I/O failure (config files, exported documents)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::StoreUnavailable {
            reason: value.to_string(),
        }
    }
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether retrying the same request can succeed without the user changing anything.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NumberingUnavailable { .. }
                | Self::PersistenceFailed { .. }
                | Self::RenderFailed { .. }
                | Self::StoreUnavailable { .. }
        )
    }

    /// Message suitable for showing to the practitioner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::NumberingUnavailable { .. } => {
                "Could not allocate an invoice number. Please try again.".to_string()
            }
            Self::PersistenceFailed { invoice_number, .. } => format!(
                "The invoice could not be saved. Number {invoice_number} has been used and will not be reissued."
            ),
            Self::RenderFailed { invoice_number, .. } => format!(
                "Invoice {invoice_number} was saved but its document could not be generated. You can download it again from the invoice list."
            ),
            Self::StoreUnavailable { .. } => {
                "Could not reach the server. Showing no results for now.".to_string()
            }
            Self::NotFound { entity, .. } => format!("That {entity} no longer exists."),
            Self::Config { .. } | Self::Io(_) | Self::EnvVar(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
