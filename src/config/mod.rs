/// Database configuration and connection management
pub mod database;

/// Therapist identity from settings and environment
pub mod identity;

/// Practice settings loading from physio.toml
pub mod settings;
