//! Fatal error conditions of the tagging engine.
//!
//! Only three things abort a tagging request: a footprint that was never
//! supplied, a footprint that cannot be parsed as a polygon, and a database
//! that cannot be reached when the engine is built. Everything a single
//! tagger does wrong is absorbed by the engine and never shows up here.

use thiserror::Error;

/// Result type for engine-level operations.
pub type Result<T> = std::result::Result<T, TagError>;

/// Errors that stop a tagging request (or engine construction) outright.
#[derive(Error, Debug)]
pub enum TagError {
    /// The metadata carried no footprint.
    #[error("Missing mandatory footprint")]
    MissingFootprint,

    /// The footprint is not a valid polygon or multipolygon WKT.
    #[error("Invalid footprint geometry: {0}")]
    InvalidGeometry(String),

    /// No usable database handle could be established.
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[source] sqlx::Error),
}

impl TagError {
    /// Machine-readable code used by the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            TagError::MissingFootprint => "missing_footprint",
            TagError::InvalidGeometry(_) => "invalid_geometry",
            TagError::DatabaseConnection(_) => "database_error",
        }
    }

    /// Whether the caller supplied bad input (as opposed to an infrastructure fault).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TagError::MissingFootprint | TagError::InvalidGeometry(_)
        )
    }
}
