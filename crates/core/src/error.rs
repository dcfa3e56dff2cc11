use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Business-rule failures of the session engine.
///
/// Every variant is recoverable by the caller; none is fatal to the process.
/// The reconciler treats [`VisitError::InvalidTransition`] as expected when it
/// loses a race against a concurrent clock-out.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("Reported location is {distance_m:.0}m from the client site (allowed: {allowed_m:.0}m)")]
    LocationOutOfRange { distance_m: f64, allowed_m: f64 },

    #[error("Practitioner already has an active session")]
    SessionAlreadyActive,

    #[error("Session is in state '{from}' and cannot be transitioned")]
    InvalidTransition { from: &'static str },

    #[error("Location sample is older than the latest recorded trail entry")]
    StaleTimestamp,

    #[error("Session was modified concurrently; it is already ended")]
    ConcurrentModification,

    #[error("Session not found")]
    NotFound,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}
