//! Visit session entity models and DTOs for the clock-in/clock-out engine.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use careclock_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `visit_sessions` table.
///
/// End-side columns stay NULL while the session is Active; `finish` fills
/// them all in one statement so a reader never observes a partial ending.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VisitSession {
    pub id: DbId,
    /// Opaque public identifier, assigned at creation.
    pub session_uid: Uuid,
    pub practitioner_id: DbId,
    pub client_site_id: DbId,
    pub status_id: StatusId,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_accuracy_m: f64,
    pub start_captured_at: Timestamp,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub end_accuracy_m: Option<f64>,
    pub end_captured_at: Option<Timestamp>,
    /// Opaque service label (e.g. `counseling`, `assessment`).
    pub service_type: String,
    pub notes: Option<String>,
    /// Whole minutes, computed at end time; NULL while Active.
    pub duration_minutes: Option<i32>,
    /// Distance from the clock-in fix to the client site, for verification.
    pub distance_from_site_m: f64,
    /// Why a non-Completed ending happened (e.g. `timeout`, an emergency reason).
    pub end_reason: Option<String>,
    pub flagged_for_review: bool,
    pub flag_reasons: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the atomic clock-in insert.
#[derive(Debug)]
pub struct CreateVisitSession {
    pub practitioner_id: DbId,
    pub client_site_id: DbId,
    pub started_at: Timestamp,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_accuracy_m: f64,
    pub start_captured_at: Timestamp,
    pub service_type: String,
    pub notes: Option<String>,
    pub distance_from_site_m: f64,
}

/// DTO for the single status-guarded UPDATE that ends a session.
///
/// Built by the engine after it has computed the terminal status, end
/// location, duration, and review flags against an observed Active state.
#[derive(Debug)]
pub struct FinishVisitSession {
    pub new_status: StatusId,
    pub ended_at: Timestamp,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub end_accuracy_m: Option<f64>,
    pub end_captured_at: Option<Timestamp>,
    pub duration_minutes: i32,
    /// Replacement notes; `None` keeps whatever the session already has.
    pub notes: Option<String>,
    pub end_reason: Option<String>,
    pub flagged_for_review: bool,
    pub flag_reasons: Vec<String>,
}

/// A row from the `session_locations` trail table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LocationPing {
    pub id: DbId,
    pub session_id: DbId,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub captured_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for appending to a session's location trail.
#[derive(Debug)]
pub struct NewLocationPing {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub captured_at: Timestamp,
}

/// Query parameters for session listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    /// Filter by status ID (e.g. 1 = active, 3 = auto-ended).
    pub status_id: Option<StatusId>,
    /// Filter to a single practitioner (admin/supervisor listings).
    pub practitioner_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
