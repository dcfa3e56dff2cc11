//! Handlers for the `/sessions` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Mutation endpoints
//! operate on the caller's own active session; listing across practitioners
//! requires supervisor or admin.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use careclock_core::error::{CoreError, VisitError};
use careclock_core::geo::{Coordinate, LocationSample};
use careclock_core::roles::{ROLE_ADMIN, ROLE_SUPERVISOR};
use careclock_core::types::{DbId, Timestamp};
use careclock_db::models::visit_session::{SessionListQuery, VisitSession};
use careclock_db::repositories::VisitSessionRepo;

use crate::engine::{ClockInInput, VisitEngine};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSupervisor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A GPS fix as reported by the device.
#[derive(Debug, Deserialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub captured_at: Timestamp,
}

impl LocationPayload {
    /// Validate the raw payload into a domain sample.
    fn into_sample(self) -> AppResult<LocationSample> {
        let coordinate = Coordinate::new(self.latitude, self.longitude)?;
        Ok(LocationSample::new(
            coordinate,
            self.accuracy_m,
            self.captured_at,
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct ClockInRequest {
    pub client_site_id: DbId,
    pub location: LocationPayload,
    pub service_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClockOutRequest {
    pub location: LocationPayload,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub location: LocationPayload,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyEndRequest {
    pub reason: String,
    pub location: Option<LocationPayload>,
    /// Target another practitioner's session (supervisor/admin only).
    /// Defaults to the caller's own active session.
    pub session_uid: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The caller's current active session, or 404.
async fn own_active_session(pool: &sqlx::PgPool, auth: &AuthUser) -> AppResult<VisitSession> {
    VisitSessionRepo::get_active(pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Visit(VisitError::NotFound))
}

// ---------------------------------------------------------------------------
// Clock in / out
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions/clock-in
///
/// Start a session at a client site. Returns 201 with the created session,
/// 400 if the fix is out of range, 409 if a session is already active.
pub async fn clock_in(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ClockInRequest>,
) -> AppResult<impl IntoResponse> {
    let session = VisitEngine::clock_in(
        &state.pool,
        &state.config.engine,
        auth.user_id,
        ClockInInput {
            client_site_id: input.client_site_id,
            location: input.location.into_sample()?,
            service_type: input.service_type,
            notes: input.notes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// POST /api/v1/sessions/clock-out
///
/// End the caller's active session with a final GPS fix. Returns 404 if no
/// session is active, 409 if it was ended concurrently.
pub async fn clock_out(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ClockOutRequest>,
) -> AppResult<impl IntoResponse> {
    let active = own_active_session(&state.pool, &auth).await?;
    let session = VisitEngine::clock_out(
        &state.pool,
        &state.config.engine,
        auth.user_id,
        active.session_uid,
        input.location.into_sample()?,
        input.notes,
    )
    .await?;

    Ok(Json(DataResponse { data: session }))
}

// ---------------------------------------------------------------------------
// Trail updates
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions/location
///
/// Append a fix to the caller's active session trail. Returns 409 if the
/// sample is older than the newest recorded entry.
pub async fn record_location(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LocationUpdateRequest>,
) -> AppResult<impl IntoResponse> {
    let active = own_active_session(&state.pool, &auth).await?;
    let ping = VisitEngine::record_location(
        &state.pool,
        auth.user_id,
        active.session_uid,
        input.location.into_sample()?,
    )
    .await?;

    Ok(Json(DataResponse { data: ping }))
}

// ---------------------------------------------------------------------------
// Emergency / disconnect endings
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions/emergency-end
///
/// Immediately end a session, skipping GPS validation. Defaults to the
/// caller's own active session; supervisors and admins may target another
/// practitioner's session via `session_uid`. Always flags the session for
/// supervisor review.
pub async fn emergency_end(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<EmergencyEndRequest>,
) -> AppResult<impl IntoResponse> {
    if input.reason.trim().is_empty() {
        return Err(CoreError::Validation("Emergency reason must not be empty".into()).into());
    }

    let sample = input.location.map(LocationPayload::into_sample).transpose()?;
    let session_uid = match input.session_uid {
        Some(uid) => uid,
        None => own_active_session(&state.pool, &auth).await?.session_uid,
    };
    let session = VisitEngine::emergency_end(
        &state.pool,
        &state.config.engine,
        auth.user_id,
        &auth.role,
        session_uid,
        input.reason,
        sample,
    )
    .await?;

    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/disconnect
///
/// End the caller's active session after a connectivity loss. The newest
/// trail entry stands in for the missing end fix.
pub async fn disconnect(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let active = own_active_session(&state.pool, &auth).await?;
    let session = VisitEngine::mark_disconnected(
        &state.pool,
        &state.config.engine,
        auth.user_id,
        active.session_uid,
    )
    .await?;

    Ok(Json(DataResponse { data: session }))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/active
///
/// The caller's current active session. 404 when none.
pub async fn get_active(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let session = own_active_session(&state.pool, &auth).await?;
    Ok(Json(DataResponse { data: session }))
}

/// GET /api/v1/sessions
///
/// The caller's session history. Supports `status_id`, `limit`, `offset`.
pub async fn list_own(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SessionListQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions =
        VisitSessionRepo::list_by_practitioner(&state.pool, auth.user_id, &params).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /api/v1/sessions/all
///
/// All sessions across practitioners. Supervisor or admin only. Supports
/// `practitioner_id`, `status_id`, `limit`, `offset`.
pub async fn list_all(
    RequireSupervisor(_auth): RequireSupervisor,
    State(state): State<AppState>,
    Query(params): Query<SessionListQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions = VisitSessionRepo::list_all(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /api/v1/sessions/{uid}
///
/// A single session by public uid. Owner, supervisor, or admin only.
pub async fn get_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let session = VisitSessionRepo::find_by_uid(&state.pool, uid)
        .await?
        .ok_or(AppError::Visit(VisitError::NotFound))?;

    if session.practitioner_id != auth.user_id
        && auth.role != ROLE_SUPERVISOR
        && auth.role != ROLE_ADMIN
    {
        return Err(AppError::Visit(VisitError::PermissionDenied(
            "Cannot view another practitioner's session".into(),
        )));
    }

    Ok(Json(DataResponse { data: session }))
}
