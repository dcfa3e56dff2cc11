//! Read-only handlers for the client site directory.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use careclock_core::error::CoreError;
use careclock_core::types::DbId;
use careclock_db::repositories::ClientSiteRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/clients
///
/// List all active client sites, alphabetically.
pub async fn list_clients(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let sites = ClientSiteRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse { data: sites }))
}

/// GET /api/v1/clients/{id}
///
/// A single client site by id.
pub async fn get_client(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let site = ClientSiteRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "client_site",
            id,
        }))?;
    Ok(Json(DataResponse { data: site }))
}
