//! Route definitions for the `/sessions` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions::list_own))
        .route("/clock-in", post(sessions::clock_in))
        .route("/clock-out", post(sessions::clock_out))
        .route("/location", post(sessions::record_location))
        .route("/emergency-end", post(sessions::emergency_end))
        .route("/disconnect", post(sessions::disconnect))
        .route("/active", get(sessions::get_active))
        .route("/all", get(sessions::list_all))
        .route("/{uid}", get(sessions::get_session))
}
