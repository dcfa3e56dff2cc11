//! Route definitions for the client site directory.

use axum::routing::get;
use axum::Router;

use crate::handlers::clients;
use crate::state::AppState;

/// Routes mounted at `/clients`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(clients::list_clients))
        .route("/{id}", get(clients::get_client))
}
