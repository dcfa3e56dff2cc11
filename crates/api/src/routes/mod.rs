pub mod clients;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /sessions/clock-in          start a session (POST)
/// /sessions/clock-out         end own active session (POST)
/// /sessions/location          append a trail fix (POST)
/// /sessions/emergency-end     immediate termination (POST)
/// /sessions/disconnect        end after connectivity loss (POST)
/// /sessions/active            own active session (GET)
/// /sessions                   own history (GET)
/// /sessions/all               all sessions, supervisor/admin (GET)
/// /sessions/{uid}             single session (GET)
///
/// /clients                    active client sites (GET)
/// /clients/{id}               single client site (GET)
/// ```
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/clients", clients::router())
}
