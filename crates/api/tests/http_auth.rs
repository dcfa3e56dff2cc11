//! HTTP-level tests for authentication and error mapping.
//!
//! Drives the assembled router with `tower::ServiceExt::oneshot` to check
//! that the extractors and the error-to-status mapping behave at the edge.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;

use careclock_api::auth::jwt::{generate_access_token, JwtConfig};
use careclock_api::config::{EngineConfig, ServerConfig};
use careclock_api::middleware::rbac::RequireAdmin;
use careclock_api::routes;
use careclock_api::state::AppState;
use careclock_core::types::DbId;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        engine: EngineConfig::default(),
    }
}

fn app(pool: PgPool) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(test_config()),
    };
    Router::new()
        .nest("/api/v1", routes::api_router())
        .with_state(state)
}

fn bearer(user_id: DbId, role: &str) -> String {
    let token = generate_access_token(user_id, role, &test_config().jwt).unwrap();
    format!("Bearer {token}")
}

async fn seed_practitioner(pool: &PgPool, username: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO users (username, display_name, role) \
         VALUES ($1, $1, 'practitioner') RETURNING id",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .expect("seed practitioner")
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_token_is_unauthorized(pool: PgPool) {
    let response = app(pool)
        .oneshot(
            Request::get("/api/v1/sessions/active")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn garbage_token_is_unauthorized(pool: PgPool) {
    let response = app(pool)
        .oneshot(
            Request::get("/api/v1/sessions")
                .header("authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn no_active_session_is_not_found(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;

    let response = app(pool)
        .oneshot(
            Request::get("/api/v1/sessions/active")
                .header("authorization", bearer(practitioner, "practitioner"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn practitioner_cannot_list_all_sessions(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;

    let response = app(pool)
        .oneshot(
            Request::get("/api/v1/sessions/all")
                .header("authorization", bearer(practitioner, "practitioner"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn supervisor_can_list_all_sessions(pool: PgPool) {
    let response = app(pool)
        .oneshot(
            Request::get("/api/v1/sessions/all")
                .header("authorization", bearer(999, "supervisor"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_gate_rejects_supervisor_and_admits_admin(pool: PgPool) {
    let state = AppState {
        pool,
        config: Arc::new(test_config()),
    };

    let request = Request::get("/")
        .header("authorization", bearer(7, "supervisor"))
        .body(Body::empty())
        .unwrap();
    let (mut parts, _) = request.into_parts();
    let rejection = RequireAdmin::from_request_parts(&mut parts, &state)
        .await
        .expect_err("supervisor must not pass the admin gate");
    assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);

    let request = Request::get("/")
        .header("authorization", bearer(7, "admin"))
        .body(Body::empty())
        .unwrap();
    let (mut parts, _) = request.into_parts();
    let RequireAdmin(user) = RequireAdmin::from_request_parts(&mut parts, &state)
        .await
        .expect("admin passes the gate");
    assert_eq!(user.user_id, 7);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn out_of_range_clock_in_is_bad_request(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site_id: DbId = sqlx::query_scalar(
        "INSERT INTO client_sites (display_name, address, latitude, longitude) \
         VALUES ('Lakeside House', '12 Main St', 43.6532, -79.3832) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    // Roughly 11 km from the site.
    let body = serde_json::json!({
        "client_site_id": site_id,
        "location": {
            "latitude": 43.7532,
            "longitude": -79.3832,
            "accuracy_m": 10.0,
            "captured_at": chrono::Utc::now(),
        },
        "service_type": "counseling",
    });

    let response = app(pool)
        .oneshot(
            Request::post("/api/v1/sessions/clock-in")
                .header("authorization", bearer(practitioner, "practitioner"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
