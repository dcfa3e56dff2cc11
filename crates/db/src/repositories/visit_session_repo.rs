//! Repository for the `visit_sessions` and `session_locations` tables.
//!
//! This is the engine's session store. The two invariants the schema and
//! these queries enforce together:
//!
//! - At most one Active session per practitioner, via the partial unique
//!   index `uq_visit_sessions_active_practitioner` and a single conditional
//!   insert (no read-then-write window).
//! - Terminal transitions are optimistic: one UPDATE guarded on
//!   `status_id = Active`. Whichever of a racing clock-out / force-timeout
//!   lands first wins; the loser sees zero rows and no partial field update.
//! - Trail appends carry the same Active guard plus a non-decreasing
//!   `captured_at` check, both inside the one conditional INSERT.

use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use careclock_core::types::{DbId, Timestamp};

use crate::models::status::SessionStatus;
use crate::models::visit_session::{
    CreateVisitSession, FinishVisitSession, LocationPing, NewLocationPing, SessionListQuery,
    VisitSession,
};

/// Column list for `visit_sessions` queries.
const COLUMNS: &str = "\
    id, session_uid, practitioner_id, client_site_id, status_id, \
    started_at, ended_at, \
    start_latitude, start_longitude, start_accuracy_m, start_captured_at, \
    end_latitude, end_longitude, end_accuracy_m, end_captured_at, \
    service_type, notes, duration_minutes, distance_from_site_m, end_reason, \
    flagged_for_review, flag_reasons, created_at, updated_at";

/// Column list for `session_locations` queries.
const PING_COLUMNS: &str =
    "id, session_id, latitude, longitude, accuracy_m, captured_at, created_at";

/// Maximum page size for session listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for session listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides persistence operations for visit sessions.
pub struct VisitSessionRepo;

impl VisitSessionRepo {
    /// Atomically create an Active session for a practitioner.
    ///
    /// The uniqueness check and the insert are one statement: `ON CONFLICT`
    /// against the partial unique index returns no row instead of a new
    /// session when the practitioner already has an Active one. Returns
    /// `Ok(None)` in that case.
    pub async fn create_active(
        pool: &PgPool,
        input: &CreateVisitSession,
    ) -> Result<Option<VisitSession>, sqlx::Error> {
        let query = format!(
            "INSERT INTO visit_sessions \
                 (practitioner_id, client_site_id, status_id, started_at, \
                  start_latitude, start_longitude, start_accuracy_m, start_captured_at, \
                  service_type, notes, distance_from_site_m) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (practitioner_id) WHERE status_id = {active} DO NOTHING \
             RETURNING {COLUMNS}",
            active = SessionStatus::Active.id(),
        );
        sqlx::query_as::<_, VisitSession>(&query)
            .bind(input.practitioner_id)
            .bind(input.client_site_id)
            .bind(SessionStatus::Active.id())
            .bind(input.started_at)
            .bind(input.start_latitude)
            .bind(input.start_longitude)
            .bind(input.start_accuracy_m)
            .bind(input.start_captured_at)
            .bind(&input.service_type)
            .bind(&input.notes)
            .bind(input.distance_from_site_m)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by its public UUID.
    pub async fn find_by_uid(
        pool: &PgPool,
        uid: Uuid,
    ) -> Result<Option<VisitSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM visit_sessions WHERE session_uid = $1");
        sqlx::query_as::<_, VisitSession>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await
    }

    /// The practitioner's current Active session, if any.
    pub async fn get_active(
        pool: &PgPool,
        practitioner_id: DbId,
    ) -> Result<Option<VisitSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM visit_sessions \
             WHERE practitioner_id = $1 AND status_id = $2"
        );
        sqlx::query_as::<_, VisitSession>(&query)
            .bind(practitioner_id)
            .bind(SessionStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// All Active sessions that exceeded the timeout by `now`.
    ///
    /// Strictly overdue only (`started_at < now - timeout`). Ordered oldest
    /// first so the longest-overdue sessions are reconciled first if a sweep
    /// is capacity-limited.
    pub async fn find_timed_out(
        pool: &PgPool,
        now: Timestamp,
        timeout_minutes: i64,
    ) -> Result<Vec<VisitSession>, sqlx::Error> {
        let cutoff = now - Duration::minutes(timeout_minutes);
        let query = format!(
            "SELECT {COLUMNS} FROM visit_sessions \
             WHERE status_id = $1 AND started_at < $2 \
             ORDER BY started_at ASC"
        );
        sqlx::query_as::<_, VisitSession>(&query)
            .bind(SessionStatus::Active.id())
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Apply a terminal transition computed against an observed Active state.
    ///
    /// Guarded on `status_id = Active`: returns `Ok(None)` when the session
    /// was ended concurrently (or does not exist), with no fields touched.
    pub async fn finish(
        pool: &PgPool,
        session_id: DbId,
        input: &FinishVisitSession,
    ) -> Result<Option<VisitSession>, sqlx::Error> {
        let query = format!(
            "UPDATE visit_sessions \
             SET status_id = $2, ended_at = $3, \
                 end_latitude = $4, end_longitude = $5, \
                 end_accuracy_m = $6, end_captured_at = $7, \
                 duration_minutes = $8, \
                 notes = COALESCE($9, notes), \
                 end_reason = $10, \
                 flagged_for_review = $11, flag_reasons = $12, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $13 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VisitSession>(&query)
            .bind(session_id)
            .bind(input.new_status)
            .bind(input.ended_at)
            .bind(input.end_latitude)
            .bind(input.end_longitude)
            .bind(input.end_accuracy_m)
            .bind(input.end_captured_at)
            .bind(input.duration_minutes)
            .bind(&input.notes)
            .bind(&input.end_reason)
            .bind(input.flagged_for_review)
            .bind(&input.flag_reasons)
            .bind(SessionStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Append a sample to a session's location trail.
    ///
    /// Optimistic like `finish`: the insert only lands while the session is
    /// still Active, so a sample racing a concurrent ending never post-dates
    /// the recorded end. The trail is also non-decreasing in `captured_at`;
    /// samples older than the newest recorded entry are rejected. Either
    /// guard failing returns `Ok(None)` without inserting. Equal timestamps
    /// are accepted.
    pub async fn append_location(
        pool: &PgPool,
        session_id: DbId,
        ping: &NewLocationPing,
    ) -> Result<Option<LocationPing>, sqlx::Error> {
        let query = format!(
            "INSERT INTO session_locations \
                 (session_id, latitude, longitude, accuracy_m, captured_at) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE EXISTS ( \
                 SELECT 1 FROM visit_sessions \
                 WHERE id = $1 AND status_id = {active} \
             ) \
             AND NOT EXISTS ( \
                 SELECT 1 FROM session_locations \
                 WHERE session_id = $1 AND captured_at > $5 \
             ) \
             RETURNING {PING_COLUMNS}",
            active = SessionStatus::Active.id(),
        );
        sqlx::query_as::<_, LocationPing>(&query)
            .bind(session_id)
            .bind(ping.latitude)
            .bind(ping.longitude)
            .bind(ping.accuracy_m)
            .bind(ping.captured_at)
            .fetch_optional(pool)
            .await
    }

    /// The full location trail for a session, insertion-ordered.
    pub async fn trail(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<LocationPing>, sqlx::Error> {
        let query = format!(
            "SELECT {PING_COLUMNS} FROM session_locations \
             WHERE session_id = $1 \
             ORDER BY captured_at ASC, id ASC"
        );
        sqlx::query_as::<_, LocationPing>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// The newest trail entry for a session, if any.
    pub async fn last_location(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<LocationPing>, sqlx::Error> {
        let query = format!(
            "SELECT {PING_COLUMNS} FROM session_locations \
             WHERE session_id = $1 \
             ORDER BY captured_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, LocationPing>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// List sessions for one practitioner with optional filters.
    pub async fn list_by_practitioner(
        pool: &PgPool,
        practitioner_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<VisitSession>, sqlx::Error> {
        Self::list_sessions(pool, Some(practitioner_id), params).await
    }

    /// List all sessions (supervisor/admin view) with optional filters.
    pub async fn list_all(
        pool: &PgPool,
        params: &SessionListQuery,
    ) -> Result<Vec<VisitSession>, sqlx::Error> {
        Self::list_sessions(pool, params.practitioner_id, params).await
    }

    /// Shared listing query builder. When `practitioner_id` is `Some`,
    /// filters to that practitioner's sessions.
    async fn list_sessions(
        pool: &PgPool,
        practitioner_id: Option<DbId>,
        params: &SessionListQuery,
    ) -> Result<Vec<VisitSession>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if practitioner_id.is_some() {
            conditions.push(format!("practitioner_id = ${bind_idx}"));
            bind_idx += 1;
        }

        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM visit_sessions \
             {where_clause} \
             ORDER BY started_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, VisitSession>(&query);

        if let Some(pid) = practitioner_id {
            q = q.bind(pid);
        }
        if let Some(sid) = params.status_id {
            q = q.bind(sid);
        }

        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
