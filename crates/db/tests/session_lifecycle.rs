//! Integration tests for the visit-session store.
//!
//! Exercises the repository layer against a real database:
//! - Atomic "one Active session per practitioner" creation
//! - Optimistic, status-guarded finish (concurrent-ending semantics)
//! - Timeout scan ordering and boundary
//! - Location-trail ordering and Active-status guards

use chrono::{Duration, Utc};
use sqlx::PgPool;

use careclock_core::types::{DbId, Timestamp};
use careclock_db::models::status::SessionStatus;
use careclock_db::models::visit_session::{
    CreateVisitSession, FinishVisitSession, NewLocationPing, SessionListQuery,
};
use careclock_db::repositories::VisitSessionRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

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

async fn seed_site(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO client_sites (display_name, address, latitude, longitude) \
         VALUES ($1, '12 Main St', 43.6532, -79.3832) RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("seed client site")
}

fn new_session(practitioner_id: DbId, site_id: DbId, started_at: Timestamp) -> CreateVisitSession {
    CreateVisitSession {
        practitioner_id,
        client_site_id: site_id,
        started_at,
        start_latitude: 43.6532,
        start_longitude: -79.3832,
        start_accuracy_m: 10.0,
        start_captured_at: started_at,
        service_type: "counseling".to_string(),
        notes: None,
        distance_from_site_m: 12.0,
    }
}

fn completed(ended_at: Timestamp, duration_minutes: i32) -> FinishVisitSession {
    FinishVisitSession {
        new_status: SessionStatus::Completed.id(),
        ended_at,
        end_latitude: Some(43.6533),
        end_longitude: Some(-79.3831),
        end_accuracy_m: Some(8.0),
        end_captured_at: Some(ended_at),
        duration_minutes,
        notes: Some("visit complete".to_string()),
        end_reason: None,
        flagged_for_review: false,
        flag_reasons: vec![],
    }
}

// ---------------------------------------------------------------------------
// Creation / uniqueness
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn clock_in_creates_active_session(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, Utc::now()))
        .await
        .unwrap()
        .expect("first clock-in should create a session");

    assert_eq!(session.status_id, SessionStatus::Active.id());
    assert_eq!(session.practitioner_id, practitioner);
    assert!(session.ended_at.is_none());
    assert!(session.duration_minutes.is_none());

    let active = VisitSessionRepo::get_active(&pool, practitioner)
        .await
        .unwrap()
        .expect("active session should be visible");
    assert_eq!(active.id, session.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn second_clock_in_is_rejected_atomically(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;

    VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, Utc::now()))
        .await
        .unwrap()
        .expect("first clock-in");

    // Same practitioner, different site: still one Active session system-wide.
    let other_site = seed_site(&pool, "Hillcrest House").await;
    let second =
        VisitSessionRepo::create_active(&pool, &new_session(practitioner, other_site, Utc::now()))
            .await
            .unwrap();
    assert!(second.is_none(), "second clock-in must not create a row");
}

#[sqlx::test(migrations = "./migrations")]
async fn clock_in_allowed_again_after_finish(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;
    let started = Utc::now() - Duration::minutes(50);

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, started))
        .await
        .unwrap()
        .unwrap();

    VisitSessionRepo::finish(&pool, session.id, &completed(Utc::now(), 50))
        .await
        .unwrap()
        .expect("finish should succeed");

    let again = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, Utc::now()))
        .await
        .unwrap();
    assert!(again.is_some(), "terminal session must not block a new clock-in");
}

// ---------------------------------------------------------------------------
// Optimistic finish
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn finish_loses_cleanly_when_already_ended(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;
    let started = Utc::now() - Duration::minutes(30);

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, started))
        .await
        .unwrap()
        .unwrap();

    // First ending wins (a clock-out).
    let won = VisitSessionRepo::finish(&pool, session.id, &completed(Utc::now(), 30))
        .await
        .unwrap();
    assert!(won.is_some());

    // Second ending (say, a racing force-timeout) must see zero rows and
    // leave the stored ending untouched.
    let timeout_end = FinishVisitSession {
        new_status: SessionStatus::AutoEnded.id(),
        ended_at: started + Duration::minutes(480),
        end_latitude: None,
        end_longitude: None,
        end_accuracy_m: None,
        end_captured_at: None,
        duration_minutes: 480,
        notes: None,
        end_reason: Some("timeout".to_string()),
        flagged_for_review: true,
        flag_reasons: vec!["timed_out".to_string()],
    };
    let lost = VisitSessionRepo::finish(&pool, session.id, &timeout_end)
        .await
        .unwrap();
    assert!(lost.is_none());

    let stored = VisitSessionRepo::find_by_uid(&pool, session.session_uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status_id, SessionStatus::Completed.id());
    assert_eq!(stored.duration_minutes, Some(30));
    assert!(!stored.flagged_for_review, "loser must not touch any field");
}

// ---------------------------------------------------------------------------
// Timeout scan
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn find_timed_out_is_strict_and_oldest_first(pool: PgPool) {
    let site = seed_site(&pool, "Lakeside House").await;
    let now = Utc::now();

    // Overdue by 3 hours, overdue by 1 minute, exactly at the ceiling, fresh.
    let p1 = seed_practitioner(&pool, "p.oldest").await;
    let p2 = seed_practitioner(&pool, "p.barely").await;
    let p3 = seed_practitioner(&pool, "p.at-ceiling").await;
    let p4 = seed_practitioner(&pool, "p.fresh").await;

    for (practitioner, minutes_ago) in [(p1, 480 + 180), (p2, 480 + 1), (p3, 480), (p4, 30)] {
        VisitSessionRepo::create_active(
            &pool,
            &new_session(practitioner, site, now - Duration::minutes(minutes_ago)),
        )
        .await
        .unwrap()
        .unwrap();
    }

    let overdue = VisitSessionRepo::find_timed_out(&pool, now, 480).await.unwrap();

    let practitioners: Vec<_> = overdue.iter().map(|s| s.practitioner_id).collect();
    assert_eq!(
        practitioners,
        vec![p1, p2],
        "strictly-overdue only, ordered oldest first"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn ended_sessions_never_reappear_in_timeout_scan(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;
    let now = Utc::now();
    let started = now - Duration::minutes(600);

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, started))
        .await
        .unwrap()
        .unwrap();
    VisitSessionRepo::finish(&pool, session.id, &completed(now, 600))
        .await
        .unwrap()
        .unwrap();

    let overdue = VisitSessionRepo::find_timed_out(&pool, now, 480).await.unwrap();
    assert!(overdue.is_empty());
}

// ---------------------------------------------------------------------------
// Location trail
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn stale_trail_sample_is_rejected_without_insert(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;
    let now = Utc::now();

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, now))
        .await
        .unwrap()
        .unwrap();

    let ping = |captured_at| NewLocationPing {
        latitude: 43.6534,
        longitude: -79.3830,
        accuracy_m: 15.0,
        captured_at,
    };

    let first = VisitSessionRepo::append_location(&pool, session.id, &ping(now)).await.unwrap();
    assert!(first.is_some());

    // Older than the newest entry: rejected, nothing inserted.
    let stale = VisitSessionRepo::append_location(&pool, session.id, &ping(now - Duration::seconds(30)))
        .await
        .unwrap();
    assert!(stale.is_none());

    // Equal timestamp: the trail is non-decreasing, so this is accepted.
    let equal = VisitSessionRepo::append_location(&pool, session.id, &ping(now)).await.unwrap();
    assert!(equal.is_some());

    let trail = VisitSessionRepo::trail(&pool, session.id).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert!(trail.windows(2).all(|w| w[0].captured_at <= w[1].captured_at));
}

#[sqlx::test(migrations = "./migrations")]
async fn trail_append_rejected_after_session_ends(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;
    let now = Utc::now();

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, now))
        .await
        .unwrap()
        .unwrap();

    let ping = |captured_at| NewLocationPing {
        latitude: 43.6534,
        longitude: -79.3830,
        accuracy_m: 15.0,
        captured_at,
    };

    let while_active = VisitSessionRepo::append_location(&pool, session.id, &ping(now)).await.unwrap();
    assert!(while_active.is_some());

    VisitSessionRepo::finish(&pool, session.id, &completed(now + Duration::minutes(30), 30))
        .await
        .unwrap()
        .unwrap();

    // Newer than anything in the trail, but the session is terminal: a sample
    // racing the clock-out must not land.
    let after_end =
        VisitSessionRepo::append_location(&pool, session.id, &ping(now + Duration::minutes(31)))
            .await
            .unwrap();
    assert!(after_end.is_none());

    let trail = VisitSessionRepo::trail(&pool, session.id).await.unwrap();
    assert_eq!(trail.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn last_location_returns_newest_entry(pool: PgPool) {
    let practitioner = seed_practitioner(&pool, "jmorris").await;
    let site = seed_site(&pool, "Lakeside House").await;
    let now = Utc::now();

    let session = VisitSessionRepo::create_active(&pool, &new_session(practitioner, site, now))
        .await
        .unwrap()
        .unwrap();

    for offset_secs in [0, 60, 120] {
        VisitSessionRepo::append_location(
            &pool,
            session.id,
            &NewLocationPing {
                latitude: 43.6534,
                longitude: -79.3830 + offset_secs as f64 * 1e-6,
                accuracy_m: 15.0,
                captured_at: now + Duration::seconds(offset_secs),
            },
        )
        .await
        .unwrap()
        .unwrap();
    }

    let last = VisitSessionRepo::last_location(&pool, session.id)
        .await
        .unwrap()
        .expect("trail is non-empty");
    assert_eq!(last.captured_at, now + Duration::seconds(120));
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn listing_filters_by_practitioner_and_status(pool: PgPool) {
    let site = seed_site(&pool, "Lakeside House").await;
    let p1 = seed_practitioner(&pool, "p.one").await;
    let p2 = seed_practitioner(&pool, "p.two").await;
    let now = Utc::now();

    // p1: one completed, one active. p2: one active.
    let done = VisitSessionRepo::create_active(
        &pool,
        &new_session(p1, site, now - Duration::minutes(90)),
    )
    .await
    .unwrap()
    .unwrap();
    VisitSessionRepo::finish(&pool, done.id, &completed(now - Duration::minutes(30), 60))
        .await
        .unwrap()
        .unwrap();
    VisitSessionRepo::create_active(&pool, &new_session(p1, site, now)).await.unwrap().unwrap();
    VisitSessionRepo::create_active(&pool, &new_session(p2, site, now)).await.unwrap().unwrap();

    let mine = VisitSessionRepo::list_by_practitioner(&pool, p1, &SessionListQuery::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|s| s.practitioner_id == p1));
    // Newest first.
    assert!(mine[0].started_at >= mine[1].started_at);

    let active_only = VisitSessionRepo::list_all(
        &pool,
        &SessionListQuery {
            status_id: Some(SessionStatus::Active.id()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(active_only.len(), 2);
}
