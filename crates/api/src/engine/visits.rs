//! Orchestration of the clock-in/clock-out session lifecycle.
//!
//! Each operation follows the same shape: load and authorize, validate
//! against the pure rules in `careclock_core`, then apply the change through
//! a single guarded statement in `careclock_db`. The store's `Ok(None)`
//! results are translated into the typed [`VisitError`]s here; handlers never
//! see raw row counts.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use careclock_core::error::{CoreError, VisitError};
use careclock_core::flagging::{self, SessionOutcome};
use careclock_core::geo::{self, Coordinate, LocationSample};
use careclock_core::lifecycle;
use careclock_core::roles::{ROLE_ADMIN, ROLE_SUPERVISOR};
use careclock_core::types::{DbId, Timestamp};
use careclock_db::models::client_site::ClientSite;
use careclock_db::models::status::SessionStatus;
use careclock_db::models::visit_session::{
    CreateVisitSession, FinishVisitSession, LocationPing, NewLocationPing, VisitSession,
};
use careclock_db::repositories::{ClientSiteRepo, UserRepo, VisitSessionRepo};

use crate::config::EngineConfig;
use crate::error::AppResult;

/// Everything the engine needs to start a session.
#[derive(Debug)]
pub struct ClockInInput {
    pub client_site_id: DbId,
    pub location: LocationSample,
    pub service_type: String,
    pub notes: Option<String>,
}

/// The session engine. Stateless; all state lives in the database.
pub struct VisitEngine;

impl VisitEngine {
    /// Start a session for a practitioner at a client site.
    ///
    /// Validates the clock-in fix against the site's coordinates before
    /// touching the store. The store's conditional insert enforces the
    /// one-active-session rule; a second clock-in never partially succeeds.
    pub async fn clock_in(
        pool: &PgPool,
        cfg: &EngineConfig,
        practitioner_id: DbId,
        input: ClockInInput,
    ) -> AppResult<VisitSession> {
        Self::require_active_practitioner(pool, practitioner_id).await?;

        let site = Self::load_site(pool, input.client_site_id).await?;
        let site_coord = Coordinate::new(site.latitude, site.longitude)?;

        let distance_m = geo::distance_meters(input.location.coordinate, site_coord);
        let allowed_m = cfg.gps_accuracy_threshold_m + input.location.accuracy_m;
        if distance_m > allowed_m {
            return Err(VisitError::LocationOutOfRange {
                distance_m,
                allowed_m,
            }
            .into());
        }

        let now = Utc::now();
        let created = VisitSessionRepo::create_active(
            pool,
            &CreateVisitSession {
                practitioner_id,
                client_site_id: site.id,
                started_at: now,
                start_latitude: input.location.coordinate.latitude,
                start_longitude: input.location.coordinate.longitude,
                start_accuracy_m: input.location.accuracy_m,
                start_captured_at: input.location.captured_at,
                service_type: input.service_type,
                notes: input.notes,
                distance_from_site_m: distance_m,
            },
        )
        .await?;

        let session = created.ok_or(VisitError::SessionAlreadyActive)?;

        // Seed the trail with the clock-in fix so later endings always have
        // a last-known location to fall back on.
        VisitSessionRepo::append_location(
            pool,
            session.id,
            &NewLocationPing {
                latitude: input.location.coordinate.latitude,
                longitude: input.location.coordinate.longitude,
                accuracy_m: input.location.accuracy_m,
                captured_at: input.location.captured_at,
            },
        )
        .await?;

        tracing::info!(
            session_uid = %session.session_uid,
            practitioner_id,
            client_site_id = site.id,
            distance_m,
            "Session clocked in"
        );

        Ok(session)
    }

    /// Append a mid-visit location sample to the session's trail.
    ///
    /// Only the owning practitioner may report, and only while the session is
    /// Active. Samples older than the newest trail entry are rejected, as are
    /// samples that lose a race against a concurrent ending.
    pub async fn record_location(
        pool: &PgPool,
        practitioner_id: DbId,
        session_uid: Uuid,
        sample: LocationSample,
    ) -> AppResult<LocationPing> {
        let session = Self::load_owned_active(pool, practitioner_id, session_uid).await?;

        let inserted = VisitSessionRepo::append_location(
            pool,
            session.id,
            &NewLocationPing {
                latitude: sample.coordinate.latitude,
                longitude: sample.coordinate.longitude,
                accuracy_m: sample.accuracy_m,
                captured_at: sample.captured_at,
            },
        )
        .await?;

        match inserted {
            Some(ping) => Ok(ping),
            // The insert refuses both stale samples and sessions ended since
            // the read above; re-read the status to report the right one.
            None => {
                let current = VisitSessionRepo::find_by_uid(pool, session_uid)
                    .await?
                    .ok_or(VisitError::NotFound)?;
                if current.status_id != lifecycle::STATUS_ACTIVE {
                    return Err(VisitError::ConcurrentModification.into());
                }
                Err(VisitError::StaleTimestamp.into())
            }
        }
    }

    /// Clean clock-out by the practitioner.
    pub async fn clock_out(
        pool: &PgPool,
        cfg: &EngineConfig,
        practitioner_id: DbId,
        session_uid: Uuid,
        sample: LocationSample,
        notes: Option<String>,
    ) -> AppResult<VisitSession> {
        let session = Self::load_owned_active(pool, practitioner_id, session_uid).await?;

        let now = Utc::now();
        let finish = Self::build_finish(
            pool,
            cfg,
            &session,
            SessionStatus::Completed,
            now,
            Some(sample),
            notes,
            None,
        )
        .await?;

        let ended = VisitSessionRepo::finish(pool, session.id, &finish)
            .await?
            .ok_or(VisitError::ConcurrentModification)?;

        tracing::info!(
            session_uid = %ended.session_uid,
            practitioner_id,
            duration_minutes = ended.duration_minutes,
            flagged = ended.flagged_for_review,
            "Session clocked out"
        );

        Ok(ended)
    }

    /// Immediate termination via the emergency path.
    ///
    /// Allowed for the owning practitioner or a supervisor/admin acting on
    /// their behalf. Skips GPS validation entirely; the practitioner may be
    /// nowhere near the site. The reason is appended to the session notes
    /// and the session is always flagged for supervisor review.
    pub async fn emergency_end(
        pool: &PgPool,
        cfg: &EngineConfig,
        caller_id: DbId,
        caller_role: &str,
        session_uid: Uuid,
        reason: String,
        sample: Option<LocationSample>,
    ) -> AppResult<VisitSession> {
        let session = Self::load_active(pool, session_uid).await?;
        if session.practitioner_id != caller_id
            && caller_role != ROLE_SUPERVISOR
            && caller_role != ROLE_ADMIN
        {
            return Err(VisitError::PermissionDenied(
                "Only the owner or a supervisor may emergency-end a session".into(),
            )
            .into());
        }

        let tag = format!("EMERGENCY: {reason}");
        let notes = Some(match &session.notes {
            Some(existing) => format!("{existing}\n{tag}"),
            None => tag,
        });

        let now = Utc::now();
        let finish = Self::build_finish(
            pool,
            cfg,
            &session,
            SessionStatus::EmergencyEnded,
            now,
            sample,
            notes,
            Some(reason),
        )
        .await?;

        let ended = VisitSessionRepo::finish(pool, session.id, &finish)
            .await?
            .ok_or(VisitError::ConcurrentModification)?;

        tracing::warn!(
            session_uid = %ended.session_uid,
            practitioner_id = ended.practitioner_id,
            caller_id,
            "Session ended via emergency path"
        );

        Ok(ended)
    }

    /// End a session whose device lost connectivity before a clean clock-out.
    ///
    /// No end fix is reported; the newest trail entry stands in for it.
    pub async fn mark_disconnected(
        pool: &PgPool,
        cfg: &EngineConfig,
        practitioner_id: DbId,
        session_uid: Uuid,
    ) -> AppResult<VisitSession> {
        let session = Self::load_owned_active(pool, practitioner_id, session_uid).await?;

        let now = Utc::now();
        let finish = Self::build_finish(
            pool,
            cfg,
            &session,
            SessionStatus::Disconnected,
            now,
            None,
            None,
            Some("disconnected".to_string()),
        )
        .await?;

        let ended = VisitSessionRepo::finish(pool, session.id, &finish)
            .await?
            .ok_or(VisitError::ConcurrentModification)?;

        tracing::warn!(
            session_uid = %ended.session_uid,
            practitioner_id,
            "Session marked disconnected"
        );

        Ok(ended)
    }

    /// Force-end an overdue session on behalf of the reconciler.
    ///
    /// The recorded end time is the timeout ceiling (`started_at + timeout`),
    /// not the sweep time, so a late sweep never inflates the duration.
    /// Returns `Ok(None)` when the session is not actually past the ceiling
    /// or was ended concurrently; the reconciler treats both as non-work.
    pub async fn force_timeout(
        pool: &PgPool,
        cfg: &EngineConfig,
        session: &VisitSession,
    ) -> AppResult<Option<VisitSession>> {
        if !lifecycle::timed_out(Utc::now(), session.started_at, cfg.session_timeout_minutes) {
            return Ok(None);
        }

        let ended_at = lifecycle::auto_end_time(session.started_at, cfg.session_timeout_minutes);
        let finish = Self::build_finish(
            pool,
            cfg,
            session,
            SessionStatus::AutoEnded,
            ended_at,
            None,
            None,
            Some("timeout".to_string()),
        )
        .await?;

        let ended = VisitSessionRepo::finish(pool, session.id, &finish).await?;

        if let Some(s) = &ended {
            tracing::warn!(
                session_uid = %s.session_uid,
                practitioner_id = s.practitioner_id,
                started_at = %s.started_at,
                "Session force-ended by timeout"
            );
        }

        Ok(ended)
    }

    /// Load a session by uid and require it to still be Active.
    async fn load_active(pool: &PgPool, session_uid: Uuid) -> AppResult<VisitSession> {
        let session = VisitSessionRepo::find_by_uid(pool, session_uid)
            .await?
            .ok_or(VisitError::NotFound)?;

        if session.status_id != lifecycle::STATUS_ACTIVE {
            return Err(VisitError::InvalidTransition {
                from: lifecycle::status_name(session.status_id),
            }
            .into());
        }

        Ok(session)
    }

    /// Load a session by uid and require it to be the practitioner's own
    /// Active session.
    async fn load_owned_active(
        pool: &PgPool,
        practitioner_id: DbId,
        session_uid: Uuid,
    ) -> AppResult<VisitSession> {
        let session = Self::load_active(pool, session_uid).await?;
        if session.practitioner_id != practitioner_id {
            return Err(VisitError::PermissionDenied(
                "Session belongs to another practitioner".into(),
            )
            .into());
        }
        Ok(session)
    }

    /// Deactivated accounts keep a valid token until it expires; refuse new
    /// sessions for them here.
    async fn require_active_practitioner(pool: &PgPool, id: DbId) -> AppResult<()> {
        let user = UserRepo::find_by_id(pool, id)
            .await?
            .ok_or(CoreError::NotFound { entity: "user", id })?;
        if !user.is_active {
            return Err(VisitError::PermissionDenied(
                "Practitioner account is deactivated".into(),
            )
            .into());
        }
        Ok(())
    }

    async fn load_site(pool: &PgPool, id: DbId) -> AppResult<ClientSite> {
        let site = ClientSiteRepo::find_by_id(pool, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "client_site",
                id,
            })?;
        if !site.is_active {
            return Err(CoreError::Validation(format!(
                "Client site {id} is not active"
            ))
            .into());
        }
        Ok(site)
    }

    /// Compute everything a terminal transition writes: end location (the
    /// reported fix, falling back to the newest trail entry), duration, and
    /// the review flags.
    #[allow(clippy::too_many_arguments)]
    async fn build_finish(
        pool: &PgPool,
        cfg: &EngineConfig,
        session: &VisitSession,
        new_status: SessionStatus,
        ended_at: Timestamp,
        sample: Option<LocationSample>,
        notes: Option<String>,
        end_reason: Option<String>,
    ) -> AppResult<FinishVisitSession> {
        let (end_latitude, end_longitude, end_accuracy_m, end_captured_at) = match &sample {
            Some(s) => (
                Some(s.coordinate.latitude),
                Some(s.coordinate.longitude),
                Some(s.accuracy_m),
                Some(s.captured_at),
            ),
            None => match VisitSessionRepo::last_location(pool, session.id).await? {
                Some(last) => (
                    Some(last.latitude),
                    Some(last.longitude),
                    Some(last.accuracy_m),
                    Some(last.captured_at),
                ),
                None => (None, None, None, None),
            },
        };

        let end_distance_m = match (end_latitude, end_longitude) {
            (Some(lat), Some(lon)) => {
                let site = ClientSiteRepo::find_by_id(pool, session.client_site_id).await?;
                match site {
                    Some(site) => {
                        let site_coord = Coordinate::new(site.latitude, site.longitude)?;
                        let end_coord = Coordinate::new(lat, lon)?;
                        Some(geo::distance_meters(end_coord, site_coord))
                    }
                    None => None,
                }
            }
            _ => None,
        };

        let duration_minutes = lifecycle::duration_minutes(session.started_at, ended_at);

        let outcome = SessionOutcome {
            status: new_status.id(),
            duration_minutes,
            end_accuracy_m,
            end_distance_m,
        };
        let reasons = flagging::evaluate(&outcome, &cfg.flag_thresholds());
        let flagged_for_review = !reasons.is_empty();
        let flag_reasons = reasons.iter().map(|r| r.as_str().to_string()).collect();

        Ok(FinishVisitSession {
            new_status: new_status.id(),
            ended_at,
            end_latitude,
            end_longitude,
            end_accuracy_m,
            end_captured_at,
            duration_minutes,
            notes,
            end_reason,
            flagged_for_review,
            flag_reasons,
        })
    }
}
