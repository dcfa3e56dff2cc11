//! Background reconciliation of sessions left running past the timeout.
//!
//! Runs on a fixed interval using `tokio::time::interval`. Each sweep scans
//! for strictly-overdue Active sessions and force-ends them one at a time;
//! a session that is clocked out between the scan and the update is simply a
//! lost race, not an error.

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use careclock_db::repositories::VisitSessionRepo;

use crate::config::EngineConfig;
use crate::engine::VisitEngine;
use crate::error::AppResult;

/// Outcome of a single reconciliation sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Overdue sessions found by the scan.
    pub scanned: usize,
    /// Sessions force-ended by this sweep.
    pub ended: usize,
    /// Sessions that were ended concurrently before the update landed.
    pub already_ended: usize,
    /// Sessions skipped because of a persistence failure; retried on the
    /// next sweep.
    pub errors: usize,
}

/// Scan for overdue sessions and force-end each one.
///
/// Failures on individual sessions are logged and skipped so one bad row
/// never stalls the rest of the sweep.
pub async fn sweep(pool: &PgPool, cfg: &EngineConfig) -> AppResult<SweepStats> {
    let now = chrono::Utc::now();
    let overdue = VisitSessionRepo::find_timed_out(pool, now, cfg.session_timeout_minutes).await?;

    let mut stats = SweepStats {
        scanned: overdue.len(),
        ..SweepStats::default()
    };

    for session in &overdue {
        match VisitEngine::force_timeout(pool, cfg, session).await {
            Ok(Some(_)) => stats.ended += 1,
            Ok(None) => stats.already_ended += 1,
            Err(e) => {
                stats.errors += 1;
                tracing::error!(
                    session_uid = %session.session_uid,
                    error = %e,
                    "Reconciler: failed to force-end session"
                );
            }
        }
    }

    Ok(stats)
}

/// Run the timeout reconciliation loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cfg: EngineConfig, cancel: CancellationToken) {
    tracing::info!(
        timeout_minutes = cfg.session_timeout_minutes,
        interval_secs = cfg.reconcile_interval_secs,
        "Timeout reconciler started"
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(cfg.reconcile_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Timeout reconciler stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(&pool, &cfg).await {
                    Ok(stats) if stats.scanned > 0 => {
                        tracing::info!(
                            scanned = stats.scanned,
                            ended = stats.ended,
                            already_ended = stats.already_ended,
                            errors = stats.errors,
                            "Reconciler sweep finished"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!("Reconciler sweep: nothing overdue");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reconciler sweep failed");
                    }
                }
            }
        }
    }
}
