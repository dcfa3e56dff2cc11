//! Session lifecycle state machine and derived-time helpers.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and any future worker or CLI tooling.

use chrono::Duration;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status ids
// ---------------------------------------------------------------------------

/// Session status IDs matching `session_statuses` seed data (1-based
/// SMALLSERIAL). Intentionally duplicated from the `db` crate's
/// `SessionStatus` enum because `core` must have zero internal deps.
pub const STATUS_ACTIVE: i16 = 1;
pub const STATUS_COMPLETED: i16 = 2;
pub const STATUS_AUTO_ENDED: i16 = 3;
pub const STATUS_DISCONNECTED: i16 = 4;
pub const STATUS_EMERGENCY_ENDED: i16 = 5;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Returns the set of valid target status IDs reachable from `from_status`.
///
/// The machine is one-directional: the only non-terminal state is Active,
/// and a session never re-enters it. Terminal states return an empty slice.
pub fn valid_transitions(from_status: i16) -> &'static [i16] {
    match from_status {
        // Active -> Completed, AutoEnded, Disconnected, EmergencyEnded
        STATUS_ACTIVE => &[
            STATUS_COMPLETED,
            STATUS_AUTO_ENDED,
            STATUS_DISCONNECTED,
            STATUS_EMERGENCY_ENDED,
        ],
        // Terminal states: no further transitions allowed
        STATUS_COMPLETED | STATUS_AUTO_ENDED | STATUS_DISCONNECTED | STATUS_EMERGENCY_ENDED => &[],
        // Unknown status: no transitions allowed
        _ => &[],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: i16, to: i16) -> bool {
    valid_transitions(from).contains(&to)
}

/// Whether a status is terminal (no outgoing transitions).
pub fn is_terminal(status: i16) -> bool {
    status != STATUS_ACTIVE && status_name(status) != "Unknown"
}

/// Human-readable name for a status ID (for error messages).
pub fn status_name(id: i16) -> &'static str {
    match id {
        STATUS_ACTIVE => "Active",
        STATUS_COMPLETED => "Completed",
        STATUS_AUTO_ENDED => "AutoEnded",
        STATUS_DISCONNECTED => "Disconnected",
        STATUS_EMERGENCY_ENDED => "EmergencyEnded",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Derived times
// ---------------------------------------------------------------------------

/// Session duration in whole minutes, never negative.
pub fn duration_minutes(started_at: Timestamp, ended_at: Timestamp) -> i32 {
    (ended_at - started_at).num_minutes().max(0) as i32
}

/// Whether an Active session started at `started_at` has exceeded the
/// timeout by time `now`. Strictly greater: a session at exactly the
/// ceiling is not yet overdue.
pub fn timed_out(now: Timestamp, started_at: Timestamp, timeout_minutes: i64) -> bool {
    now - started_at > Duration::minutes(timeout_minutes)
}

/// The end time recorded for a force-timeout: the timeout ceiling, not the
/// reconciliation time, so duration is not inflated by sweep latency.
pub fn auto_end_time(started_at: Timestamp, timeout_minutes: i64) -> Timestamp {
    started_at + Duration::minutes(timeout_minutes)
}
