//! Supervisor-review flagging heuristics.
//!
//! Evaluated once, synchronously, whenever a session reaches a terminal
//! state. Flags are sticky: the engine sets them and never clears them;
//! clearing is an external supervisor action.

use crate::lifecycle::{STATUS_AUTO_ENDED, STATUS_EMERGENCY_ENDED};

/// Default end-fix accuracy (meters) beyond which a session is flagged.
pub const DEFAULT_END_ACCURACY_M: f64 = 50.0;

/// Default minimum plausible visit duration in minutes.
pub const DEFAULT_MIN_DURATION_MINUTES: i32 = 5;

/// Default allowed distance (meters) between the end fix and the client site.
pub const DEFAULT_GPS_THRESHOLD_M: f64 = 100.0;

/// Tunable thresholds for the review heuristics.
#[derive(Debug, Clone)]
pub struct FlagThresholds {
    /// End-fix accuracy worse than this flags the session.
    pub end_accuracy_m: f64,
    /// Sessions shorter than this many minutes are implausible.
    pub min_duration_minutes: i32,
    /// End fix farther than this from the client site suggests drift or spoofing.
    pub gps_threshold_m: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            end_accuracy_m: DEFAULT_END_ACCURACY_M,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            gps_threshold_m: DEFAULT_GPS_THRESHOLD_M,
        }
    }
}

/// Why a session was flagged for review. Persisted as text labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagReason {
    InaccurateEndFix,
    FarFromSite,
    ImplausiblyShort,
    TimedOut,
    EmergencyEnd,
}

impl FlagReason {
    /// Stable label stored in the `flag_reasons` column.
    pub fn as_str(self) -> &'static str {
        match self {
            FlagReason::InaccurateEndFix => "inaccurate_end_fix",
            FlagReason::FarFromSite => "far_from_site",
            FlagReason::ImplausiblyShort => "implausibly_short",
            FlagReason::TimedOut => "timed_out",
            FlagReason::EmergencyEnd => "emergency_end",
        }
    }
}

/// The facts about a terminal session that the heuristics inspect.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Terminal status id (see `lifecycle`).
    pub status: i16,
    pub duration_minutes: i32,
    /// Accuracy of the end fix, if one was reported.
    pub end_accuracy_m: Option<f64>,
    /// Distance from the end fix to the client site, if computable.
    pub end_distance_m: Option<f64>,
}

/// Evaluate a completed/ended session against the flagging heuristics.
///
/// Returns every reason that holds; an empty vec means no review needed.
/// Auto-ended and emergency-ended sessions are always flagged.
pub fn evaluate(outcome: &SessionOutcome, thresholds: &FlagThresholds) -> Vec<FlagReason> {
    let mut reasons = Vec::new();

    if outcome.status == STATUS_AUTO_ENDED {
        reasons.push(FlagReason::TimedOut);
    }
    if outcome.status == STATUS_EMERGENCY_ENDED {
        reasons.push(FlagReason::EmergencyEnd);
    }

    if let Some(accuracy) = outcome.end_accuracy_m {
        if accuracy > thresholds.end_accuracy_m {
            reasons.push(FlagReason::InaccurateEndFix);
        }
    }

    if let Some(distance) = outcome.end_distance_m {
        if distance > thresholds.gps_threshold_m {
            reasons.push(FlagReason::FarFromSite);
        }
    }

    if outcome.status != STATUS_AUTO_ENDED && outcome.duration_minutes < thresholds.min_duration_minutes
    {
        reasons.push(FlagReason::ImplausiblyShort);
    }

    reasons
}
