//! GPS coordinate types and distance validation.
//!
//! Distances use the haversine great-circle formula. Range checks add the
//! device-reported accuracy radius to the threshold so an imprecise fix is
//! not penalized for hardware it cannot control.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate, validating the decimal-degree ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::Validation(format!(
                "Latitude {latitude} out of range [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::Validation(format!(
                "Longitude {longitude} out of range [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A GPS fix reported by a practitioner's device.
///
/// `accuracy_m` is the device-reported error radius; larger means less
/// reliable. Samples are always owned by a session or a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    pub accuracy_m: f64,
    pub captured_at: Timestamp,
}

impl LocationSample {
    pub fn new(
        coordinate: Coordinate,
        accuracy_m: f64,
        captured_at: Timestamp,
    ) -> Result<Self, CoreError> {
        if !accuracy_m.is_finite() || accuracy_m < 0.0 {
            return Err(CoreError::Validation(format!(
                "GPS accuracy {accuracy_m} must be a non-negative number of meters"
            )));
        }
        Ok(Self {
            coordinate,
            accuracy_m,
            captured_at,
        })
    }
}

/// Great-circle distance between two coordinates in meters.
///
/// Uses `asin(sqrt(a))` with `a` clamped to `[0, 1]` so identical and
/// antipodal points cannot produce a NaN from floating-point drift.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Whether an observed fix is "at" the target location.
///
/// True iff the observed coordinate is within `threshold_m` of the target,
/// after widening the threshold by the fix's own accuracy radius.
pub fn is_within_range(observed: &LocationSample, target: Coordinate, threshold_m: f64) -> bool {
    distance_meters(observed.coordinate, target) <= threshold_m + observed.accuracy_m
}
