//! RSSI to distance conversion using the log-distance path-loss model.
//!
//! `distance = 10 ^ ((tx_power_at_1m - rssi) / (10 * n))`

/// Estimate the distance in meters for an RSSI reading.
///
/// Returns `None` if any input is unknown or the result is not a number, and
/// `Some(f64::INFINITY)` when the path-loss exponent is exactly zero.
///
/// ```rust
/// use petfence_core::distance::estimate_distance;
///
/// let d = estimate_distance(Some(-65), Some(-59.0), Some(2.0)).unwrap();
/// assert!((d - 1.995).abs() < 0.001);
/// ```
#[must_use]
#[allow(clippy::float_cmp)]
pub fn estimate_distance(
    rssi: Option<i16>,
    tx_power_at_1m: Option<f64>,
    path_loss_exponent: Option<f64>,
) -> Option<f64> {
    let (rssi, tx_power, n) = (rssi?, tx_power_at_1m?, path_loss_exponent?);

    if n == 0.0 {
        return Some(f64::INFINITY);
    }

    let distance = 10_f64.powf((tx_power - f64::from(rssi)) / (10.0 * n));
    (!distance.is_nan()).then_some(distance)
}

/// Round a distance to centimeters for display.
#[must_use]
pub fn round_distance(distance: f64) -> f64 {
    if distance.is_finite() {
        (distance * 100.0).round() / 100.0
    } else {
        distance
    }
}

/// Where the collar is relative to the geofence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perimeter {
    /// Estimated distance is within the radius.
    Inside,
    /// Estimated distance exceeds the radius.
    Outside,
    /// No distance could be estimated.
    Unknown,
}

impl Perimeter {
    /// Classify a distance against the radius. The boundary counts as inside.
    #[must_use]
    pub fn classify(distance: Option<f64>, radius_m: f64) -> Self {
        match distance {
            Some(d) if d <= radius_m => Self::Inside,
            Some(_) => Self::Outside,
            None => Self::Unknown,
        }
    }

    /// Tri-state flag as published in the status record.
    #[must_use]
    pub const fn as_flag(self) -> Option<bool> {
        match self {
            Self::Inside => Some(true),
            Self::Outside => Some(false),
            Self::Unknown => None,
        }
    }
}
