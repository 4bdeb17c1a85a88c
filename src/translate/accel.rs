//! Dead zone + exponential acceleration for analog sticks.
//!
//! The raw axis value is turned into an exponent relative to the dead zone,
//! a fixed base is raised to it and the result is scaled by the signed value
//! and by the time the stick has been held there. Inside the dead zone the
//! exponent goes negative, so the output stays near zero; outside it the
//! output grows exponentially with deflection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Acceleration curve for one analog stick.
///
/// The default constants were tuned by hand against common gamepads with a
/// ±32767 axis range. Only their shape matters: dead zone, exponential growth,
/// time scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAccelerator {
    /// Growth factor per `divisor` units of deflection. Must be > 1.
    pub base: f64,
    /// Raw magnitude at which the exponent crosses zero.
    pub deadzone: i64,
    /// Raw units per exponent step.
    pub divisor: i64,
    /// Divides `value * elapsed_ns` down to output units.
    pub normalization: i64,
    /// Per-stick weight applied last.
    pub multiplier: i64,
}

impl AxisAccelerator {
    /// Movement stick → pointer motion.
    pub const fn pointer() -> Self {
        Self {
            base: 1.01,
            deadzone: 1 << 13,
            divisor: 1 << 9,
            normalization: 1 << 36,
            multiplier: 1,
        }
    }

    /// Scroll stick → high-resolution wheel. Twice the pointer weight.
    pub const fn scroll() -> Self {
        Self {
            multiplier: 2,
            ..Self::pointer()
        }
    }

    /// Output delta for raw axis `value` held for `elapsed`.
    pub fn delta(&self, value: i32, elapsed: Duration) -> i32 {
        let value = i64::from(value);
        let exponent = (value.abs() - self.deadzone) / self.divisor;
        let exponent = exponent.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

        let scaled = (self.base.powi(exponent) * value as f64) as i64;
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);

        let delta = scaled
            .saturating_mul(nanos)
            .checked_div(self.normalization)
            .unwrap_or(0)
            .saturating_mul(self.multiplier);

        delta.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Whether `value` lies outside the dead zone.
    pub fn is_displaced(&self, value: i32) -> bool {
        i64::from(value).abs() > self.deadzone
    }

    /// Checks that the curve can be evaluated.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base > 1.0 && self.base.is_finite()) {
            return Err(format!("base must be a finite number > 1, got {}", self.base));
        }
        if self.divisor <= 0 {
            return Err(format!("divisor must be positive, got {}", self.divisor));
        }
        if self.normalization <= 0 {
            return Err(format!(
                "normalization must be positive, got {}",
                self.normalization
            ));
        }
        if self.deadzone < 0 {
            return Err(format!("deadzone must not be negative, got {}", self.deadzone));
        }
        Ok(())
    }
}

impl Default for AxisAccelerator {
    fn default() -> Self {
        Self::pointer()
    }
}
