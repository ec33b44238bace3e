// Differential (yaw/throttle) mixer for a skid-steer base
// Converts stick axis values into bounded left/right motor powers.

use crate::config::{AXIS_MAX, MAX_POWER};
use crate::messages::PowerPair;

/// Mixer parameters: raw axis ceiling and output power ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixer {
    axis_max: f32,
    max_power: i32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(AXIS_MAX, MAX_POWER)
    }
}

impl Mixer {
    pub fn new(axis_max: f32, max_power: i32) -> Self {
        Self {
            axis_max,
            max_power,
        }
    }

    pub fn axis_max(&self) -> f32 {
        self.axis_max
    }

    pub fn max_power(&self) -> i32 {
        self.max_power
    }

    /// Mix yaw and throttle (both in raw axis units) into left/right power
    ///
    /// # Arguments
    /// * `yaw` - Rotation input (positive = turn right)
    /// * `throttle` - Forward input (positive = forward)
    ///
    /// Outputs are only ever attenuated, never amplified: when either side
    /// would exceed the axis range both sides are scaled down together so
    /// the turn ratio is preserved.
    pub fn mix(&self, yaw: f32, throttle: f32) -> PowerPair {
        let yaw = finite_or_zero(yaw);
        let throttle = finite_or_zero(throttle);

        let left = throttle + yaw;
        let right = throttle - yaw;

        let scale_left = left.abs() / self.axis_max;
        let scale_right = right.abs() / self.axis_max;
        let scale = 1.0f32.max(scale_left).max(scale_right);

        let out_left = (left / scale).clamp(-self.axis_max, self.axis_max);
        let out_right = (right / scale).clamp(-self.axis_max, self.axis_max);

        PowerPair {
            left: self.to_power(out_left),
            right: self.to_power(out_right),
        }
    }

    /// Rescale from axis range to power range
    fn to_power(&self, value: f32) -> i32 {
        let power = (value / self.axis_max * self.max_power as f32).round() as i32;
        power.clamp(-self.max_power, self.max_power)
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Mix with the default axis and power ceilings
pub fn mix(yaw: f32, throttle: f32) -> PowerPair {
    Mixer::default().mix(yaw, throttle)
}
