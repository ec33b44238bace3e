// Input device capability contract
//
// Provides:
// - Device source / device traits the session controller drives
// - Button identifiers used for the stop signal
// - Dead/hot-zone shaping for normalized stick values
// - A gilrs-backed gamepad implementation

pub mod gamepad;

use serde::Deserialize;

use crate::messages::AxisSample;

pub use gamepad::{GamepadDevice, GamepadSource};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("No controller connected")]
    NoDevice,

    #[error("Input backend error: {0}")]
    Backend(String),
}

/// Buttons the runtime can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// PS / Xbox / guide button
    Home,
    Start,
    Select,
    South,
    East,
    North,
    West,
}

/// A bound input device, polled once per tick
pub trait InputDevice {
    fn name(&self) -> &str;

    /// Current stick position, yaw and throttle in [-1.0, 1.0]
    fn sample(&mut self) -> AxisSample;

    /// Buttons pressed since the previous call
    fn presses(&mut self) -> Vec<Button>;

    fn is_connected(&self) -> bool;
}

/// Hands out devices; fails with `NoDevice` when nothing is plugged in
pub trait DeviceSource {
    type Device: InputDevice;

    fn acquire(&mut self) -> Result<Self::Device, InputError>;

    /// Take a device back once the session is done with it
    fn release(&mut self, device: Self::Device) {
        drop(device);
    }
}

/// Apply dead and hot zones to a normalized axis value
///
/// Travel inside `dead_zone` of center reads as 0, travel within
/// `hot_zone` of either end reads as full scale, and the rest is
/// stretched linearly to keep the response continuous.
pub fn shape_axis(value: f32, dead_zone: f32, hot_zone: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let magnitude = value.abs().min(1.0);
    if magnitude <= dead_zone {
        return 0.0;
    }
    if magnitude >= 1.0 - hot_zone {
        return value.signum();
    }
    let live = 1.0 - dead_zone - hot_zone;
    value.signum() * (magnitude - dead_zone) / live
}
