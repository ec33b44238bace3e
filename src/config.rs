// Defaults, runtime configuration and its JSON loader
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::input::Button;

// Power clamp ceiling accepted by the motor driver
pub const MAX_POWER: i32 = 100;

// Largest raw stick magnitude fed into the mixer
pub const AXIS_MAX: f32 = 125.0;

// Fraction of stick travel ignored around center / saturated near the edge
pub const DEAD_ZONE: f32 = 0.1;
pub const HOT_ZONE: f32 = 0.2;

// Wait between device acquire attempts
pub const RECONNECT_BACKOFF: Duration = Duration::from_millis(1000);

// Control loop frequency and the fastest rate accepted from config
pub const TICK_RATE_HZ: u32 = 20;
pub const MAX_TICK_RATE_HZ: u32 = 1000;

// Serial link to the motor driver
pub const SERIAL_PORT: &str = "/dev/ttyACM0";
pub const BAUD_RATE: u32 = 115_200;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration, every field optional in the JSON file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub max_power: i32,
    pub axis_max: f32,
    pub dead_zone: f32,
    pub hot_zone: f32,
    pub reconnect_backoff_ms: u64,
    /// `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
    pub tick_rate_hz: u32,
    pub stop_button: Button,
    pub port: String,
    pub baud_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_power: MAX_POWER,
            axis_max: AXIS_MAX,
            dead_zone: DEAD_ZONE,
            hot_zone: HOT_ZONE,
            reconnect_backoff_ms: RECONNECT_BACKOFF.as_millis() as u64,
            max_reconnect_attempts: None,
            tick_rate_hz: TICK_RATE_HZ,
            stop_button: Button::Home,
            port: SERIAL_PORT.to_string(),
            baud_rate: BAUD_RATE,
        }
    }
}

impl Config {
    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_power <= 0 {
            return Err(ConfigError::Invalid(format!(
                "maxPower must be positive, got {}",
                self.max_power
            )));
        }
        if self.axis_max.is_nan() || self.axis_max <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "axisMax must be positive, got {}",
                self.axis_max
            )));
        }
        if !(1..=MAX_TICK_RATE_HZ).contains(&self.tick_rate_hz) {
            return Err(ConfigError::Invalid(format!(
                "tickRateHz must be in 1..={}, got {}",
                MAX_TICK_RATE_HZ, self.tick_rate_hz
            )));
        }
        for (name, zone) in [("deadZone", self.dead_zone), ("hotZone", self.hot_zone)] {
            if !(0.0..1.0).contains(&zone) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in [0, 1), got {}",
                    name, zone
                )));
            }
        }
        if self.dead_zone + self.hot_zone >= 1.0 {
            return Err(ConfigError::Invalid(
                "deadZone + hotZone must leave some usable stick travel".into(),
            ));
        }
        Ok(())
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate_hz))
    }
}
