// Motor power sink for the differential base
//
// Validates per-channel power against the configured ceiling and
// forwards it to whatever actuator backs the channels.

use tracing::{debug, info, warn};

use crate::config::MAX_POWER;
use crate::messages::{ChannelId, MotorCommand, PowerPair};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Power {power} on channel {channel} exceeds limit of {max}")]
    OutOfRange {
        channel: ChannelId,
        power: i32,
        max: i32,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl SinkError {
    /// Transport failures only cost the current tick
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transport(_))
    }
}

/// Motor driver capability: per-channel power plus an all-stop
pub trait Actuator {
    fn set_power(&mut self, channel: ChannelId, power: i32) -> std::io::Result<()>;

    fn stop(&mut self) -> std::io::Result<()>;

    /// Push the channel values set since the last commit to the hardware
    fn commit(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Actuator that only logs what it is told to do
#[derive(Debug, Default)]
pub struct LogActuator {
    state: MotorCommand,
}

impl Actuator for LogActuator {
    fn set_power(&mut self, channel: ChannelId, power: i32) -> std::io::Result<()> {
        self.state.set(channel, power);
        Ok(())
    }

    fn stop(&mut self) -> std::io::Result<()> {
        self.state = MotorCommand::zero();
        info!("All channels stopped");
        Ok(())
    }

    fn commit(&mut self) -> std::io::Result<()> {
        info!("Channels: {:?}", self.state.as_array());
        Ok(())
    }
}

/// Range-checked front end for an actuator
pub struct MotorSink<A: Actuator> {
    actuator: A,
    max_power: i32,
}

impl<A: Actuator> MotorSink<A> {
    pub fn new(actuator: A) -> Self {
        Self::with_max_power(actuator, MAX_POWER)
    }

    pub fn with_max_power(actuator: A, max_power: i32) -> Self {
        Self {
            actuator,
            max_power,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn check(&self, channel: ChannelId, power: i32) -> Result<(), SinkError> {
        if power.unsigned_abs() > self.max_power.unsigned_abs() {
            return Err(SinkError::OutOfRange {
                channel,
                power,
                max: self.max_power,
            });
        }
        Ok(())
    }

    /// Set one channel. Out-of-range power is rejected, never clamped.
    pub fn apply(&mut self, channel: ChannelId, power: i32) -> Result<(), SinkError> {
        self.check(channel, power)?;
        self.actuator.set_power(channel, power)?;
        Ok(())
    }

    /// Set all four channels, or none of them if any value is out of range
    pub fn apply_command(&mut self, cmd: &MotorCommand) -> Result<(), SinkError> {
        for channel in ChannelId::ALL {
            self.check(channel, cmd.get(channel))?;
        }

        debug!("Applying channels {:?}", cmd.as_array());
        for channel in ChannelId::ALL {
            self.actuator.set_power(channel, cmd.get(channel))?;
        }
        self.actuator.commit()?;
        Ok(())
    }

    /// Drive both logical motors from a mixer output
    ///
    /// Right channels (A, B) take `right`, left channels (C, D) take
    /// `-left` to match the chassis wiring.
    pub fn drive(&mut self, power: PowerPair) -> Result<(), SinkError> {
        self.apply_command(&MotorCommand::from(power))
    }

    /// Stop every channel. Safe to call repeatedly.
    pub fn stop(&mut self) -> Result<(), SinkError> {
        self.actuator.stop()?;
        Ok(())
    }
}

impl<A: Actuator> Drop for MotorSink<A> {
    fn drop(&mut self) {
        // Leave the base stopped whatever path got us here
        if let Err(e) = self.actuator.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
