// Input session controller
//
// Disconnected -> Bound -> Disconnected (device lost)
//                 Bound -> Stopped     (stop button, terminal)
//
// One call to tick() does one unit of work; the host loop owns pacing
// and honours the backoff returned while no device is bound.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{Config, RECONNECT_BACKOFF};
use crate::input::{Button, DeviceSource, InputDevice};
use crate::messages::PowerPair;
use crate::motor::{Actuator, Mixer, MotorSink, SinkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Bound,
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No device yet; wait this long before the next attempt
    Backoff(Duration),
    /// A device was just acquired
    Bound,
    /// Power was sent to the motors
    Driven(PowerPair),
    /// Power was computed but the transport rejected the frame
    Dropped(PowerPair),
    /// The device went away; motors were stopped
    Disconnected,
    /// Motors are stopped for good
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Motor contract violation: {0}")]
    Contract(SinkError),

    #[error("No controller after {attempts} attempts")]
    AcquireExhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub mixer: Mixer,
    pub stop_button: Button,
    pub backoff: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mixer: Mixer::default(),
            stop_button: Button::Home,
            backoff: RECONNECT_BACKOFF,
            max_attempts: None,
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            mixer: Mixer::new(config.axis_max, config.max_power),
            stop_button: config.stop_button,
            backoff: config.reconnect_backoff(),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

pub struct SessionController<S: DeviceSource, A: Actuator> {
    source: S,
    device: Option<S::Device>,
    sink: MotorSink<A>,
    settings: SessionSettings,
    state: SessionState,
    failed_attempts: u32,
}

impl<S: DeviceSource, A: Actuator> SessionController<S, A> {
    pub fn new(source: S, sink: MotorSink<A>, settings: SessionSettings) -> Self {
        Self {
            source,
            device: None,
            sink,
            settings,
            state: SessionState::Disconnected,
            failed_attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one tick of the state machine
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        match self.state {
            SessionState::Disconnected => self.try_acquire(),
            SessionState::Bound => self.drive_tick(),
            SessionState::Stopped => Ok(TickOutcome::Stopped),
        }
    }

    /// Stop the motors and enter the terminal state from outside the loop
    pub fn shutdown(&mut self) {
        if self.state != SessionState::Stopped {
            info!("Shutting down session");
            self.halt();
        }
    }

    fn try_acquire(&mut self) -> Result<TickOutcome, SessionError> {
        match self.source.acquire() {
            Ok(device) => {
                info!(
                    "Controller found: {}, press {:?} to stop",
                    device.name(),
                    self.settings.stop_button
                );
                self.failed_attempts = 0;
                self.device = Some(device);
                self.state = SessionState::Bound;
                Ok(TickOutcome::Bound)
            }
            Err(e) => {
                self.failed_attempts += 1;
                if self.failed_attempts == 1 {
                    info!("No controller found yet: {}", e);
                } else {
                    debug!("Acquire attempt {} failed: {}", self.failed_attempts, e);
                }

                if let Some(max) = self.settings.max_attempts {
                    if self.failed_attempts >= max {
                        return Err(SessionError::AcquireExhausted {
                            attempts: self.failed_attempts,
                        });
                    }
                }
                Ok(TickOutcome::Backoff(self.settings.backoff))
            }
        }
    }

    fn drive_tick(&mut self) -> Result<TickOutcome, SessionError> {
        let Some(device) = self.device.as_mut() else {
            self.state = SessionState::Disconnected;
            return Ok(TickOutcome::Disconnected);
        };

        let sample = device.sample();
        let presses = device.presses();
        let connected = device.is_connected();

        if !presses.is_empty() {
            debug!("Buttons pressed: {:?}", presses);
        }
        // A stop press wins over this tick's stick input
        if presses.contains(&self.settings.stop_button) {
            info!("Stop button pressed, stopping motors");
            self.halt();
            return Ok(TickOutcome::Stopped);
        }

        let mixer = self.settings.mixer;
        let power = mixer.mix(
            sample.yaw * mixer.axis_max(),
            sample.throttle * mixer.axis_max(),
        );

        let mut dropped = false;
        match self.sink.drive(power) {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                warn!("Dropping this tick's command: {}", e);
                dropped = true;
            }
            Err(e) => {
                error!("Mixer produced out-of-range power {:?}: {}", power, e);
                self.halt();
                return Err(SessionError::Contract(e));
            }
        }

        if !connected {
            warn!("Controller disconnected, stopping motors until it reconnects");
            self.stop_motors();
            self.release_device();
            self.state = SessionState::Disconnected;
            return Ok(TickOutcome::Disconnected);
        }

        Ok(if dropped {
            TickOutcome::Dropped(power)
        } else {
            TickOutcome::Driven(power)
        })
    }

    fn halt(&mut self) {
        self.stop_motors();
        self.release_device();
        self.state = SessionState::Stopped;
    }

    fn stop_motors(&mut self) {
        if let Err(e) = self.sink.stop() {
            warn!("Failed to stop motors: {}", e);
        }
    }

    fn release_device(&mut self) {
        if let Some(device) = self.device.take() {
            self.source.release(device);
        }
    }
}
