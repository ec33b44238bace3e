// Scripted fakes shared by the unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::input::{Button, DeviceSource, InputDevice, InputError};
use crate::messages::{AxisSample, ChannelId, MotorCommand};
use crate::motor::Actuator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCall {
    SetPower(ChannelId, i32),
    Commit,
    Stop,
}

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<ActuatorCall>,
    state: MotorCommand,
    fail_commits: bool,
}

/// Actuator that records every call; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn state(&self) -> MotorCommand {
        self.inner.borrow().state
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    pub fn fail_commits(&self, fail: bool) {
        self.inner.borrow_mut().fail_commits = fail;
    }
}

impl Actuator for RecordingActuator {
    fn set_power(&mut self, channel: ChannelId, power: i32) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(ActuatorCall::SetPower(channel, power));
        inner.state.set(channel, power);
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(ActuatorCall::Stop);
        inner.state = MotorCommand::zero();
        Ok(())
    }

    fn commit(&mut self) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(ActuatorCall::Commit);
        if inner.fail_commits {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down"));
        }
        Ok(())
    }
}

/// What a scripted device reports on one tick
#[derive(Debug, Clone, Default)]
pub struct DeviceTick {
    pub sample: AxisSample,
    pub presses: Vec<Button>,
    pub connected: bool,
}

impl DeviceTick {
    pub fn drive(yaw: f32, throttle: f32) -> Self {
        Self {
            sample: AxisSample::new(yaw, throttle),
            presses: Vec::new(),
            connected: true,
        }
    }

    pub fn press(mut self, button: Button) -> Self {
        self.presses.push(button);
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }
}

/// Device that replays a fixed list of ticks, then reports disconnected
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    ticks: VecDeque<DeviceTick>,
    current: DeviceTick,
}

impl ScriptedDevice {
    pub fn new(ticks: impl IntoIterator<Item = DeviceTick>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
            current: DeviceTick::default(),
        }
    }
}

impl InputDevice for ScriptedDevice {
    fn name(&self) -> &str {
        "scripted"
    }

    fn sample(&mut self) -> AxisSample {
        self.current = self.ticks.pop_front().unwrap_or_default();
        self.current.sample
    }

    fn presses(&mut self) -> Vec<Button> {
        std::mem::take(&mut self.current.presses)
    }

    fn is_connected(&self) -> bool {
        self.current.connected
    }
}

/// Source that fails a set number of times before handing out devices
#[derive(Debug, Default)]
pub struct ScriptedSource {
    failures_left: u32,
    devices: VecDeque<ScriptedDevice>,
    pub attempts: u32,
    pub released: u32,
}

impl ScriptedSource {
    pub fn new(failures: u32, devices: impl IntoIterator<Item = ScriptedDevice>) -> Self {
        Self {
            failures_left: failures,
            devices: devices.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl DeviceSource for ScriptedSource {
    type Device = ScriptedDevice;

    fn acquire(&mut self) -> Result<ScriptedDevice, InputError> {
        self.attempts += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(InputError::NoDevice);
        }
        self.devices.pop_front().ok_or(InputError::NoDevice)
    }

    fn release(&mut self, _device: ScriptedDevice) {
        self.released += 1;
    }
}
