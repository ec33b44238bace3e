// Gamepad binding via gilrs
//
// Left stick X drives yaw, left stick Y drives throttle (up = forward).

use gilrs::{Axis, Event, EventType, GamepadId, Gilrs};
use tracing::debug;

use super::{shape_axis, Button, DeviceSource, InputDevice, InputError};
use crate::config::{DEAD_ZONE, HOT_ZONE};
use crate::messages::AxisSample;

/// Binds to the first connected gamepad
pub struct GamepadSource {
    gilrs: Option<Gilrs>,
    dead_zone: f32,
    hot_zone: f32,
}

impl Default for GamepadSource {
    fn default() -> Self {
        Self::new(DEAD_ZONE, HOT_ZONE)
    }
}

impl GamepadSource {
    pub fn new(dead_zone: f32, hot_zone: f32) -> Self {
        Self {
            gilrs: None,
            dead_zone,
            hot_zone,
        }
    }
}

impl DeviceSource for GamepadSource {
    type Device = GamepadDevice;

    fn acquire(&mut self) -> Result<GamepadDevice, InputError> {
        let mut gilrs = match self.gilrs.take() {
            Some(gilrs) => gilrs,
            None => Gilrs::new().map_err(|e| InputError::Backend(e.to_string()))?,
        };

        // Let gilrs pick up hotplug events before looking for a pad
        while gilrs.next_event().is_some() {}

        let found = gilrs
            .gamepads()
            .next()
            .map(|(id, pad)| (id, pad.name().to_string()));

        match found {
            Some((id, name)) => {
                debug!("Binding gamepad {} ({:?})", name, id);
                Ok(GamepadDevice {
                    gilrs,
                    id,
                    name,
                    presses: Vec::new(),
                    connected: true,
                    dead_zone: self.dead_zone,
                    hot_zone: self.hot_zone,
                })
            }
            None => {
                self.gilrs = Some(gilrs);
                Err(InputError::NoDevice)
            }
        }
    }

    fn release(&mut self, device: GamepadDevice) {
        self.gilrs = Some(device.gilrs);
    }
}

/// A bound gamepad; owns the gilrs context while bound
pub struct GamepadDevice {
    gilrs: Gilrs,
    id: GamepadId,
    name: String,
    presses: Vec<Button>,
    connected: bool,
    dead_zone: f32,
    hot_zone: f32,
}

impl GamepadDevice {
    fn pump_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if id != self.id {
                continue;
            }
            match event {
                EventType::ButtonPressed(button, _) => {
                    if let Some(button) = map_button(button) {
                        self.presses.push(button);
                    }
                }
                EventType::Disconnected => self.connected = false,
                EventType::Connected => self.connected = true,
                _ => {}
            }
        }
    }
}

impl InputDevice for GamepadDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&mut self) -> AxisSample {
        self.pump_events();

        let Some(pad) = self.gilrs.connected_gamepad(self.id) else {
            self.connected = false;
            return AxisSample::default();
        };

        AxisSample {
            yaw: shape_axis(pad.value(Axis::LeftStickX), self.dead_zone, self.hot_zone),
            throttle: shape_axis(pad.value(Axis::LeftStickY), self.dead_zone, self.hot_zone),
        }
    }

    fn presses(&mut self) -> Vec<Button> {
        std::mem::take(&mut self.presses)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn map_button(button: gilrs::Button) -> Option<Button> {
    match button {
        gilrs::Button::Mode => Some(Button::Home),
        gilrs::Button::Start => Some(Button::Start),
        gilrs::Button::Select => Some(Button::Select),
        gilrs::Button::South => Some(Button::South),
        gilrs::Button::East => Some(Button::East),
        gilrs::Button::North => Some(Button::North),
        gilrs::Button::West => Some(Button::West),
        _ => None,
    }
}
