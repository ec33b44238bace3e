// Frame-writing actuator for the serial motor driver
//
// Channel values are staged by set_power and sent as one "+sa" line on
// commit. Writes are fire-and-forget: nothing is queued or retried.

use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use super::driver::Actuator;
use super::frame::{encode, TERMINATOR};
use crate::messages::{ChannelId, MotorCommand};

/// Write timeout for the serial port
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Actuator that serializes commands onto any byte sink
pub struct FrameWriter<W: Write> {
    out: W,
    pending: MotorCommand,
}

impl FrameWriter<Box<dyn SerialPort>> {
    /// Open a serial port to the motor driver
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        let mut writer = Self::new(port);
        writer.resync()?;
        Ok(writer)
    }
}

impl<W: Write> FrameWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending: MotorCommand::zero(),
        }
    }

    /// Terminate any partial line the driver may already have buffered
    pub fn resync(&mut self) -> std::io::Result<()> {
        self.out.write_all(&[TERMINATOR])?;
        self.out.flush()
    }

    /// Command staged for the next commit
    pub fn pending(&self) -> MotorCommand {
        self.pending
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn send(&mut self) -> std::io::Result<()> {
        let frame = encode(&self.pending);
        debug!("Sending frame: {}", frame.trim_end());
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> Actuator for FrameWriter<W> {
    fn set_power(&mut self, channel: ChannelId, power: i32) -> std::io::Result<()> {
        self.pending.set(channel, power);
        Ok(())
    }

    fn stop(&mut self) -> std::io::Result<()> {
        self.pending = MotorCommand::zero();
        self.send()
    }

    fn commit(&mut self) -> std::io::Result<()> {
        self.send()
    }
}
