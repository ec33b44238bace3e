// Motor control module for the differential-drive base
//
// Provides:
// - Yaw/throttle mixer (stick axes -> left/right power)
// - "+sa" line protocol codec and line framer
// - Range-checked motor power sink over an actuator
// - Serial frame-writing actuator

mod driver;
pub mod frame;
pub mod mixer;
pub mod serial;

pub use driver::{Actuator, LogActuator, MotorSink, SinkError};
pub use frame::{encode, parse, LineFramer, ParseError};
pub use mixer::{mix, Mixer};
pub use serial::FrameWriter;
