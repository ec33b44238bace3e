// Host loops around the session controller and the frame reader
//
// drive:   gamepad -> mixer -> "+sa" frames, paced at the configured tick rate
// monitor: "+sa" frames from a port -> validated motor commands

use std::io::{ErrorKind, Read};
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

// local imports
use crate::config::{Config, ConfigError};
use crate::input::{DeviceSource, GamepadSource};
use crate::motor::serial::DEFAULT_TIMEOUT_MS;
use crate::motor::{Actuator, FrameWriter, LineFramer, LogActuator, MotorSink, SinkError};
use crate::session::{SessionController, SessionError, SessionSettings, TickOutcome};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters reported when the monitor loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub applied: u64,
    pub malformed: u64,
    pub rejected: u64,
}

/// Bind a gamepad and drive the serial motor driver until stopped
pub async fn run_drive(config: &Config, dry_run: bool) -> Result<(), RuntimeError> {
    config.validate()?;
    let source = GamepadSource::new(config.dead_zone, config.hot_zone);
    let settings = SessionSettings::from(config);

    if dry_run {
        info!("Dry run: writing frames to stdout");
        let link = FrameWriter::new(std::io::stdout());
        let sink = MotorSink::with_max_power(link, config.max_power);
        drive(SessionController::new(source, sink, settings), config.tick_period()).await
    } else {
        info!(
            "Opening motor link on {} at {} baud",
            config.port, config.baud_rate
        );
        let link = FrameWriter::open(&config.port, config.baud_rate)?;
        let sink = MotorSink::with_max_power(link, config.max_power);
        drive(SessionController::new(source, sink, settings), config.tick_period()).await
    }
}

/// Tick the session at a fixed rate until it stops
///
/// Ticks never overlap. While no device is bound the loop sleeps for the
/// backoff the controller asks for. Ctrl-C takes the same stop path as
/// the stop button.
pub async fn drive<S, A>(
    mut session: SessionController<S, A>,
    tick_period: Duration,
) -> Result<(), RuntimeError>
where
    S: DeviceSource,
    A: Actuator,
{
    let mut tick = interval(tick_period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Control loop started: {}ms tick", tick_period.as_millis());

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping motors");
                session.shutdown();
                return Ok(());
            }
        }

        match session.tick() {
            Ok(TickOutcome::Backoff(delay)) => {
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = &mut ctrl_c => {
                        info!("Interrupted while waiting for a controller");
                        session.shutdown();
                        return Ok(());
                    }
                }
            }
            Ok(TickOutcome::Stopped) => {
                info!("Session stopped");
                return Ok(());
            }
            Ok(outcome) => debug!("Tick: {:?}", outcome),
            Err(e) => {
                session.shutdown();
                return Err(e.into());
            }
        }
    }
}

/// Read command frames from a serial port and log the validated commands
pub fn run_monitor(config: &Config) -> Result<MonitorStats, RuntimeError> {
    config.validate()?;
    info!("Monitoring {} at {} baud", config.port, config.baud_rate);
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .open()?;

    let mut sink = MotorSink::with_max_power(LogActuator::default(), config.max_power);
    monitor(port, &mut sink)
}

/// Apply every well-formed frame from `reader` to `sink` until EOF
///
/// Malformed and out-of-range frames are logged and discarded whole.
/// Read timeouts are expected on idle serial lines and are skipped.
pub fn monitor<R, A>(mut reader: R, sink: &mut MotorSink<A>) -> Result<MonitorStats, RuntimeError>
where
    R: Read,
    A: Actuator,
{
    let mut framer = LineFramer::new();
    let mut stats = MonitorStats::default();
    let mut buf = [0u8; 256];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => return Err(e.into()),
        };

        for result in framer.extend(&buf[..n]) {
            let cmd = match result {
                Ok(cmd) => cmd,
                Err(e) => {
                    warn!("Discarding malformed frame: {}", e);
                    stats.malformed += 1;
                    continue;
                }
            };

            match sink.apply_command(&cmd) {
                Ok(()) => stats.applied += 1,
                Err(e @ SinkError::OutOfRange { .. }) => {
                    warn!("Rejecting frame {:?}: {}", cmd.as_array(), e);
                    stats.rejected += 1;
                }
                Err(e) => warn!("Failed to apply frame: {}", e),
            }
        }
    }

    if framer.pending() > 0 {
        debug!("Discarding {} bytes of unterminated input", framer.pending());
    }
    info!(
        "Monitor finished: {} applied, {} malformed, {} rejected",
        stats.applied, stats.malformed, stats.rejected
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Button;
    use crate::messages::MotorCommand;
    use crate::testing::{
        ActuatorCall, DeviceTick, RecordingActuator, ScriptedDevice, ScriptedSource,
    };
    use std::io::Cursor;

    #[test]
    fn test_monitor_applies_good_frames_only() {
        let actuator = RecordingActuator::new();
        let mut sink = MotorSink::new(actuator.clone());
        let input = Cursor::new(
            concat!(
                "\n+sa 10 10 -5 -5\n",
                "+sa 1 2 3\n",
                "+sa 1 2 3 x\n",
                "+sa 0 0 0 101\n",
                "+sa 1 1 1 1\n",
                "+sa 9",
            )
            .as_bytes()
            .to_vec(),
        );

        let stats = monitor(input, &mut sink).unwrap();
        assert_eq!(
            stats,
            MonitorStats {
                applied: 2,
                malformed: 2,
                rejected: 1,
            }
        );
        // The unterminated trailing line never reaches the actuator
        assert_eq!(actuator.state(), MotorCommand::new(1, 1, 1, 1));
        let commits = actuator
            .calls()
            .iter()
            .filter(|c| **c == ActuatorCall::Commit)
            .count();
        assert_eq!(commits, 2);
    }

    struct Flaky {
        chunks: Vec<std::io::Result<Vec<u8>>>,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0)?;
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_monitor_skips_timeouts_and_joins_split_frames() {
        let actuator = RecordingActuator::new();
        let mut sink = MotorSink::new(actuator.clone());
        let reader = Flaky {
            chunks: vec![
                Ok(b"+sa 10 ".to_vec()),
                Err(std::io::Error::from(ErrorKind::TimedOut)),
                Ok(b"20 -30 40\n".to_vec()),
            ],
        };

        let stats = monitor(reader, &mut sink).unwrap();
        assert_eq!(stats.applied, 1);
        assert_eq!(actuator.state(), MotorCommand::new(10, 20, -30, 40));
    }

    #[test]
    fn test_monitor_propagates_hard_read_errors() {
        let mut sink = MotorSink::new(RecordingActuator::new());
        let reader = Flaky {
            chunks: vec![Err(std::io::Error::from(ErrorKind::BrokenPipe))],
        };
        assert!(matches!(
            monitor(reader, &mut sink),
            Err(RuntimeError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_drive_runs_until_stop_button() {
        let actuator = RecordingActuator::new();
        let device = ScriptedDevice::new([
            DeviceTick::drive(0.0, 0.5),
            DeviceTick::drive(0.0, 0.5).press(Button::Home),
        ]);
        let settings = SessionSettings {
            backoff: Duration::from_millis(5),
            ..SessionSettings::default()
        };
        let session = SessionController::new(
            ScriptedSource::new(2, [device]),
            MotorSink::new(actuator.clone()),
            settings,
        );

        drive(session, Duration::from_millis(1)).await.unwrap();

        // Only the first bound tick drives; the stop tick goes straight to Stop
        let calls = actuator.calls();
        assert_eq!(calls.iter().filter(|c| **c == ActuatorCall::Commit).count(), 1);
        let commit = calls.iter().position(|c| *c == ActuatorCall::Commit).unwrap();
        assert_eq!(calls[commit + 1], ActuatorCall::Stop);
        assert_eq!(actuator.state(), MotorCommand::zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_waits_backoff_between_failed_acquires() {
        let backoff = Duration::from_millis(1000);
        let tick_period = Duration::from_millis(50);
        let actuator = RecordingActuator::new();
        let device = ScriptedDevice::new([DeviceTick::drive(0.0, 0.0).press(Button::Home)]);
        let settings = SessionSettings {
            backoff,
            ..SessionSettings::default()
        };
        let session = SessionController::new(
            ScriptedSource::new(3, [device]),
            MotorSink::new(actuator.clone()),
            settings,
        );

        let started = tokio::time::Instant::now();
        drive(session, tick_period).await.unwrap();
        let elapsed = started.elapsed();

        // Three failed acquires, each followed by a full backoff, then bind and stop
        assert!(elapsed >= backoff * 3, "bound too early: {:?}", elapsed);
        assert!(elapsed < backoff * 3 + tick_period * 4, "waited too long: {:?}", elapsed);
        assert_eq!(actuator.calls().first(), Some(&ActuatorCall::Stop));
    }

    #[tokio::test]
    async fn test_drive_surfaces_exhausted_reconnects() {
        let actuator = RecordingActuator::new();
        let settings = SessionSettings {
            backoff: Duration::from_millis(1),
            max_attempts: Some(3),
            ..SessionSettings::default()
        };
        let session = SessionController::new(
            ScriptedSource::new(u32::MAX, []),
            MotorSink::new(actuator.clone()),
            settings,
        );

        let err = drive(session, Duration::from_millis(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Session(SessionError::AcquireExhausted { attempts: 3 })
        ));
        assert!(actuator.calls().contains(&ActuatorCall::Stop));
    }
}
