// Line protocol for motor-driver commands
//
// Frame format: "+sa <a> <b> <c> <d>\n"
// One signed decimal power value per channel, space separated.

use crate::messages::MotorCommand;

/// Opcode for "set all channels"
pub const OPCODE_SET_ALL: &str = "+sa";

/// Line terminator
pub const TERMINATOR: u8 = b'\n';

/// Longest line the framer will buffer before giving up on it
pub const MAX_LINE_LEN: usize = 64;

const CHANNEL_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Expected 4 channel values, found {found}")]
    WrongArity { found: usize },

    #[error("Unknown opcode {0:?}")]
    UnknownOpcode(String),

    #[error("Channel value {0:?} is not an integer")]
    NotAnInteger(String),

    #[error("Line is not valid UTF-8")]
    NotUtf8,

    #[error("Line exceeds {limit} bytes")]
    Overlong { limit: usize },
}

/// Encode a command as a single terminated line
pub fn encode(cmd: &MotorCommand) -> String {
    format!(
        "{} {} {} {} {}\n",
        OPCODE_SET_ALL, cmd.channel_a, cmd.channel_b, cmd.channel_c, cmd.channel_d
    )
}

/// Parse one line into a command
///
/// A trailing "\n" or "\r\n" is accepted. Values are not range-checked
/// here; the motor sink rejects out-of-range power.
pub fn parse(line: &str) -> Result<MotorCommand, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut tokens = line.split(' ');

    let opcode = tokens.next().unwrap_or_default();
    if opcode != OPCODE_SET_ALL {
        return Err(ParseError::UnknownOpcode(opcode.to_string()));
    }

    let values: Vec<&str> = tokens.collect();
    if values.len() != CHANNEL_COUNT {
        return Err(ParseError::WrongArity {
            found: values.len(),
        });
    }

    let mut parsed = [0i32; CHANNEL_COUNT];
    for (slot, token) in parsed.iter_mut().zip(&values) {
        *slot = token
            .parse()
            .map_err(|_| ParseError::NotAnInteger(token.to_string()))?;
    }

    let [a, b, c, d] = parsed;
    Ok(MotorCommand::new(a, b, c, d))
}

/// Accumulates bytes until a terminator, then parses the buffered line
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    overflowed: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
            overflowed: false,
        }
    }

    /// Process a single incoming byte. Returns a result only when a
    /// terminator completes a non-empty line.
    pub fn push(&mut self, byte: u8) -> Option<Result<MotorCommand, ParseError>> {
        if byte != TERMINATOR {
            if self.buffer.len() < MAX_LINE_LEN {
                self.buffer.push(byte);
            } else {
                self.overflowed = true;
            }
            return None;
        }

        let overflowed = std::mem::take(&mut self.overflowed);
        let line = std::mem::take(&mut self.buffer);

        if overflowed {
            return Some(Err(ParseError::Overlong {
                limit: MAX_LINE_LEN,
            }));
        }

        let line = match std::str::from_utf8(&line) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(_) => return Some(Err(ParseError::NotUtf8)),
        };

        // Blank lines are used for resync
        if line.is_empty() {
            return None;
        }

        Some(parse(line))
    }

    /// Feed a chunk of bytes, collecting every completed line
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Result<MotorCommand, ParseError>> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Bytes buffered for the line in progress
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
