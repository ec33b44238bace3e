// Data types passed between the input, mixer and motor stages

/// One tick's worth of stick input, normalized to [-1.0, 1.0]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSample {
    pub yaw: f32,
    pub throttle: f32,
}

impl AxisSample {
    pub fn new(yaw: f32, throttle: f32) -> Self {
        Self { yaw, throttle }
    }
}

/// Mixer output for the two logical motors, each in [-max_power, max_power]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerPair {
    pub left: i32,
    pub right: i32,
}

impl PowerPair {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }
}

/// Physical motor-driver output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    A,
    B,
    C,
    D,
}

impl ChannelId {
    pub const ALL: [ChannelId; 4] = [ChannelId::A, ChannelId::B, ChannelId::C, ChannelId::D];

    /// Channels A and B drive the right side, C and D the left side
    pub fn is_left(self) -> bool {
        matches!(self, ChannelId::C | ChannelId::D)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChannelId::A => "A",
            ChannelId::B => "B",
            ChannelId::C => "C",
            ChannelId::D => "D",
        };
        f.write_str(name)
    }
}

/// One signed power value per physical channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorCommand {
    pub channel_a: i32,
    pub channel_b: i32,
    pub channel_c: i32,
    pub channel_d: i32,
}

impl MotorCommand {
    pub fn new(channel_a: i32, channel_b: i32, channel_c: i32, channel_d: i32) -> Self {
        Self {
            channel_a,
            channel_b,
            channel_c,
            channel_d,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: ChannelId) -> i32 {
        match channel {
            ChannelId::A => self.channel_a,
            ChannelId::B => self.channel_b,
            ChannelId::C => self.channel_c,
            ChannelId::D => self.channel_d,
        }
    }

    pub fn set(&mut self, channel: ChannelId, power: i32) {
        match channel {
            ChannelId::A => self.channel_a = power,
            ChannelId::B => self.channel_b = power,
            ChannelId::C => self.channel_c = power,
            ChannelId::D => self.channel_d = power,
        }
    }

    /// Returns values as array [a, b, c, d]
    pub fn as_array(&self) -> [i32; 4] {
        [self.channel_a, self.channel_b, self.channel_c, self.channel_d]
    }
}

// Right wheels take the right output as-is; left wheels are wired inverted
impl From<PowerPair> for MotorCommand {
    fn from(pair: PowerPair) -> Self {
        let mut cmd = Self::zero();
        for channel in ChannelId::ALL {
            let power = if channel.is_left() { -pair.left } else { pair.right };
            cmd.set(channel, power);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_side_inverted() {
        let cmd = MotorCommand::from(PowerPair::new(40, 25));
        assert_eq!(cmd.as_array(), [25, 25, -40, -40]);
    }

    #[test]
    fn test_channel_accessors() {
        let mut cmd = MotorCommand::zero();
        for (i, ch) in ChannelId::ALL.into_iter().enumerate() {
            cmd.set(ch, i as i32 + 1);
        }
        assert_eq!(cmd.as_array(), [1, 2, 3, 4]);
        assert_eq!(cmd.get(ChannelId::C), 3);
        assert!(ChannelId::D.is_left());
        assert!(!ChannelId::A.is_left());
    }
}
