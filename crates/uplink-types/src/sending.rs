//! Sending loop parameters and backend-reported loop state

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::device::DeviceId;

/// Default delay between emitted packets
pub const DEFAULT_INTERVAL_MS: u64 = 500;

/// Default baud rate used when binding serial devices
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Baud rates offered as suggestions (any non-zero value is accepted)
pub const COMMON_BAUD_RATES: &[u32] = &[
    4800, 9600, 19200, 38400, 57600, 115_200, 230_400, 460_800, 921_600,
];

/// Source of the packets the sending loop emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SendingMode {
    /// Replay rows from the loaded CSV flight recording
    #[default]
    FromCsv,
    /// Emit a synthetic, incrementing test pattern
    TestPattern,
}

impl SendingMode {
    /// All modes, in selector order
    pub const ALL: [SendingMode; 2] = [SendingMode::FromCsv, SendingMode::TestPattern];

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::FromCsv => "FromCSV",
            Self::TestPattern => "TestPattern",
        }
    }

    /// Get description
    pub fn description(&self) -> &'static str {
        match self {
            Self::FromCsv => "Replay packets from a recorded CSV file",
            Self::TestPattern => "Send generated packets with an incrementing counter",
        }
    }
}

impl fmt::Display for SendingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when user text does not name a sending mode
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown sending mode: {0}")]
pub struct ParseModeError(pub String);

impl FromStr for SendingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fromcsv" | "csv" => Ok(SendingMode::FromCsv),
            "testpattern" | "test" | "pattern" => Ok(SendingMode::TestPattern),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Sending loop state pushed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopStatus {
    /// Packets emitted so far, including any resumed count
    pub packets_sent: u64,
    /// Whether the backend loop is currently emitting
    pub running: bool,
}

/// Arguments for starting (or resuming) the backend sending loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StartLoopRequest {
    /// Delay between packets in milliseconds
    pub interval_ms: u64,
    /// Packet count to continue from
    pub resume_count: u64,
    /// Packet source
    pub mode: SendingMode,
    /// Device used for output
    pub target: DeviceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("csv".parse::<SendingMode>(), Ok(SendingMode::FromCsv));
        assert_eq!("FromCSV".parse::<SendingMode>(), Ok(SendingMode::FromCsv));
        assert_eq!("test".parse::<SendingMode>(), Ok(SendingMode::TestPattern));
        assert!("burst".parse::<SendingMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SendingMode::default(), SendingMode::FromCsv);
        assert!(COMMON_BAUD_RATES.contains(&DEFAULT_BAUD_RATE));
        assert_eq!(LoopStatus::default().packets_sent, 0);
    }
}
