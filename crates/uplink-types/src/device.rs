//! Device identity and kinds

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Locally assigned identifier for a communication device
///
/// Ids are handed out by the registry's counter and never reused, so they are
/// the only stable join key between local selections and backend records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// Get the raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vendor or class of a communication channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// Generic serial port radio (RFD-style modem)
    SerialPort,
    /// AIM XTRA flight computer
    AimXtra,
    /// Altus Metrum TeleDongle ground receiver
    TeleDongle,
    /// FeatherWeight GPS tracker ground station
    FeatherWeight,
    /// File-backed virtual device fed from a recording on disk
    File,
}

impl DeviceKind {
    /// All kinds, in display column order
    pub const ALL: [DeviceKind; 5] = [
        DeviceKind::SerialPort,
        DeviceKind::AimXtra,
        DeviceKind::TeleDongle,
        DeviceKind::FeatherWeight,
        DeviceKind::File,
    ];

    /// Returns the canonical display name
    pub fn name(&self) -> &'static str {
        match self {
            DeviceKind::SerialPort => "SerialPort",
            DeviceKind::AimXtra => "AimXtra",
            DeviceKind::TeleDongle => "TeleDongle",
            DeviceKind::FeatherWeight => "FeatherWeight",
            DeviceKind::File => "File",
        }
    }

    /// Whether the selection for this kind names a file rather than a port
    pub fn is_file_backed(&self) -> bool {
        matches!(self, DeviceKind::File)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when user text does not name a device kind
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown device kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for DeviceKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" | "serialport" | "rfd" => Ok(DeviceKind::SerialPort),
            "aim" | "aimxtra" => Ok(DeviceKind::AimXtra),
            "teledongle" | "altus" | "altusmetrum" => Ok(DeviceKind::TeleDongle),
            "featherweight" | "feather" => Ok(DeviceKind::FeatherWeight),
            "file" => Ok(DeviceKind::File),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// A device record as reported by the backend
///
/// The backend is the source of truth for which ids exist and of what kind.
/// It does not necessarily know the user's live selection text, so `port`
/// is only a hint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackendDevice {
    /// Device id
    pub id: DeviceId,
    /// Device kind
    pub kind: DeviceKind,
    /// Port or path the backend has bound, if it reports one
    pub port: Option<String>,
}

impl BackendDevice {
    /// Create a record without a bound port
    pub fn new(id: DeviceId, kind: DeviceKind) -> Self {
        Self {
            id,
            kind,
            port: None,
        }
    }
}
