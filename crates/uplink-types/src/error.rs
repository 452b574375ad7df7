//! Error types reported by backends

use thiserror::Error;

use crate::device::DeviceId;

/// Errors a backend can return for a device or loop call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No device with this id is registered
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    /// A device with this id is already registered
    #[error("device {0} already exists")]
    DeviceExists(DeviceId),

    /// Device has no port or file bound yet
    #[error("device {0} has no port or file bound")]
    DeviceNotBound(DeviceId),

    /// Port is already bound to another device
    #[error("port {port} is already in use by device {owner}")]
    PortInUse { port: String, owner: DeviceId },

    /// Selection text cannot be bound
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// Baud rate cannot be used
    #[error("invalid baud rate: {0}")]
    InvalidBaudRate(u32),

    /// Start requested while the loop is already emitting
    #[error("sending loop is already running")]
    LoopAlreadyRunning,

    /// Stop requested while the loop is idle
    #[error("sending loop is not running")]
    LoopNotRunning,

    /// Backend is gone or stopped answering requests
    #[error("backend unavailable: {0}")]
    Disconnected(String),

    /// Any other backend failure
    #[error("{0}")]
    Other(String),
}
