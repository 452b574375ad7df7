//! Error types for the sending core

use thiserror::Error;
use uplink_types::{BackendError, DeviceId, DeviceKind};

use crate::controller::LoopPhase;
use crate::events::Notification;

/// Failures caught by the sending actor
///
/// None of these escape the actor: each is logged and turned into a
/// [`Notification`] for the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendingError {
    /// Backend rejected a new device
    #[error("failed to register {kind} device {id}: {source}")]
    Register {
        id: DeviceId,
        kind: DeviceKind,
        source: BackendError,
    },

    /// Backend rejected a file-backed device
    #[error("failed to register file device {id} for {path}: {source}")]
    RegisterFile {
        id: DeviceId,
        path: String,
        source: BackendError,
    },

    /// Backend rejected a port binding; the local selection is kept
    #[error("failed to bind device {id} to {selection:?}: {source}")]
    Bind {
        id: DeviceId,
        selection: String,
        source: BackendError,
    },

    /// Backend failed to forget a device; the local entry is removed anyway
    #[error("failed to remove device {id}: {source}")]
    Unregister { id: DeviceId, source: BackendError },

    /// Backend rejected the loop start
    #[error("failed to start sending loop: {0}")]
    Start(#[source] BackendError),

    /// Backend reported an error while stopping
    #[error("failed to stop sending loop: {0}")]
    Stop(#[source] BackendError),

    /// Every device id has been handed out
    #[error("no device ids left")]
    IdsExhausted,

    /// Request conflicts with the current loop phase
    #[error("sending loop is busy ({0})")]
    LoopBusy(LoopPhase),
}

impl SendingError {
    /// Short heading for the user-facing notification
    pub fn title(&self) -> &'static str {
        match self {
            SendingError::Register { .. } | SendingError::IdsExhausted => "Failed to add device",
            SendingError::RegisterFile { .. } => "Failed to add path",
            SendingError::Bind { .. } => "Failed to set the active serial port",
            SendingError::Unregister { .. } => "Failed to remove device",
            SendingError::Start(_) => "Failed to start simulation",
            SendingError::Stop(_) => "Failed to stop simulation",
            SendingError::LoopBusy(_) => "Sending loop is busy",
        }
    }

    /// Convert into the notification shown to the user
    ///
    /// The description is the underlying failure text.
    pub fn notification(&self) -> Notification {
        let description = match self {
            SendingError::Register { source, .. }
            | SendingError::RegisterFile { source, .. }
            | SendingError::Bind { source, .. }
            | SendingError::Unregister { source, .. }
            | SendingError::Start(source)
            | SendingError::Stop(source) => source.to_string(),
            SendingError::IdsExhausted => self.to_string(),
            SendingError::LoopBusy(phase) => {
                format!("the sending loop is {} and cannot accept this change", phase)
            }
        };
        Notification {
            title: self.title().to_string(),
            description,
        }
    }
}
