//! Event stream emitted by the sending actor
//!
//! Registry changes, loop progress and user-facing failures all flow through
//! one channel so front ends observe them in the order they happened.

use uplink_types::{DeviceId, LoopStatus};

use crate::controller::{LoopPhase, LoopSettings};
use crate::registry::{DeviceEntry, ReconcileSummary};

/// A failure description meant for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short heading, e.g. "Failed to start simulation"
    pub title: String,
    /// Failure text reported by the backend
    pub description: String,
}

/// Everything the sending actor reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendingEvent {
    // -------------------------------------------------------------------------
    // Registry events
    // -------------------------------------------------------------------------
    /// A device entry was created locally
    DeviceAdded {
        /// The new entry
        entry: DeviceEntry,
    },

    /// A device entry was deleted locally
    DeviceRemoved {
        /// Id of the removed entry
        id: DeviceId,
    },

    /// A selection was edited (emitted before the bind call resolves)
    SelectionChanged {
        /// Device id
        id: DeviceId,
        /// New selection text
        selection: String,
    },

    /// A backend device list changed which entries are linked
    DevicesReconciled(ReconcileSummary),

    /// Backend-reported port names changed
    AvailablePortsChanged {
        /// Port names offered as bind candidates
        ports: Vec<String>,
    },

    // -------------------------------------------------------------------------
    // Sending loop events
    // -------------------------------------------------------------------------
    /// The controller moved to a new phase
    LoopPhaseChanged {
        /// New phase
        phase: LoopPhase,
    },

    /// Backend pushed new loop counters
    LoopStateUpdated {
        /// Status as reported
        status: LoopStatus,
    },

    /// Backend pushed a new received-packet count
    ReceivedPacketsUpdated {
        /// Packets received and parsed
        count: u64,
    },

    /// Backend data indicator flipped
    DataIndicatorChanged {
        /// Whether data arrived recently
        got_data: bool,
    },

    /// Interval, baud, mode or target changed
    SettingsChanged {
        /// Settings now in effect
        settings: LoopSettings,
    },

    // -------------------------------------------------------------------------
    // Failures
    // -------------------------------------------------------------------------
    /// A backend call failed and the user should be told
    Notification(Notification),
}

impl SendingEvent {
    /// Check if this event changes the registry contents
    pub fn is_registry(&self) -> bool {
        matches!(
            self,
            SendingEvent::DeviceAdded { .. }
                | SendingEvent::DeviceRemoved { .. }
                | SendingEvent::SelectionChanged { .. }
                | SendingEvent::DevicesReconciled(_)
        )
    }

    /// Check if this event reports sending loop progress or state
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            SendingEvent::LoopPhaseChanged { .. }
                | SendingEvent::LoopStateUpdated { .. }
                | SendingEvent::ReceivedPacketsUpdated { .. }
                | SendingEvent::DataIndicatorChanged { .. }
        )
    }

    /// Get the device id if this event concerns a single device
    pub fn device_id(&self) -> Option<DeviceId> {
        match self {
            SendingEvent::DeviceAdded { entry } => Some(entry.id),
            SendingEvent::DeviceRemoved { id } | SendingEvent::SelectionChanged { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }
}
