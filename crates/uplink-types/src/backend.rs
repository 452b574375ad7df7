//! Seam between the sending core and a communication backend
//!
//! The core issues calls through [`Backend`] and receives pushed state as
//! [`BackendUpdate`] values on a channel. Nothing else about the backend's
//! port I/O or packet framing is assumed.

use std::future::Future;

use crate::device::{BackendDevice, DeviceId, DeviceKind};
use crate::error::BackendError;
use crate::sending::{LoopStatus, StartLoopRequest};

/// Calls the sending core issues to a communication backend
///
/// Every call resolves once the backend has accepted or rejected it. Calls
/// have no timeout and cannot be cancelled.
pub trait Backend: Send + Sync + 'static {
    /// Create a device record of `kind` under the id the registry allocated
    fn register_device(
        &self,
        id: DeviceId,
        kind: DeviceKind,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Create a file-backed virtual device reading from `path`
    fn register_file_device(
        &self,
        id: DeviceId,
        path: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Associate a physical or virtual channel with the device
    fn bind_port(
        &self,
        id: DeviceId,
        port: &str,
        baud_rate: u32,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Forget the device and release anything it holds
    fn unregister_device(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Begin (or resume) periodic packet emission
    fn start_loop(
        &self,
        request: StartLoopRequest,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Halt packet emission
    fn stop_loop(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// State pushed by the backend without being asked
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackendUpdate {
    /// Current set of devices the backend knows about
    DeviceList(Vec<BackendDevice>),
    /// Sending loop counters and running status
    LoopState(LoopStatus),
    /// Count of packets received and parsed, independent of the sent counter
    ReceivedPackets(u64),
    /// Whether data arrived recently
    DataIndicator(bool),
    /// Port names the backend can bind
    AvailablePorts(Vec<String>),
}

impl BackendUpdate {
    /// Check if this update carries loop counters or indicators
    pub fn is_loop_update(&self) -> bool {
        matches!(
            self,
            BackendUpdate::LoopState(_)
                | BackendUpdate::ReceivedPackets(_)
                | BackendUpdate::DataIndicator(_)
        )
    }
}
