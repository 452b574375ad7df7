//! Sending-loop controller
//!
//! Tracks the local view of the backend sending loop and builds the requests
//! used to start or resume it. The controller itself never calls the backend;
//! the actor drives the begin/finish pairs around each awaited call.
//!
//! The central rule: a restart resumes from the last packet count the backend
//! reported. The controller only ever reads `packets_sent` from the backend and
//! feeds it back; it never resets it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uplink_types::{
    parse_target_device, BackendError, DeviceId, LoopStatus, SendingMode, StartLoopRequest,
    DEFAULT_BAUD_RATE, DEFAULT_INTERVAL_MS,
};

use crate::error::SendingError;

/// Lifecycle of the sending loop as seen locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    /// Idle
    #[default]
    Stopped,
    /// Start requested, waiting for the backend to confirm
    Starting,
    /// Backend confirmed the loop is emitting
    Running,
    /// Stop requested, waiting for the backend call to resolve
    Stopping,
}

impl LoopPhase {
    /// The "simulating" flag: true from a start request until stop resolves
    pub fn is_simulating(&self) -> bool {
        !matches!(self, LoopPhase::Stopped)
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            LoopPhase::Stopped => "stopped",
            LoopPhase::Starting => "starting",
            LoopPhase::Running => "running",
            LoopPhase::Stopping => "stopping",
        }
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// User-configured loop parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Delay between packets in milliseconds
    pub interval_ms: u64,
    /// Baud rate used when binding devices
    pub baud_rate: u32,
    /// Packet source
    pub mode: SendingMode,
    /// Raw selector naming the output device; parsed when the loop starts
    pub target: Option<String>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            baud_rate: DEFAULT_BAUD_RATE,
            mode: SendingMode::default(),
            target: None,
        }
    }
}

/// Point-in-time view of the controller for front ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSnapshot {
    /// Current phase
    pub phase: LoopPhase,
    /// Last packet count the backend reported, if any
    pub packets_sent: Option<u64>,
    /// Received-packet counter from the backend
    pub received_packets: u64,
    /// Backend data indicator
    pub got_data: bool,
    /// Settings in effect
    pub settings: LoopSettings,
}

impl LoopSnapshot {
    /// The "simulating" flag
    pub fn running(&self) -> bool {
        self.phase.is_simulating()
    }
}

/// Local state machine for the backend sending loop
#[derive(Debug, Default)]
pub struct SendingController {
    settings: LoopSettings,
    phase: LoopPhase,
    last_status: Option<LoopStatus>,
    received_packets: u64,
    got_data: bool,
}

impl SendingController {
    /// Create a stopped controller with the given settings
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Settings in effect
    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Current phase
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// The "simulating" flag
    pub fn is_simulating(&self) -> bool {
        self.phase.is_simulating()
    }

    /// Last packet count pushed by the backend
    pub fn packets_sent(&self) -> Option<u64> {
        self.last_status.map(|s| s.packets_sent)
    }

    /// Count the next start will resume from (0 if nothing was observed)
    pub fn resume_count(&self) -> u64 {
        self.packets_sent().unwrap_or(0)
    }

    /// Output device parsed from the target selector
    pub fn target_device(&self) -> DeviceId {
        parse_target_device(self.settings.target.as_deref())
    }

    /// Enter Starting and build the request to send to the backend
    pub fn begin_start(&mut self) -> Result<StartLoopRequest, SendingError> {
        if self.phase != LoopPhase::Stopped {
            return Err(SendingError::LoopBusy(self.phase));
        }

        let request = StartLoopRequest {
            interval_ms: self.settings.interval_ms,
            resume_count: self.resume_count(),
            mode: self.settings.mode,
            target: self.target_device(),
        };
        self.phase = LoopPhase::Starting;
        debug!("Starting sending loop with {:?}", request);
        Ok(request)
    }

    /// Apply the outcome of the backend start call
    ///
    /// On failure the phase returns to Stopped and `packets_sent` is left as is.
    pub fn finish_start(&mut self, result: Result<(), BackendError>) -> Result<(), SendingError> {
        match result {
            Ok(()) => {
                self.phase = LoopPhase::Running;
                info!("Sending loop running");
                Ok(())
            }
            Err(e) => {
                self.phase = LoopPhase::Stopped;
                Err(SendingError::Start(e))
            }
        }
    }

    /// Enter Stopping before the backend stop call is issued
    pub fn begin_stop(&mut self) {
        debug!(
            "Stopping sending loop (target {} was informational only)",
            self.target_device()
        );
        self.phase = LoopPhase::Stopping;
    }

    /// The stop call resolved; stop is always effective locally
    pub fn finish_stop(&mut self) {
        self.phase = LoopPhase::Stopped;
        info!("Sending loop stopped");
    }

    /// Set the interval in milliseconds
    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.settings.interval_ms = interval_ms;
    }

    /// Set the baud rate used for binds
    pub fn set_baud_rate(&mut self, baud_rate: u32) {
        self.settings.baud_rate = baud_rate;
    }

    /// Set the packet source
    pub fn set_mode(&mut self, mode: SendingMode) {
        self.settings.mode = mode;
    }

    /// Set the output device selector; refused while simulating
    pub fn set_target(&mut self, target: Option<String>) -> Result<(), SendingError> {
        if self.is_simulating() {
            return Err(SendingError::LoopBusy(self.phase));
        }
        self.settings.target = target.filter(|t| !t.trim().is_empty());
        Ok(())
    }

    /// Store a loop status pushed by the backend
    ///
    /// The backend is authoritative for its counters, so the status replaces
    /// the previous one wholesale. The phase is left to start/stop.
    pub fn apply_loop_status(&mut self, status: LoopStatus) -> bool {
        let changed = self.last_status != Some(status);
        self.last_status = Some(status);
        changed
    }

    /// Store a received-packet count pushed by the backend
    pub fn apply_received_packets(&mut self, count: u64) -> bool {
        let changed = self.received_packets != count;
        self.received_packets = count;
        changed
    }

    /// Store the backend data indicator
    pub fn apply_data_indicator(&mut self, got_data: bool) -> bool {
        let changed = self.got_data != got_data;
        self.got_data = got_data;
        changed
    }

    /// Snapshot for front ends
    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            phase: self.phase,
            packets_sent: self.packets_sent(),
            received_packets: self.received_packets,
            got_data: self.got_data,
            settings: self.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(packets_sent: u64, running: bool) -> LoopStatus {
        LoopStatus {
            packets_sent,
            running,
        }
    }

    #[test]
    fn test_initial_state() {
        let controller = SendingController::default();
        assert_eq!(controller.phase(), LoopPhase::Stopped);
        assert!(!controller.is_simulating());
        assert_eq!(controller.packets_sent(), None);
        assert_eq!(controller.settings().interval_ms, 500);
        assert_eq!(controller.settings().baud_rate, 115_200);
    }

    #[test]
    fn test_start_without_observed_state_resumes_from_zero() {
        let mut controller = SendingController::default();
        let request = controller.begin_start().unwrap();

        assert_eq!(request.resume_count, 0);
        assert_eq!(request.interval_ms, 500);
        assert_eq!(request.target, DeviceId(0));
        assert_eq!(controller.phase(), LoopPhase::Starting);
        assert!(controller.is_simulating());
    }

    #[test]
    fn test_restart_resumes_from_reported_count() {
        let mut controller = SendingController::default();
        controller.begin_start().unwrap();
        controller.finish_start(Ok(())).unwrap();
        controller.apply_loop_status(status(42, true));

        controller.begin_stop();
        controller.finish_stop();
        controller.apply_loop_status(status(42, false));

        let request = controller.begin_start().unwrap();
        assert_eq!(request.resume_count, 42);
    }

    #[test]
    fn test_failed_start_reverts_and_keeps_count() {
        let mut controller = SendingController::default();
        controller.apply_loop_status(status(7, false));
        controller.begin_start().unwrap();

        let err = controller
            .finish_start(Err(BackendError::DeviceNotFound(DeviceId(0))))
            .unwrap_err();

        assert_eq!(err, SendingError::Start(BackendError::DeviceNotFound(DeviceId(0))));
        assert_eq!(controller.phase(), LoopPhase::Stopped);
        assert_eq!(controller.packets_sent(), Some(7));
    }

    #[test]
    fn test_start_refused_while_busy() {
        let mut controller = SendingController::default();
        controller.begin_start().unwrap();

        assert_eq!(
            controller.begin_start(),
            Err(SendingError::LoopBusy(LoopPhase::Starting))
        );
        controller.finish_start(Ok(())).unwrap();
        assert_eq!(
            controller.begin_start(),
            Err(SendingError::LoopBusy(LoopPhase::Running))
        );
    }

    #[test]
    fn test_stop_always_ends_stopped() {
        let mut controller = SendingController::default();
        controller.begin_start().unwrap();
        controller.finish_start(Ok(())).unwrap();

        controller.begin_stop();
        assert_eq!(controller.phase(), LoopPhase::Stopping);
        assert!(controller.is_simulating());
        controller.finish_stop();
        assert_eq!(controller.phase(), LoopPhase::Stopped);
    }

    #[test]
    fn test_target_parsed_into_request() {
        let mut controller = SendingController::default();
        controller.set_target(Some("3".to_string())).unwrap();
        controller.set_mode(SendingMode::TestPattern);
        controller.set_interval_ms(100);

        let request = controller.begin_start().unwrap();
        assert_eq!(request.target, DeviceId(3));
        assert_eq!(request.mode, SendingMode::TestPattern);
        assert_eq!(request.interval_ms, 100);
    }

    #[test]
    fn test_invalid_target_coerces_to_zero() {
        let mut controller = SendingController::default();
        controller.set_target(Some("radio".to_string())).unwrap();
        assert_eq!(controller.target_device(), DeviceId(0));

        controller.set_target(Some("  ".to_string())).unwrap();
        assert_eq!(controller.settings().target, None);
    }

    #[test]
    fn test_target_locked_while_simulating() {
        let mut controller = SendingController::default();
        controller.begin_start().unwrap();

        assert!(controller.set_target(Some("1".to_string())).is_err());
        assert_eq!(controller.settings().target, None);
    }

    #[test]
    fn test_push_updates_report_changes() {
        let mut controller = SendingController::default();
        assert!(controller.apply_loop_status(status(1, true)));
        assert!(!controller.apply_loop_status(status(1, true)));
        assert!(controller.apply_received_packets(3));
        assert!(!controller.apply_received_packets(3));
        assert!(controller.apply_data_indicator(true));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.packets_sent, Some(1));
        assert_eq!(snapshot.received_packets, 3);
        assert!(snapshot.got_data);
        assert!(!snapshot.running());
    }
}
