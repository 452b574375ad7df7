//! Simulated communication backend
//!
//! Tracks device records, port bindings and a sending loop in memory and
//! enforces the same rules a hardware backend would, so the sending core can be
//! exercised without radios attached.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uplink_types::{
    BackendDevice, BackendError, DeviceId, DeviceKind, LoopStatus, StartLoopRequest,
};

/// A device record held by the simulated backend
#[derive(Debug, Clone, PartialEq, Eq)]
struct SimDevice {
    kind: DeviceKind,
    /// Bound port name, or the file path for file-backed devices
    source: Option<String>,
    baud_rate: Option<u32>,
}

/// Configuration for creating a simulated backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimBackendConfig {
    /// Port names offered as bind candidates
    pub available_ports: Vec<String>,
    /// Capacity of the request channel
    pub request_capacity: usize,
    /// Capacity of the pushed update channel
    pub update_capacity: usize,
}

impl Default for SimBackendConfig {
    fn default() -> Self {
        Self {
            available_ports: vec!["SIM0".to_string(), "SIM1".to_string()],
            request_capacity: 64,
            update_capacity: 256,
        }
    }
}

/// In-memory backend state
#[derive(Debug, Default)]
pub struct SimBackend {
    devices: BTreeMap<DeviceId, SimDevice>,
    /// Parameters of the running loop, `None` while stopped
    active: Option<StartLoopRequest>,
    packets_sent: u64,
    received_packets: u64,
    got_data: bool,
    available_ports: Vec<String>,
}

impl SimBackend {
    /// Create an empty backend offering no ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend from configuration
    pub fn from_config(config: &SimBackendConfig) -> Self {
        Self {
            available_ports: config.available_ports.clone(),
            ..Default::default()
        }
    }

    /// Create a device record
    pub fn register_device(&mut self, id: DeviceId, kind: DeviceKind) -> Result<(), BackendError> {
        if self.devices.contains_key(&id) {
            return Err(BackendError::DeviceExists(id));
        }
        self.devices.insert(
            id,
            SimDevice {
                kind,
                source: None,
                baud_rate: None,
            },
        );
        debug!("Sim backend registered {} device {}", kind, id);
        Ok(())
    }

    /// Create a file-backed device reading from `path`
    pub fn register_file_device(&mut self, id: DeviceId, path: &str) -> Result<(), BackendError> {
        if path.trim().is_empty() {
            return Err(BackendError::InvalidSelection(path.to_string()));
        }
        if self.devices.contains_key(&id) {
            return Err(BackendError::DeviceExists(id));
        }
        self.devices.insert(
            id,
            SimDevice {
                kind: DeviceKind::File,
                source: Some(path.to_string()),
                baud_rate: None,
            },
        );
        debug!("Sim backend registered file device {} for {}", id, path);
        Ok(())
    }

    /// Bind `port` to the device
    ///
    /// Rebinding a device to the port it already holds is accepted.
    pub fn bind_port(&mut self, id: DeviceId, port: &str, baud_rate: u32) -> Result<(), BackendError> {
        if !self.devices.contains_key(&id) {
            return Err(BackendError::DeviceNotFound(id));
        }
        if port.trim().is_empty() {
            return Err(BackendError::InvalidSelection(port.to_string()));
        }
        if baud_rate == 0 {
            return Err(BackendError::InvalidBaudRate(baud_rate));
        }
        if let Some(owner) = self.owner_of(port).filter(|owner| *owner != id) {
            return Err(BackendError::PortInUse {
                port: port.to_string(),
                owner,
            });
        }

        if let Some(device) = self.devices.get_mut(&id) {
            device.source = Some(port.to_string());
            device.baud_rate = Some(baud_rate);
        }
        debug!("Sim backend bound device {} to {} at {} baud", id, port, baud_rate);
        Ok(())
    }

    /// Forget the device; a running loop targeting it halts
    pub fn unregister_device(&mut self, id: DeviceId) -> Result<(), BackendError> {
        if self.devices.remove(&id).is_none() {
            return Err(BackendError::DeviceNotFound(id));
        }
        if self.active.is_some_and(|req| req.target == id) {
            debug!("Sim backend halting loop: target {} removed", id);
            self.active = None;
        }
        Ok(())
    }

    /// Start emitting from `request.resume_count`
    pub fn start_loop(&mut self, request: StartLoopRequest) -> Result<(), BackendError> {
        if self.active.is_some() {
            return Err(BackendError::LoopAlreadyRunning);
        }
        let target = self
            .devices
            .get(&request.target)
            .ok_or(BackendError::DeviceNotFound(request.target))?;
        if target.source.is_none() {
            return Err(BackendError::DeviceNotBound(request.target));
        }

        self.packets_sent = request.resume_count;
        self.active = Some(request);
        debug!(
            "Sim backend loop started on device {} from packet {}",
            request.target, request.resume_count
        );
        Ok(())
    }

    /// Halt emission, keeping the packet count
    pub fn stop_loop(&mut self) -> Result<(), BackendError> {
        if self.active.take().is_none() {
            return Err(BackendError::LoopNotRunning);
        }
        debug!("Sim backend loop stopped at packet {}", self.packets_sent);
        Ok(())
    }

    /// Emit one packet if the loop is running
    ///
    /// The packet counts as received once per other bound device. Returns
    /// whether a packet was sent.
    pub fn tick(&mut self) -> bool {
        let Some(request) = self.active else {
            return false;
        };

        self.packets_sent += 1;
        let listeners = self
            .devices
            .iter()
            .filter(|(id, device)| **id != request.target && device.source.is_some())
            .count() as u64;
        self.received_packets += listeners;
        self.got_data = listeners > 0;
        true
    }

    /// Check if the loop is running
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Delay between packets of the running loop, never below 1 ms
    pub fn tick_interval(&self) -> Option<Duration> {
        self.active
            .map(|req| Duration::from_millis(req.interval_ms.max(1)))
    }

    /// Device list as pushed to the sending core
    pub fn devices(&self) -> Vec<BackendDevice> {
        self.devices
            .iter()
            .map(|(id, device)| BackendDevice {
                id: *id,
                kind: device.kind,
                port: device.source.clone(),
            })
            .collect()
    }

    /// Baud rate the device was bound with
    pub fn baud_rate(&self, id: DeviceId) -> Option<u32> {
        self.devices.get(&id).and_then(|d| d.baud_rate)
    }

    /// Loop counters as pushed to the sending core
    pub fn loop_status(&self) -> LoopStatus {
        LoopStatus {
            packets_sent: self.packets_sent,
            running: self.is_running(),
        }
    }

    /// Packets counted as received
    pub fn received_packets(&self) -> u64 {
        self.received_packets
    }

    /// Whether the last packet reached another device
    pub fn got_data(&self) -> bool {
        self.got_data
    }

    /// Port names offered as bind candidates
    pub fn available_ports(&self) -> &[String] {
        &self.available_ports
    }

    /// Replace the offered port names
    pub fn set_available_ports(&mut self, ports: Vec<String>) {
        self.available_ports = ports;
    }

    fn owner_of(&self, port: &str) -> Option<DeviceId> {
        self.devices
            .iter()
            .find(|(_, device)| device.source.as_deref() == Some(port))
            .map(|(id, _)| *id)
    }
}
