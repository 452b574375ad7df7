//! Sending actor
//!
//! This module provides the async task that owns the device registry and the
//! sending-loop controller. Nothing else holds a reference to either: front
//! ends talk to the actor through [`SendingActorCommand`]s and observe it
//! through [`SendingEvent`]s.
//!
//! # Architecture
//!
//! The actor reads two channels:
//! - user commands (add/edit/remove devices, configure and toggle the loop)
//! - [`BackendUpdate`]s pushed by the backend (device list, counters)
//!
//! Each command runs to completion, including the backend call it issues,
//! before the next one is read. Local state is always updated before the
//! backend call goes out. Backend failures are caught here, logged, and
//! reported as [`SendingEvent::Notification`]; none escape the actor.
//!
//! # Example
//!
//! ```rust,ignore
//! use uplink_core::actor::{run_sending_actor, SendingActorCommand};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, mut event_rx) = mpsc::channel(256);
//!
//! // `backend` implements `uplink_types::Backend`, `update_rx` carries its pushes
//! tokio::spawn(run_sending_actor(backend, cmd_rx, update_rx, event_tx));
//! ```

use std::ops::ControlFlow;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uplink_types::{Backend, BackendUpdate, DeviceId, DeviceKind, SendingMode};

use crate::controller::{LoopSettings, LoopSnapshot, SendingController};
use crate::error::SendingError;
use crate::events::SendingEvent;
use crate::policy::{IgnoreStopFailure, StopPolicy};
use crate::registry::{DeviceEntry, DeviceRegistry, SortOrder};

/// Commands sent to the sending actor
#[derive(Debug)]
pub enum SendingActorCommand {
    /// Add a device of `kind` with an empty selection
    AddDevice {
        /// Device kind
        kind: DeviceKind,
        /// Channel to send back the allocated id, `None` when no id is left
        response: oneshot::Sender<Option<DeviceId>>,
    },

    /// Add one file-backed device per path, in order
    AddPaths {
        /// File paths
        paths: Vec<String>,
        /// Channel to send back the allocated ids, in input order; paths
        /// past id exhaustion are dropped
        response: oneshot::Sender<Vec<DeviceId>>,
    },

    /// Change a device's selection and bind it
    UpdateSelection {
        /// Device id
        id: DeviceId,
        /// Port name or file path
        selection: String,
        /// Baud rate for the bind; the configured rate when `None`
        baud_rate: Option<u32>,
    },

    /// Delete a device locally and on the backend
    RemoveDevice {
        /// Device id
        id: DeviceId,
    },

    /// Query entries of one kind sorted by id
    ListDevices {
        /// Kind to list
        kind: DeviceKind,
        /// Sort order
        order: SortOrder,
        /// Channel to send back the entries
        response: oneshot::Sender<Vec<DeviceEntry>>,
    },

    /// Query the backend-reported port names
    AvailablePorts {
        /// Channel to send back the names
        response: oneshot::Sender<Vec<String>>,
    },

    /// Query the controller state
    Snapshot {
        /// Channel to send back the snapshot
        response: oneshot::Sender<LoopSnapshot>,
    },

    /// Set the delay between packets
    SetInterval {
        /// Milliseconds
        interval_ms: u64,
    },

    /// Set the baud rate used for binds
    SetBaudRate {
        /// Baud rate
        baud_rate: u32,
    },

    /// Set the packet source
    SetMode {
        /// New mode
        mode: SendingMode,
    },

    /// Set the output device selector
    SetTarget {
        /// Raw selector, `None` to unset
        target: Option<String>,
    },

    /// Start or resume the sending loop
    StartLoop,

    /// Stop the sending loop
    StopLoop,

    /// Stop if simulating, start otherwise
    ToggleLoop,

    /// Shutdown the actor
    Shutdown,
}

/// Owner of the registry and controller
pub struct SendingActor<B> {
    backend: B,
    registry: DeviceRegistry,
    controller: SendingController,
    stop_policy: Box<dyn StopPolicy>,
    available_ports: Vec<String>,
    event_tx: mpsc::Sender<SendingEvent>,
}

impl<B: Backend> SendingActor<B> {
    /// Create an actor with default settings that ignores stop failures
    pub fn new(backend: B, event_tx: mpsc::Sender<SendingEvent>) -> Self {
        Self {
            backend,
            registry: DeviceRegistry::new(),
            controller: SendingController::default(),
            stop_policy: Box::new(IgnoreStopFailure),
            available_ports: Vec::new(),
            event_tx,
        }
    }

    /// Start from the given loop settings
    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.controller = SendingController::new(settings);
        self
    }

    /// Replace the stop failure policy
    pub fn with_stop_policy(mut self, policy: Box<dyn StopPolicy>) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Process commands and backend updates until shutdown
    ///
    /// Runs until a [`SendingActorCommand::Shutdown`] arrives or the command
    /// channel closes. A closed update channel only stops update processing.
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<SendingActorCommand>,
        mut update_rx: mpsc::Receiver<BackendUpdate>,
    ) {
        info!("Sending actor started");
        let mut updates_open = true;

        loop {
            tokio::select! {
                // Backend state already queued is applied before the next command
                biased;

                update = update_rx.recv(), if updates_open => match update {
                    Some(update) => self.apply_update(update).await,
                    None => {
                        debug!("Backend update channel closed");
                        updates_open = false;
                    }
                },

                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if self.handle_command(cmd).await.is_break() {
                        break;
                    }
                }
            }
        }

        info!("Sending actor stopped");
    }

    async fn handle_command(&mut self, cmd: SendingActorCommand) -> ControlFlow<()> {
        match cmd {
            SendingActorCommand::AddDevice { kind, response } => {
                let id = self.add_device(kind).await;
                let _ = response.send(id);
            }

            SendingActorCommand::AddPaths { paths, response } => {
                let ids = self.add_paths(paths).await;
                let _ = response.send(ids);
            }

            SendingActorCommand::UpdateSelection {
                id,
                selection,
                baud_rate,
            } => {
                self.update_selection(id, selection, baud_rate).await;
            }

            SendingActorCommand::RemoveDevice { id } => {
                self.remove_device(id).await;
            }

            SendingActorCommand::ListDevices {
                kind,
                order,
                response,
            } => {
                let entries = self
                    .registry
                    .list_by_kind(kind, order)
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = response.send(entries);
            }

            SendingActorCommand::AvailablePorts { response } => {
                let _ = response.send(self.available_ports.clone());
            }

            SendingActorCommand::Snapshot { response } => {
                let _ = response.send(self.controller.snapshot());
            }

            SendingActorCommand::SetInterval { interval_ms } => {
                self.controller.set_interval_ms(interval_ms);
                self.emit_settings().await;
            }

            SendingActorCommand::SetBaudRate { baud_rate } => {
                self.controller.set_baud_rate(baud_rate);
                self.emit_settings().await;
            }

            SendingActorCommand::SetMode { mode } => {
                self.controller.set_mode(mode);
                self.emit_settings().await;
            }

            SendingActorCommand::SetTarget { target } => match self.controller.set_target(target) {
                Ok(()) => self.emit_settings().await,
                Err(e) => self.report(e).await,
            },

            SendingActorCommand::StartLoop => self.start_loop().await,

            SendingActorCommand::StopLoop => self.stop_loop().await,

            SendingActorCommand::ToggleLoop => {
                if self.controller.is_simulating() {
                    self.stop_loop().await;
                } else {
                    self.start_loop().await;
                }
            }

            SendingActorCommand::Shutdown => {
                info!("Shutdown requested for sending actor");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn add_device(&mut self, kind: DeviceKind) -> Option<DeviceId> {
        let Some(id) = self.registry.add_device(kind) else {
            self.report(SendingError::IdsExhausted).await;
            return None;
        };
        self.emit_added(id).await;

        if let Err(source) = self.backend.register_device(id, kind).await {
            self.report(SendingError::Register { id, kind, source }).await;
        } else {
            info!("Registered {} device {}", kind, id);
        }
        Some(id)
    }

    async fn add_paths(&mut self, paths: Vec<String>) -> Vec<DeviceId> {
        let requested = paths.len();
        let added = self.registry.add_path_entries(paths);
        if added.len() < requested {
            self.report(SendingError::IdsExhausted).await;
        }
        for (id, _) in &added {
            self.emit_added(*id).await;
        }

        // All registrations are issued in input order before any is awaited
        let backend = &self.backend;
        let results = join_all(
            added
                .iter()
                .map(|(id, path)| backend.register_file_device(*id, path)),
        )
        .await;

        for ((id, path), result) in added.iter().zip(results) {
            match result {
                Ok(()) => info!("Registered file device {} for {}", id, path),
                Err(source) => {
                    self.report(SendingError::RegisterFile {
                        id: *id,
                        path: path.clone(),
                        source,
                    })
                    .await
                }
            }
        }

        added.into_iter().map(|(id, _)| id).collect()
    }

    async fn update_selection(&mut self, id: DeviceId, selection: String, baud_rate: Option<u32>) {
        let baud_rate = baud_rate.unwrap_or(self.controller.settings().baud_rate);

        if self.registry.update_selection(id, selection.clone()) {
            self.emit(SendingEvent::SelectionChanged {
                id,
                selection: selection.clone(),
            })
            .await;
        } else {
            debug!("No local entry for device {}, binding anyway", id);
        }

        // The local edit stays even if the bind fails
        match self.backend.bind_port(id, &selection, baud_rate).await {
            Ok(()) => info!("Bound device {} to {} at {} baud", id, selection, baud_rate),
            Err(source) => {
                self.report(SendingError::Bind {
                    id,
                    selection,
                    source,
                })
                .await
            }
        }
    }

    async fn remove_device(&mut self, id: DeviceId) {
        if !self.registry.contains(id) {
            debug!("Remove of unknown device {} ignored", id);
            return;
        }

        let result = self.backend.unregister_device(id).await;
        self.registry.remove(id);
        self.emit(SendingEvent::DeviceRemoved { id }).await;

        match result {
            Ok(()) => info!("Removed device {}", id),
            Err(source) => self.report(SendingError::Unregister { id, source }).await,
        }
    }

    async fn start_loop(&mut self) {
        let request = match self.controller.begin_start() {
            Ok(request) => request,
            Err(e) => {
                self.report(e).await;
                return;
            }
        };
        self.emit_phase().await;

        let result = self.backend.start_loop(request).await;
        let outcome = self.controller.finish_start(result);
        self.emit_phase().await;

        if let Err(e) = outcome {
            self.report(e).await;
        }
    }

    async fn stop_loop(&mut self) {
        self.controller.begin_stop();
        self.emit_phase().await;

        let result = self.backend.stop_loop().await;
        self.controller.finish_stop();
        self.emit_phase().await;

        if let Some(e) = self.stop_policy.on_stop(result) {
            self.report(e).await;
        }
    }

    async fn apply_update(&mut self, update: BackendUpdate) {
        if !update.is_loop_update() {
            debug!("Backend update: {:?}", update);
        }

        match update {
            BackendUpdate::DeviceList(devices) => {
                let summary = self.registry.reconcile(&devices);
                if !summary.is_empty() {
                    debug!(
                        "Reconciled device list: discovered {:?}, orphaned {:?}",
                        summary.discovered, summary.orphaned
                    );
                    self.emit(SendingEvent::DevicesReconciled(summary)).await;
                }
            }
            BackendUpdate::LoopState(status) => {
                if self.controller.apply_loop_status(status) {
                    self.emit(SendingEvent::LoopStateUpdated { status }).await;
                }
            }
            BackendUpdate::ReceivedPackets(count) => {
                if self.controller.apply_received_packets(count) {
                    self.emit(SendingEvent::ReceivedPacketsUpdated { count }).await;
                }
            }
            BackendUpdate::DataIndicator(got_data) => {
                if self.controller.apply_data_indicator(got_data) {
                    self.emit(SendingEvent::DataIndicatorChanged { got_data })
                        .await;
                }
            }
            BackendUpdate::AvailablePorts(ports) => {
                if self.available_ports != ports {
                    self.available_ports = ports.clone();
                    self.emit(SendingEvent::AvailablePortsChanged { ports }).await;
                }
            }
        }
    }

    async fn report(&self, error: SendingError) {
        warn!("{}", error);
        self.emit(SendingEvent::Notification(error.notification()))
            .await;
    }

    async fn emit_added(&self, id: DeviceId) {
        if let Some(entry) = self.registry.get(id).cloned() {
            self.emit(SendingEvent::DeviceAdded { entry }).await;
        }
    }

    async fn emit_phase(&self) {
        let phase = self.controller.phase();
        self.emit(SendingEvent::LoopPhaseChanged { phase }).await;
    }

    async fn emit_settings(&self) {
        let settings = self.controller.settings().clone();
        self.emit(SendingEvent::SettingsChanged { settings }).await;
    }

    async fn emit(&self, event: SendingEvent) {
        let _ = self.event_tx.send(event).await;
    }
}

/// Run a sending actor with default settings
///
/// # Arguments
///
/// * `backend` - Backend that device and loop calls are issued to
/// * `cmd_rx` - Receiver for commands sent to the actor
/// * `update_rx` - Receiver for state the backend pushes
/// * `event_tx` - Sender for events emitted by the actor
pub async fn run_sending_actor<B: Backend>(
    backend: B,
    cmd_rx: mpsc::Receiver<SendingActorCommand>,
    update_rx: mpsc::Receiver<BackendUpdate>,
    event_tx: mpsc::Sender<SendingEvent>,
) {
    SendingActor::new(backend, event_tx)
        .run(cmd_rx, update_rx)
        .await
}
