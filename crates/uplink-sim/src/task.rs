//! Simulated backend task
//!
//! This module runs a [`SimBackend`] as an async task and exposes it through
//! [`SimBackendHandle`], which implements [`Backend`]. The task uses a select!
//! loop to:
//! - Serve requests from handles, replying on a oneshot per request
//! - Emit a packet on every timer tick while the loop runs
//! - Push [`BackendUpdate`]s whenever devices or counters change

use std::collections::VecDeque;
use std::mem;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uplink_types::{Backend, BackendError, BackendUpdate, DeviceId, DeviceKind, StartLoopRequest};

use crate::backend::{SimBackend, SimBackendConfig};

type Reply = oneshot::Sender<Result<(), BackendError>>;

/// Requests served by the simulated backend task
#[derive(Debug)]
pub enum SimRequest {
    /// Create a device record
    Register {
        id: DeviceId,
        kind: DeviceKind,
        reply: Reply,
    },
    /// Create a file-backed device
    RegisterFile {
        id: DeviceId,
        path: String,
        reply: Reply,
    },
    /// Bind a port to a device
    Bind {
        id: DeviceId,
        port: String,
        baud_rate: u32,
        reply: Reply,
    },
    /// Forget a device
    Unregister { id: DeviceId, reply: Reply },
    /// Start or resume the loop
    Start {
        request: StartLoopRequest,
        reply: Reply,
    },
    /// Halt the loop
    Stop { reply: Reply },
    /// Replace the offered port names
    SetAvailablePorts { ports: Vec<String> },
    /// Shutdown the task
    Shutdown,
}

/// Run the simulated backend task
///
/// Pushes the initial port list, device list and loop status, then serves
/// requests until a [`SimRequest::Shutdown`] arrives or every handle is
/// dropped. Updates never block request handling: when the receiver is full
/// they are queued, keeping only the newest value of each kind.
pub async fn run_sim_backend(
    mut backend: SimBackend,
    mut request_rx: mpsc::Receiver<SimRequest>,
    update_tx: mpsc::Sender<BackendUpdate>,
) {
    info!("Starting simulated backend");

    let mut outbox = Outbox::default();
    outbox.push(
        &update_tx,
        BackendUpdate::AvailablePorts(backend.available_ports().to_vec()),
    );
    outbox.push(&update_tx, BackendUpdate::DeviceList(backend.devices()));
    outbox.push(&update_tx, BackendUpdate::LoopState(backend.loop_status()));

    // Only polled while the loop runs; replaced on every start
    let mut ticker: Interval = interval(Duration::from_millis(1));

    loop {
        tokio::select! {
            request = request_rx.recv() => {
                let Some(request) = request else {
                    debug!("All simulated backend handles dropped");
                    break;
                };

                match request {
                    SimRequest::Register { id, kind, reply } => {
                        let result = backend.register_device(id, kind);
                        if result.is_ok() {
                            outbox.push(&update_tx, BackendUpdate::DeviceList(backend.devices()));
                        }
                        let _ = reply.send(result);
                    }
                    SimRequest::RegisterFile { id, path, reply } => {
                        let result = backend.register_file_device(id, &path);
                        if result.is_ok() {
                            outbox.push(&update_tx, BackendUpdate::DeviceList(backend.devices()));
                        }
                        let _ = reply.send(result);
                    }
                    SimRequest::Bind { id, port, baud_rate, reply } => {
                        let result = backend.bind_port(id, &port, baud_rate);
                        if result.is_ok() {
                            outbox.push(&update_tx, BackendUpdate::DeviceList(backend.devices()));
                        }
                        let _ = reply.send(result);
                    }
                    SimRequest::Unregister { id, reply } => {
                        let was_running = backend.is_running();
                        let result = backend.unregister_device(id);
                        if result.is_ok() {
                            outbox.push(&update_tx, BackendUpdate::DeviceList(backend.devices()));
                            if was_running != backend.is_running() {
                                outbox.push(&update_tx, BackendUpdate::LoopState(backend.loop_status()));
                            }
                        }
                        let _ = reply.send(result);
                    }
                    SimRequest::Start { request, reply } => {
                        let result = backend.start_loop(request);
                        if let Some(period) = backend.tick_interval().filter(|_| result.is_ok()) {
                            ticker = interval_at(Instant::now() + period, period);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            info!("Simulated loop running every {:?}", period);
                            outbox.push(&update_tx, BackendUpdate::LoopState(backend.loop_status()));
                        }
                        let _ = reply.send(result);
                    }
                    SimRequest::Stop { reply } => {
                        let result = backend.stop_loop();
                        if result.is_ok() {
                            info!("Simulated loop stopped");
                            outbox.push(&update_tx, BackendUpdate::LoopState(backend.loop_status()));
                        }
                        let _ = reply.send(result);
                    }
                    SimRequest::SetAvailablePorts { ports } => {
                        backend.set_available_ports(ports);
                        outbox.push(
                            &update_tx,
                            BackendUpdate::AvailablePorts(backend.available_ports().to_vec()),
                        );
                    }
                    SimRequest::Shutdown => {
                        info!("Shutdown requested for simulated backend");
                        break;
                    }
                }
            }

            permit = update_tx.reserve(), if !outbox.is_empty() => match permit {
                Ok(permit) => outbox.flush_one(permit),
                Err(_) => outbox.clear(),
            },

            _ = ticker.tick(), if backend.is_running() => {
                if backend.tick() {
                    outbox.push(&update_tx, BackendUpdate::LoopState(backend.loop_status()));
                    outbox.push(&update_tx, BackendUpdate::ReceivedPackets(backend.received_packets()));
                    outbox.push(&update_tx, BackendUpdate::DataIndicator(backend.got_data()));
                }
            }
        }
    }

    info!("Simulated backend ended");
}

/// Updates waiting for room in the update channel
///
/// Holds at most one update per [`BackendUpdate`] variant. A newer update
/// replaces the queued one of the same kind, so a slow consumer skips
/// intermediate counts but always receives the latest state.
#[derive(Debug, Default)]
struct Outbox {
    queued: VecDeque<BackendUpdate>,
}

impl Outbox {
    fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    fn push(&mut self, update_tx: &mpsc::Sender<BackendUpdate>, update: BackendUpdate) {
        // Anything already queued goes first
        if !self.queued.is_empty() {
            self.queue(update);
            return;
        }
        match update_tx.try_send(update) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(update)) => {
                debug!("Backend update channel full, queueing {:?}", update);
                self.queue(update);
            }
        }
    }

    fn queue(&mut self, update: BackendUpdate) {
        let kind = mem::discriminant(&update);
        match self
            .queued
            .iter()
            .position(|queued| mem::discriminant(queued) == kind)
        {
            Some(index) => self.queued[index] = update,
            None => self.queued.push_back(update),
        }
    }

    fn flush_one(&mut self, permit: mpsc::Permit<'_, BackendUpdate>) {
        if let Some(update) = self.queued.pop_front() {
            permit.send(update);
        }
    }

    fn clear(&mut self) {
        if !self.queued.is_empty() {
            warn!("Backend update channel closed, dropping {} queued updates", self.queued.len());
        }
        self.queued.clear();
    }
}

/// Cloneable handle to a running simulated backend
#[derive(Debug, Clone)]
pub struct SimBackendHandle {
    request_tx: mpsc::Sender<SimRequest>,
}

impl SimBackendHandle {
    /// Wrap the sending side of a request channel
    pub fn new(request_tx: mpsc::Sender<SimRequest>) -> Self {
        Self { request_tx }
    }

    async fn call(&self, request: impl FnOnce(Reply) -> SimRequest) -> Result<(), BackendError> {
        let (reply, reply_rx) = oneshot::channel();
        self.request_tx
            .send(request(reply))
            .await
            .map_err(|_| BackendError::Disconnected("simulated backend has stopped".to_string()))?;
        reply_rx.await.map_err(|_| {
            BackendError::Disconnected("simulated backend dropped the request".to_string())
        })?
    }

    /// Replace the port names offered as bind candidates
    pub async fn set_available_ports(&self, ports: Vec<String>) -> Result<(), BackendError> {
        self.request_tx
            .send(SimRequest::SetAvailablePorts { ports })
            .await
            .map_err(|_| BackendError::Disconnected("simulated backend has stopped".to_string()))
    }

    /// Ask the task to exit
    pub async fn shutdown(&self) {
        let _ = self.request_tx.send(SimRequest::Shutdown).await;
    }
}

impl Backend for SimBackendHandle {
    async fn register_device(&self, id: DeviceId, kind: DeviceKind) -> Result<(), BackendError> {
        self.call(|reply| SimRequest::Register { id, kind, reply })
            .await
    }

    async fn register_file_device(&self, id: DeviceId, path: &str) -> Result<(), BackendError> {
        let path = path.to_string();
        self.call(|reply| SimRequest::RegisterFile { id, path, reply })
            .await
    }

    async fn bind_port(&self, id: DeviceId, port: &str, baud_rate: u32) -> Result<(), BackendError> {
        let port = port.to_string();
        self.call(|reply| SimRequest::Bind {
            id,
            port,
            baud_rate,
            reply,
        })
        .await
    }

    async fn unregister_device(&self, id: DeviceId) -> Result<(), BackendError> {
        self.call(|reply| SimRequest::Unregister { id, reply }).await
    }

    async fn start_loop(&self, request: StartLoopRequest) -> Result<(), BackendError> {
        self.call(|reply| SimRequest::Start { request, reply }).await
    }

    async fn stop_loop(&self) -> Result<(), BackendError> {
        self.call(|reply| SimRequest::Stop { reply }).await
    }
}

/// Spawn a simulated backend on the current runtime
///
/// Returns the handle, the receiver for pushed updates, and the task handle.
pub fn spawn_sim_backend(
    config: SimBackendConfig,
) -> (SimBackendHandle, mpsc::Receiver<BackendUpdate>, JoinHandle<()>) {
    let (request_tx, request_rx) = mpsc::channel(config.request_capacity.max(1));
    let (update_tx, update_rx) = mpsc::channel(config.update_capacity.max(1));
    let backend = SimBackend::from_config(&config);

    let task = tokio::spawn(run_sim_backend(backend, request_rx, update_tx));
    (SimBackendHandle::new(request_tx), update_rx, task)
}
