//! Integration tests for the uplink sending core
//!
//! These tests drive the sending actor against the simulated backend and
//! verify end-to-end behavior including:
//! - Device registration, binding and removal
//! - Resuming the sending loop from the backend's packet count
//! - Backend rejections surfacing as notifications
//! - Registry invariants under arbitrary add/remove sequences

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uplink_core::{
    DeviceEntry, LoopPhase, LoopSnapshot, Notification, SendingActor, SendingActorCommand,
    SendingEvent, SortOrder,
};
use uplink_sim::{spawn_sim_backend, SimBackendConfig, SimBackendHandle};
use uplink_types::{DeviceId, DeviceKind, LoopStatus};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    /// An actor wired to a running simulated backend
    pub struct Rig {
        pub cmd_tx: mpsc::Sender<SendingActorCommand>,
        pub event_rx: mpsc::Receiver<SendingEvent>,
        backend: SimBackendHandle,
        actor: JoinHandle<()>,
        sim: JoinHandle<()>,
    }

    impl Rig {
        pub fn spawn() -> Self {
            let config = SimBackendConfig {
                available_ports: vec!["COM3".to_string(), "COM4".to_string()],
                ..Default::default()
            };
            let (backend, update_rx, sim) = spawn_sim_backend(config);

            let (cmd_tx, cmd_rx) = mpsc::channel(64);
            let (event_tx, event_rx) = mpsc::channel(1024);
            let actor = tokio::spawn(
                SendingActor::new(backend.clone(), event_tx).run(cmd_rx, update_rx),
            );

            Self {
                cmd_tx,
                event_rx,
                backend,
                actor,
                sim,
            }
        }

        pub async fn send(&self, cmd: SendingActorCommand) {
            self.cmd_tx.send(cmd).await.unwrap();
        }

        pub async fn add_device(&self, kind: DeviceKind) -> DeviceId {
            let (response, rx) = oneshot::channel();
            self.send(SendingActorCommand::AddDevice { kind, response })
                .await;
            rx.await.unwrap().expect("device id available")
        }

        pub async fn add_paths(&self, paths: &[&str]) -> Vec<DeviceId> {
            let (response, rx) = oneshot::channel();
            self.send(SendingActorCommand::AddPaths {
                paths: paths.iter().map(|p| p.to_string()).collect(),
                response,
            })
            .await;
            rx.await.unwrap()
        }

        pub async fn select(&self, id: DeviceId, selection: &str, baud_rate: u32) {
            self.send(SendingActorCommand::UpdateSelection {
                id,
                selection: selection.to_string(),
                baud_rate: Some(baud_rate),
            })
            .await;
        }

        pub async fn list(&self, kind: DeviceKind, order: SortOrder) -> Vec<DeviceEntry> {
            let (response, rx) = oneshot::channel();
            self.send(SendingActorCommand::ListDevices {
                kind,
                order,
                response,
            })
            .await;
            rx.await.unwrap()
        }

        pub async fn snapshot(&self) -> LoopSnapshot {
            let (response, rx) = oneshot::channel();
            self.send(SendingActorCommand::Snapshot { response }).await;
            rx.await.unwrap()
        }

        /// Drop every event received so far
        pub fn drain(&mut self) -> Vec<SendingEvent> {
            std::iter::from_fn(|| self.event_rx.try_recv().ok()).collect()
        }

        /// Wait for the first event matching `pred`
        pub async fn wait_for<T>(&mut self, mut pred: impl FnMut(&SendingEvent) -> Option<T>) -> T {
            tokio::time::timeout(WAIT, async {
                loop {
                    let event = self.event_rx.recv().await.expect("event channel closed");
                    if let Some(found) = pred(&event) {
                        return found;
                    }
                }
            })
            .await
            .expect("timed out waiting for event")
        }

        pub async fn wait_for_loop_state(&mut self, pred: impl Fn(&LoopStatus) -> bool) -> LoopStatus {
            self.wait_for(|e| match e {
                SendingEvent::LoopStateUpdated { status } if pred(status) => Some(*status),
                _ => None,
            })
            .await
        }

        pub async fn wait_for_notification(&mut self) -> Notification {
            self.wait_for(|e| match e {
                SendingEvent::Notification(n) => Some(n.clone()),
                _ => None,
            })
            .await
        }

        pub async fn shutdown(self) {
            self.cmd_tx.send(SendingActorCommand::Shutdown).await.unwrap();
            self.actor.await.unwrap();
            self.backend.shutdown().await;
            self.sim.await.unwrap();
        }
    }
}

use helpers::Rig;

// ============================================================================
// Device Tests
// ============================================================================

mod device_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_bind_serial_port() {
        let rig = Rig::spawn();

        let id = rig.add_device(DeviceKind::SerialPort).await;
        rig.select(id, "COM3", 9600).await;
        let entries = rig.list(DeviceKind::SerialPort, SortOrder::Ascending).await;

        assert_eq!(id, DeviceId(0));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].selection, "COM3");
        assert!(entries[0].linked);

        rig.shutdown().await;
    }

    #[tokio::test]
    async fn test_port_conflict_keeps_local_selection() {
        let mut rig = Rig::spawn();

        let a = rig.add_device(DeviceKind::SerialPort).await;
        let b = rig.add_device(DeviceKind::SerialPort).await;
        rig.select(a, "COM3", 9600).await;
        rig.select(b, "COM3", 9600).await;

        let note = rig.wait_for_notification().await;
        assert_eq!(note.title, "Failed to set the active serial port");
        assert_eq!(note.description, "port COM3 is already in use by device 0");

        let entries = rig.list(DeviceKind::SerialPort, SortOrder::Ascending).await;
        assert_eq!(entries[1].id, b);
        assert_eq!(entries[1].selection, "COM3");

        rig.shutdown().await;
    }

    #[tokio::test]
    async fn test_paths_registered_as_file_devices() {
        let rig = Rig::spawn();

        let ids = rig.add_paths(&["flight-1.csv", "flight-2.csv"]).await;
        let files = rig.list(DeviceKind::File, SortOrder::Ascending).await;

        assert_eq!(ids, vec![DeviceId(0), DeviceId(1)]);
        let paths: Vec<_> = files.iter().map(|e| e.selection.as_str()).collect();
        assert_eq!(paths, vec!["flight-1.csv", "flight-2.csv"]);
        assert!(files.iter().all(|e| e.linked));

        rig.shutdown().await;
    }

    #[tokio::test]
    async fn test_removed_ids_are_not_reused() {
        let rig = Rig::spawn();

        let a = rig.add_device(DeviceKind::AimXtra).await;
        rig.send(SendingActorCommand::RemoveDevice { id: a }).await;
        rig.send(SendingActorCommand::RemoveDevice { id: a }).await;
        let b = rig.add_device(DeviceKind::AimXtra).await;

        assert!(b > a);
        let entries = rig.list(DeviceKind::AimXtra, SortOrder::Ascending).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, b);

        rig.shutdown().await;
    }
}

// ============================================================================
// Sending Loop Tests
// ============================================================================

mod loop_tests {
    use super::*;

    #[tokio::test]
    async fn test_restart_resumes_from_reported_count() {
        let mut rig = Rig::spawn();

        let id = rig.add_device(DeviceKind::SerialPort).await;
        rig.select(id, "COM3", 9600).await;
        rig.send(SendingActorCommand::SetInterval { interval_ms: 2 })
            .await;

        rig.send(SendingActorCommand::StartLoop).await;
        rig.wait_for_loop_state(|s| s.packets_sent >= 3).await;
        rig.send(SendingActorCommand::StopLoop).await;

        let stopped = rig.snapshot().await;
        assert_eq!(stopped.phase, LoopPhase::Stopped);
        let count = stopped.packets_sent.unwrap();
        assert!(count >= 3);

        rig.drain();
        rig.send(SendingActorCommand::StartLoop).await;

        // The first state after restart is the backend echoing the resumed count
        let resumed = rig.wait_for_loop_state(|_| true).await;
        assert_eq!(
            resumed,
            LoopStatus {
                packets_sent: count,
                running: true,
            }
        );
        let later = rig.wait_for_loop_state(|s| s.packets_sent > count).await;
        assert!(later.running);

        rig.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_without_bound_target_fails() {
        let mut rig = Rig::spawn();

        rig.add_device(DeviceKind::SerialPort).await;
        rig.send(SendingActorCommand::StartLoop).await;

        let note = rig.wait_for_notification().await;
        assert_eq!(note.title, "Failed to start simulation");
        assert_eq!(note.description, "device 0 has no port or file bound");

        let snapshot = rig.snapshot().await;
        assert!(!snapshot.running());
        assert_eq!(snapshot.packets_sent, Some(0));

        rig.shutdown().await;
    }

    #[tokio::test]
    async fn test_loop_targets_selected_device() {
        let mut rig = Rig::spawn();

        let a = rig.add_device(DeviceKind::SerialPort).await;
        let b = rig.add_device(DeviceKind::TeleDongle).await;
        rig.select(a, "COM3", 9600).await;
        rig.select(b, "COM4", 9600).await;
        rig.send(SendingActorCommand::SetTarget {
            target: Some(b.to_string()),
        })
        .await;
        rig.send(SendingActorCommand::SetInterval { interval_ms: 2 })
            .await;
        rig.send(SendingActorCommand::StartLoop).await;

        // Device a hears every packet sent on b
        let received = rig
            .wait_for(|e| match e {
                SendingEvent::ReceivedPacketsUpdated { count } if *count >= 2 => Some(*count),
                _ => None,
            })
            .await;
        assert!(received >= 2);
        assert!(rig.snapshot().await.got_data);

        rig.send(SendingActorCommand::StopLoop).await;
        assert!(!rig.snapshot().await.running());

        rig.shutdown().await;
    }

    #[tokio::test]
    async fn test_ports_offered_by_backend() {
        let mut rig = Rig::spawn();

        let pushed = rig
            .wait_for(|e| match e {
                SendingEvent::AvailablePortsChanged { ports } => Some(ports.clone()),
                _ => None,
            })
            .await;
        assert_eq!(pushed.len(), 2);

        let (response, rx) = oneshot::channel();
        rig.send(SendingActorCommand::AvailablePorts { response })
            .await;

        assert_eq!(rx.await.unwrap(), vec!["COM3".to_string(), "COM4".to_string()]);

        rig.shutdown().await;
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use proptest::prelude::*;
    use uplink_core::DeviceRegistry;

    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(DeviceKind),
        AddPaths(Vec<String>),
        Remove(usize),
    }

    fn kind() -> impl Strategy<Value = DeviceKind> {
        prop::sample::select(DeviceKind::ALL.to_vec())
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => kind().prop_map(Op::Add),
            2 => prop::collection::vec("[a-z]{1,8}\\.csv", 1..4).prop_map(Op::AddPaths),
            1 => any::<usize>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn ids_unique_and_increasing(ops in prop::collection::vec(op(), 1..64)) {
            let mut registry = DeviceRegistry::new();
            let mut allocated: Vec<DeviceId> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(kind) => allocated.extend(registry.add_device(kind)),
                    Op::AddPaths(paths) => {
                        let count = paths.len();
                        let added = registry.add_path_entries(paths);
                        prop_assert_eq!(added.len(), count);
                        allocated.extend(added.into_iter().map(|(id, _)| id));
                    }
                    Op::Remove(index) => {
                        if !registry.is_empty() {
                            let id = registry.entries()[index % registry.len()].id;
                            registry.remove(id);
                        }
                    }
                }
            }

            prop_assert!(allocated.windows(2).all(|w| w[0] < w[1]));
            let live: std::collections::HashSet<_> = registry.entries().iter().map(|e| e.id).collect();
            prop_assert_eq!(live.len(), registry.len());
        }

        #[test]
        fn second_remove_is_noop(kinds in prop::collection::vec(kind(), 1..16), pick in any::<usize>()) {
            let mut registry = DeviceRegistry::new();
            let ids: Vec<_> = kinds.into_iter().filter_map(|k| registry.add_device(k)).collect();
            let id = ids[pick % ids.len()];

            prop_assert!(registry.remove(id).is_some());
            let before = registry.entries().to_vec();
            prop_assert!(registry.remove(id).is_none());
            prop_assert_eq!(registry.entries(), &before[..]);
        }

        #[test]
        fn descending_is_reverse_of_ascending(
            kinds in prop::collection::vec(kind(), 0..32),
            listed in kind(),
        ) {
            let mut registry = DeviceRegistry::new();
            for k in kinds {
                registry.add_device(k);
            }

            let asc: Vec<_> = registry
                .list_by_kind(listed, SortOrder::Ascending)
                .into_iter()
                .map(|e| e.id)
                .collect();
            let mut desc: Vec<_> = registry
                .list_by_kind(listed, SortOrder::Descending)
                .into_iter()
                .map(|e| e.id)
                .collect();

            prop_assert!(asc.windows(2).all(|w| w[0] < w[1]));
            desc.reverse();
            prop_assert_eq!(asc, desc);
        }
    }
}
