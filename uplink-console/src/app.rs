//! Interactive console loop
//!
//! Reads commands from stdin, forwards them to the sending actor and prints
//! the events it emits. Logs go to stderr so they do not interleave with the
//! console output.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uplink_core::{
    DeviceEntry, LoopSnapshot, SendingActor, SendingActorCommand, SendingEvent, SortOrder,
};
use uplink_detect::PortScanner;
use uplink_sim::{spawn_sim_backend, SimBackendHandle};
use uplink_types::DeviceKind;

use crate::commands::{help_text, ConsoleCommand};
use crate::settings::Settings;

/// Console state held between commands
pub struct ConsoleApp {
    cmd_tx: mpsc::Sender<SendingActorCommand>,
    backend: SimBackendHandle,
    settings: Settings,
}

impl ConsoleApp {
    /// Request/response round trip with the actor
    async fn query<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SendingActorCommand,
    ) -> Result<T> {
        let (response, rx) = oneshot::channel();
        self.send(make(response)).await?;
        rx.await.context("sending actor dropped the request")
    }

    async fn send(&self, cmd: SendingActorCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .context("sending actor has stopped")
    }

    /// Execute one command; returns false when the console should exit
    async fn execute(&mut self, command: ConsoleCommand) -> Result<bool> {
        match command {
            ConsoleCommand::Add(kind) => {
                self.query(|response| SendingActorCommand::AddDevice { kind, response })
                    .await?;
            }
            ConsoleCommand::AddPaths(paths) => self.add_paths(paths).await?,
            ConsoleCommand::Recent => {
                if self.settings.recent_paths.is_empty() {
                    println!("no recent paths");
                }
                for (i, path) in self.settings.recent_paths.iter().enumerate() {
                    println!("  {:>2}  {}", i + 1, path);
                }
            }
            ConsoleCommand::AddRecent(indices) => {
                let (paths, missing) = self.settings.recent_by_index(&indices);
                for index in missing {
                    println!("error: no recent path #{}", index);
                }
                if !paths.is_empty() {
                    self.add_paths(paths).await?;
                }
            }
            ConsoleCommand::Set {
                id,
                selection,
                baud_rate,
            } => {
                self.send(SendingActorCommand::UpdateSelection {
                    id,
                    selection,
                    baud_rate,
                })
                .await?;
            }
            ConsoleCommand::Remove(id) => {
                self.send(SendingActorCommand::RemoveDevice { id }).await?;
            }
            ConsoleCommand::List(kind) => {
                let kinds = match kind {
                    Some(kind) => vec![kind],
                    None => DeviceKind::ALL.to_vec(),
                };
                let order = self.settings.sort_order;
                for kind in kinds {
                    let entries = self
                        .query(|response| SendingActorCommand::ListDevices {
                            kind,
                            order,
                            response,
                        })
                        .await?;
                    print!("{}", format_device_table(kind, order, &entries));
                }
            }
            ConsoleCommand::Sort => {
                self.settings.sort_order = self.settings.sort_order.toggled();
                let order = self.settings.sort_order;
                println!("sort order {:?} {}", order, order.arrow());
            }
            ConsoleCommand::Interval(interval_ms) => {
                self.send(SendingActorCommand::SetInterval { interval_ms })
                    .await?;
            }
            ConsoleCommand::Baud(baud_rate) => {
                self.send(SendingActorCommand::SetBaudRate { baud_rate })
                    .await?;
            }
            ConsoleCommand::Mode(mode) => {
                self.send(SendingActorCommand::SetMode { mode }).await?;
            }
            ConsoleCommand::Target(target) => {
                self.send(SendingActorCommand::SetTarget { target }).await?;
            }
            ConsoleCommand::Start => self.send(SendingActorCommand::StartLoop).await?,
            ConsoleCommand::Stop => self.send(SendingActorCommand::StopLoop).await?,
            ConsoleCommand::Toggle => self.send(SendingActorCommand::ToggleLoop).await?,
            ConsoleCommand::Status => {
                let snapshot = self
                    .query(|response| SendingActorCommand::Snapshot { response })
                    .await?;
                print!("{}", format_status(&snapshot));
            }
            ConsoleCommand::Ports => {
                let ports = self
                    .query(|response| SendingActorCommand::AvailablePorts { response })
                    .await?;
                if ports.is_empty() {
                    println!("no ports offered");
                }
                for port in ports {
                    println!("  {}", port);
                }
            }
            ConsoleCommand::Rescan => {
                let ports = candidate_ports(&self.settings);
                // The new list comes back as a ports event
                if let Err(e) = self.backend.set_available_ports(ports).await {
                    println!("error: {}", e);
                }
            }
            ConsoleCommand::Help => println!("{}", help_text()),
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn add_paths(&mut self, paths: Vec<String>) -> Result<()> {
        self.settings.remember_paths(&paths);
        if let Err(e) = self.settings.save() {
            warn!("Failed to save recent paths: {}", e);
        }

        self.query(|response| SendingActorCommand::AddPaths { paths, response })
            .await?;
        Ok(())
    }

    /// Store the loop settings in effect and save
    async fn persist(&mut self) -> Result<()> {
        let snapshot = self
            .query(|response| SendingActorCommand::Snapshot { response })
            .await?;
        self.settings.loop_settings = snapshot.settings;
        if let Err(e) = self.settings.save() {
            warn!("Failed to save settings: {}", e);
        }
        Ok(())
    }
}

/// Bind candidates: configured ports plus, if enabled, the host's serial ports
fn candidate_ports(settings: &Settings) -> Vec<String> {
    let mut ports = settings.backend.available_ports.clone();
    if settings.scan_ports {
        match PortScanner::new().enumerate_ports() {
            Ok(found) => {
                for info in found {
                    debug!("Detected serial port {}", info.display_label());
                    if !ports.contains(&info.port) {
                        ports.push(info.port);
                    }
                }
            }
            Err(e) => warn!("Serial port scan failed: {}", e),
        }
    }
    ports
}

/// Run the console until `quit` or end of input
pub async fn run(settings: Settings) -> Result<()> {
    let mut backend_config = settings.backend.clone();
    backend_config.available_ports = candidate_ports(&settings);
    let (backend, update_rx, sim_task) = spawn_sim_backend(backend_config);

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let actor = SendingActor::new(backend.clone(), event_tx)
        .with_settings(settings.loop_settings.clone())
        .with_stop_policy(settings.stop_failure.build());
    let actor_task = tokio::spawn(actor.run(cmd_rx, update_rx));

    let mut app = ConsoleApp {
        cmd_tx,
        backend: backend.clone(),
        settings,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("uplink console, type 'help' for commands");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    debug!("End of input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ConsoleCommand::parse(&line) {
                    Ok(command) => {
                        if !app.execute(command).await? {
                            break;
                        }
                    }
                    Err(e) => println!("error: {}", e),
                }
            }

            event = event_rx.recv() => {
                let Some(event) = event else {
                    warn!("Sending actor stopped unexpectedly");
                    break;
                };
                if let Some(text) = format_event(&event) {
                    println!("{}", text);
                }
            }
        }
    }

    app.persist().await?;
    app.send(SendingActorCommand::Shutdown).await?;
    actor_task.await.context("sending actor panicked")?;
    backend.shutdown().await;
    sim_task.await.context("simulated backend panicked")?;

    info!("Console exited");
    Ok(())
}

/// Console line for an event, `None` for per-packet updates
pub fn format_event(event: &SendingEvent) -> Option<String> {
    match event {
        SendingEvent::DeviceAdded { entry } => Some(if entry.is_unset() {
            format!("added {} device {}", entry.kind, entry.id)
        } else {
            format!("added {} device {} ({})", entry.kind, entry.id, entry.selection)
        }),
        SendingEvent::DeviceRemoved { id } => Some(format!("removed device {}", id)),
        SendingEvent::SelectionChanged { id, selection } => {
            Some(format!("device {} -> {}", id, selection))
        }
        SendingEvent::DevicesReconciled(summary) => {
            let mut parts = Vec::new();
            if !summary.discovered.is_empty() {
                parts.push(format!("backend reported new devices {}", join_ids(&summary.discovered)));
            }
            if !summary.orphaned.is_empty() {
                parts.push(format!("backend dropped devices {}", join_ids(&summary.orphaned)));
            }
            Some(parts.join("; "))
        }
        SendingEvent::AvailablePortsChanged { ports } => {
            Some(format!("ports available: {}", ports.join(", ")))
        }
        SendingEvent::LoopPhaseChanged { phase } => Some(format!("sending loop {}", phase)),
        SendingEvent::SettingsChanged { settings } => Some(format!(
            "interval {} ms, baud {}, mode {}, target {}",
            settings.interval_ms,
            settings.baud_rate,
            settings.mode,
            settings.target.as_deref().unwrap_or("-")
        )),
        SendingEvent::Notification(note) => {
            Some(format!("error: {}: {}", note.title, note.description))
        }
        SendingEvent::LoopStateUpdated { .. }
        | SendingEvent::ReceivedPacketsUpdated { .. }
        | SendingEvent::DataIndicatorChanged { .. } => None,
    }
}

fn join_ids(ids: &[uplink_types::DeviceId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table of one kind's entries for `ls`
pub fn format_device_table(kind: DeviceKind, order: SortOrder, entries: &[DeviceEntry]) -> String {
    let mut out = format!("{} (id {})\n", kind, order.arrow());
    if entries.is_empty() {
        out.push_str("  (none)\n");
    }
    for entry in entries {
        let selection = if entry.is_unset() && kind.is_file_backed() {
            "(no file)"
        } else if entry.is_unset() {
            "(no port)"
        } else {
            entry.selection.as_str()
        };
        let linked = if entry.linked { "" } else { "  [not on backend]" };
        out.push_str(&format!("  {:>4}  {}{}\n", entry.id.as_u32(), selection, linked));
    }
    out
}

/// Output of `status`
pub fn format_status(snapshot: &LoopSnapshot) -> String {
    let sent = snapshot
        .packets_sent
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "loop {}\n  packets sent {}\n  packets received {}{}\n  interval {} ms, baud {}, mode {} ({}), target {}\n",
        snapshot.phase,
        sent,
        snapshot.received_packets,
        if snapshot.got_data { " (receiving)" } else { "" },
        snapshot.settings.interval_ms,
        snapshot.settings.baud_rate,
        snapshot.settings.mode,
        snapshot.settings.mode.description(),
        snapshot.settings.target.as_deref().unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use uplink_core::{LoopPhase, LoopSettings, Notification, ReconcileSummary};
    use uplink_types::DeviceId;

    use super::*;

    #[test]
    fn test_notification_format() {
        let event = SendingEvent::Notification(Notification {
            title: "Failed to start simulation".to_string(),
            description: "device 0 has no port or file bound".to_string(),
        });
        assert_eq!(
            format_event(&event).as_deref(),
            Some("error: Failed to start simulation: device 0 has no port or file bound")
        );
    }

    #[test]
    fn test_per_packet_updates_not_printed() {
        assert_eq!(
            format_event(&SendingEvent::ReceivedPacketsUpdated { count: 3 }),
            None
        );
        assert_eq!(
            format_event(&SendingEvent::LoopPhaseChanged {
                phase: LoopPhase::Running
            })
            .as_deref(),
            Some("sending loop running")
        );
    }

    #[test]
    fn test_reconcile_format() {
        let event = SendingEvent::DevicesReconciled(ReconcileSummary {
            discovered: vec![DeviceId(5), DeviceId(6)],
            orphaned: vec![DeviceId(1)],
        });
        assert_eq!(
            format_event(&event).as_deref(),
            Some("backend reported new devices 5, 6; backend dropped devices 1")
        );
    }

    #[test]
    fn test_device_table_marks_unset_and_unlinked() {
        let entries = vec![
            DeviceEntry {
                id: DeviceId(0),
                kind: DeviceKind::SerialPort,
                selection: "COM3".to_string(),
                linked: true,
            },
            DeviceEntry {
                id: DeviceId(2),
                kind: DeviceKind::SerialPort,
                selection: String::new(),
                linked: false,
            },
        ];
        let table = format_device_table(DeviceKind::SerialPort, SortOrder::Ascending, &entries);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("COM3"));
        assert!(lines[2].contains("(no port)"));
        assert!(lines[2].ends_with("[not on backend]"));
    }

    #[test]
    fn test_unset_file_device_shows_no_file() {
        let entries = vec![DeviceEntry {
            id: DeviceId(1),
            kind: DeviceKind::File,
            selection: String::new(),
            linked: true,
        }];
        let table = format_device_table(DeviceKind::File, SortOrder::Ascending, &entries);

        assert!(table.lines().nth(1).unwrap().ends_with("(no file)"));
    }

    #[test]
    fn test_status_shows_unobserved_count() {
        let snapshot = LoopSnapshot {
            phase: LoopPhase::Stopped,
            packets_sent: None,
            received_packets: 0,
            got_data: false,
            settings: LoopSettings::default(),
        };
        let status = format_status(&snapshot);

        assert!(status.starts_with("loop stopped\n"));
        assert!(status.contains("packets sent -"));
        assert!(status.contains("interval 500 ms, baud 115200"));
    }
}
