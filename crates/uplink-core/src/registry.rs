//! Device registry
//!
//! Holds the local view of device id → user selection. The backend decides
//! which ids exist; the user owns the selection text. [`DeviceRegistry::reconcile`]
//! merges a backend device list field by field so neither side clobbers the
//! other.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uplink_types::{BackendDevice, DeviceId, DeviceKind};

/// A locally tracked device and the port or path the user picked for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Unique id, never reused
    pub id: DeviceId,
    /// Channel kind
    pub kind: DeviceKind,
    /// Port name or file path; empty when unset
    pub selection: String,
    /// Whether the last backend device list contained this id
    pub linked: bool,
}

impl DeviceEntry {
    fn new(id: DeviceId, kind: DeviceKind, selection: String) -> Self {
        Self {
            id,
            kind,
            selection,
            linked: false,
        }
    }

    /// Check if the user has not chosen a port or path yet
    pub fn is_unset(&self) -> bool {
        self.selection.is_empty()
    }
}

/// Display order for per-kind device lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Lowest id first
    #[default]
    Ascending,
    /// Highest id first
    Descending,
}

impl SortOrder {
    /// The opposite order
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    /// Arrow shown next to a column heading
    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "↑",
            SortOrder::Descending => "↓",
        }
    }
}

/// Outcome of merging a backend device list into the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Ids the backend reported that had no local entry
    pub discovered: Vec<DeviceId>,
    /// Local ids the backend no longer reports
    pub orphaned: Vec<DeviceId>,
}

impl ReconcileSummary {
    /// Check if the merge changed which entries are linked
    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty() && self.orphaned.is_empty()
    }
}

/// Ordered set of device entries plus the id counter that feeds it
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    entries: Vec<DeviceEntry>,
    // Wider than the id so the counter can step past u32::MAX
    next_id: u64,
}

impl DeviceRegistry {
    /// Create an empty registry whose first id is 0
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` once every id has been handed out
    fn allocate_id(&mut self) -> Option<DeviceId> {
        let id = u32::try_from(self.next_id).ok()?;
        self.next_id += 1;
        Some(DeviceId(id))
    }

    /// Append a device of `kind` with an empty selection
    ///
    /// Returns `None` without adding anything when the id space is exhausted.
    pub fn add_device(&mut self, kind: DeviceKind) -> Option<DeviceId> {
        let Some(id) = self.allocate_id() else {
            warn!("No device ids left, {} device not added", kind);
            return None;
        };
        self.entries.push(DeviceEntry::new(id, kind, String::new()));
        debug!("Added {} device {}", kind, id);
        Some(id)
    }

    /// Append one file-backed entry per path, in input order
    ///
    /// Returns the allocated ids paired with their paths so the caller can
    /// register each with the backend in the same order. Paths past the point
    /// where the id space runs out are not added.
    pub fn add_path_entries<I, S>(&mut self, paths: I) -> Vec<(DeviceId, String)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for path in paths {
            let path = path.into();
            let Some(id) = self.allocate_id() else {
                warn!("No device ids left, file device for {} not added", path);
                break;
            };
            self.entries
                .push(DeviceEntry::new(id, DeviceKind::File, path.clone()));
            debug!("Added file device {} for {}", id, path);
            added.push((id, path));
        }
        added
    }

    /// Replace the selection of `id`; returns false if no entry has that id
    pub fn update_selection(&mut self, id: DeviceId, selection: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.selection = selection.into();
                true
            }
            None => false,
        }
    }

    /// Remove the entry with `id`, if present
    pub fn remove(&mut self, id: DeviceId) -> Option<DeviceEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Look up an entry by id
    pub fn get(&self, id: DeviceId) -> Option<&DeviceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Check if an entry with `id` exists
    pub fn contains(&self, id: DeviceId) -> bool {
        self.get(id).is_some()
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[DeviceEntry] {
        &self.entries
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no live entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one kind sorted by id
    pub fn list_by_kind(&self, kind: DeviceKind, order: SortOrder) -> Vec<&DeviceEntry> {
        let mut view: Vec<_> = self.entries.iter().filter(|e| e.kind == kind).collect();
        match order {
            SortOrder::Ascending => view.sort_by_key(|e| e.id),
            SortOrder::Descending => view.sort_by(|a, b| b.id.cmp(&a.id)),
        }
        view
    }

    /// Merge a backend device list into the local entries
    ///
    /// Backend records update `kind` and `linked` only. Unknown ids are
    /// appended, seeded with the backend's port text when it sends one.
    /// Local entries missing from the list stay but are marked unlinked.
    pub fn reconcile(&mut self, devices: &[BackendDevice]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let reported: HashSet<DeviceId> = devices.iter().map(|d| d.id).collect();

        for entry in &mut self.entries {
            let linked = reported.contains(&entry.id);
            if entry.linked && !linked {
                summary.orphaned.push(entry.id);
            }
            entry.linked = linked;
        }

        for device in devices {
            match self.entries.iter_mut().find(|e| e.id == device.id) {
                Some(entry) => entry.kind = device.kind,
                None => {
                    let mut entry = DeviceEntry::new(
                        device.id,
                        device.kind,
                        device.port.clone().unwrap_or_default(),
                    );
                    entry.linked = true;
                    self.entries.push(entry);
                    summary.discovered.push(device.id);
                }
            }
            // Never hand out an id the backend already uses
            self.next_id = self.next_id.max(u64::from(device.id.0) + 1);
        }

        summary
    }
}
