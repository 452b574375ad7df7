//! Uplink sending core
//!
//! This crate tracks the communication devices a telemetry uplink emits on and
//! drives a backend sending loop that can be started, stopped and resumed
//! without losing its packet count.
//!
//! # Architecture
//!
//! - [`DeviceRegistry`] keeps the local id → selection view and merges backend
//!   device lists into it without overwriting user edits
//! - [`SendingController`] holds the loop phase and the last counters the
//!   backend reported, and builds [`uplink_types::StartLoopRequest`]s that
//!   resume from them
//! - [`SendingActor`] owns both and serializes every user command and backend
//!   update, issuing backend calls through [`uplink_types::Backend`]
//!
//! Front ends send [`SendingActorCommand`]s and read [`SendingEvent`]s. Backend
//! failures never surface as errors; they arrive as
//! [`SendingEvent::Notification`].
//!
//! # Example
//!
//! ```rust
//! use uplink_core::{DeviceRegistry, SortOrder};
//! use uplink_types::{DeviceId, DeviceKind};
//!
//! let mut registry = DeviceRegistry::new();
//! let a = registry.add_device(DeviceKind::SerialPort).unwrap();
//! let b = registry.add_device(DeviceKind::SerialPort).unwrap();
//! registry.update_selection(a, "COM3");
//!
//! let listed: Vec<DeviceId> = registry
//!     .list_by_kind(DeviceKind::SerialPort, SortOrder::Descending)
//!     .iter()
//!     .map(|e| e.id)
//!     .collect();
//! assert_eq!(listed, vec![b, a]);
//! ```

pub mod actor;
pub mod controller;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;

// Re-export actor types
pub use actor::{run_sending_actor, SendingActor, SendingActorCommand};

pub use controller::{LoopPhase, LoopSettings, LoopSnapshot, SendingController};
pub use error::SendingError;
pub use events::{Notification, SendingEvent};
pub use policy::{IgnoreStopFailure, ReportStopFailure, StopFailurePolicy, StopPolicy};
pub use registry::{DeviceEntry, DeviceRegistry, ReconcileSummary, SortOrder};
