//! Uplink Backend Simulation Library
//!
//! This crate provides a simulated communication backend for exercising the
//! sending core without radios attached. It includes:
//!
//! - **SimBackend**: In-memory device records, port bindings and a sending
//!   loop that enforce hardware-like rules
//! - **SimBackendHandle**: A [`uplink_types::Backend`] implementation that talks
//!   to a [`run_sim_backend`] task over a request channel
//!
//! # Example
//!
//! ```rust
//! use uplink_sim::SimBackend;
//! use uplink_types::{DeviceId, DeviceKind, SendingMode, StartLoopRequest};
//!
//! let mut backend = SimBackend::new();
//! backend.register_device(DeviceId(0), DeviceKind::SerialPort).unwrap();
//! backend.bind_port(DeviceId(0), "COM3", 9600).unwrap();
//!
//! backend
//!     .start_loop(StartLoopRequest {
//!         interval_ms: 500,
//!         resume_count: 42,
//!         mode: SendingMode::FromCsv,
//!         target: DeviceId(0),
//!     })
//!     .unwrap();
//! backend.tick();
//! assert_eq!(backend.loop_status().packets_sent, 43);
//! ```

pub mod backend;
pub mod task;

pub use backend::{SimBackend, SimBackendConfig};
pub use task::{run_sim_backend, spawn_sim_backend, SimBackendHandle, SimRequest};
