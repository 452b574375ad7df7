//! Uplink shared types
//!
//! This crate holds the vocabulary shared between the sending core and the
//! backends it drives:
//!
//! - **Devices**: locally assigned [`DeviceId`]s and the [`DeviceKind`] of
//!   each communication channel
//! - **Sending loop**: [`SendingMode`], [`LoopStatus`] and the
//!   [`StartLoopRequest`] issued to start or resume emission
//! - **Backend seam**: the [`Backend`] trait and the [`BackendUpdate`] values a
//!   backend pushes back asynchronously
//!
//! # Example
//!
//! ```rust
//! use uplink_types::{
//!     coerce_baud_rate, coerce_interval_ms, parse_target_device, DeviceId, DeviceKind,
//! };
//!
//! let kind: DeviceKind = "teledongle".parse().unwrap();
//! assert_eq!(kind, DeviceKind::TeleDongle);
//!
//! assert_eq!(coerce_interval_ms(""), 500);
//! assert_eq!(coerce_baud_rate("9600"), 9600);
//! assert_eq!(parse_target_device(Some("3")), DeviceId(3));
//! assert_eq!(parse_target_device(None), DeviceId(0));
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod input;
pub mod sending;

pub use backend::{Backend, BackendUpdate};
pub use device::{BackendDevice, DeviceId, DeviceKind, ParseKindError};
pub use error::BackendError;
pub use input::{coerce_baud_rate, coerce_interval_ms, parse_target_device};
pub use sending::{
    LoopStatus, ParseModeError, SendingMode, StartLoopRequest, COMMON_BAUD_RATES,
    DEFAULT_BAUD_RATE, DEFAULT_INTERVAL_MS,
};
