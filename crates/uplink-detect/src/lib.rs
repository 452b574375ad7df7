//! Serial port discovery
//!
//! Lists the serial ports present on the host so they can be offered as bind
//! candidates for device selections.
//!
//! # Example
//!
//! ```rust,no_run
//! use uplink_detect::PortScanner;
//!
//! let scanner = PortScanner::new();
//! for port in scanner.enumerate_ports().unwrap() {
//!     println!("{}", port.display_label());
//! }
//! ```

pub mod error;
pub mod scanner;

pub use error::DetectError;
pub use scanner::{PortScanner, SerialPortInfo};
