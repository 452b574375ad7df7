//! What to do when the backend reports a failed stop
//!
//! Stopping is always effective locally. The policy only decides whether a
//! failed stop call is surfaced to the user.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uplink_types::BackendError;

use crate::error::SendingError;

/// Decides how a stop call outcome is reported
pub trait StopPolicy: Send + Sync + 'static {
    /// Returns an error to surface, or `None` to stay silent
    fn on_stop(&self, result: Result<(), BackendError>) -> Option<SendingError>;
}

/// Treat every stop as successful; failures are only logged at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreStopFailure;

impl StopPolicy for IgnoreStopFailure {
    fn on_stop(&self, result: Result<(), BackendError>) -> Option<SendingError> {
        if let Err(e) = result {
            debug!("Ignoring stop failure: {}", e);
        }
        None
    }
}

/// Surface stop failures as notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStopFailure;

impl StopPolicy for ReportStopFailure {
    fn on_stop(&self, result: Result<(), BackendError>) -> Option<SendingError> {
        match result {
            Ok(()) => None,
            Err(e) => {
                warn!("Sending loop stop failed: {}", e);
                Some(SendingError::Stop(e))
            }
        }
    }
}

/// Serializable choice of stop policy for settings files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopFailurePolicy {
    /// [`IgnoreStopFailure`]
    #[default]
    Ignore,
    /// [`ReportStopFailure`]
    Report,
}

impl StopFailurePolicy {
    /// Build the policy object
    pub fn build(self) -> Box<dyn StopPolicy> {
        match self {
            StopFailurePolicy::Ignore => Box::new(IgnoreStopFailure),
            StopFailurePolicy::Report => Box::new(ReportStopFailure),
        }
    }
}
