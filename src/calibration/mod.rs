//! Display calibration tracking
//!
//! Calibration records arrive from an external discovery layer and are kept
//! in a shared [`CalibrationRegistry`]. Cameras, quilt resolution and viewport
//! sync all read from it.

pub mod discovery;
pub mod record;
pub mod registry;

pub use discovery::{CalibrationDiscovery, DirectoryDiscovery};
pub use record::{CalibrationLoadError, CalibrationRecord};
pub use registry::{
    CalibrationRegistry, CalibrationSnapshot, ChangeHandler, SubscriptionId, WaitCancelled,
    DEFAULT_POLL_INTERVAL,
};
