//! Delivery-round progression: the driver's walk from the round list through
//! the truck inventory, navigation and barcode-confirmed drop-offs.
//!
//! [`RoundController`] is a pure state machine. It never performs I/O; every
//! side effect leaves it as a [`Command`] and every driver-facing prompt as a
//! [`Notification`]. [`RoundSession`] executes those commands on tokio.

pub mod controller;
pub mod events;
pub mod permission;
pub mod session;

pub use controller::{
    ProgressSnapshot, RoundController, RoundProgress, ScanTarget, Screen, ScreenKind, StopVisit,
    DEFAULT_SCAN_COOLDOWN,
};
pub use events::{Command, DataKind, LockToken, Notification, PermissionStatus, ScanEvent, Step};
pub use permission::{PermissionGate, StaticPermissionGate};
pub use session::{
    DriverInput, RoundSession, SessionConfig, SessionOutputs, DEFAULT_VALIDATION_RETRY_DELAY,
};
