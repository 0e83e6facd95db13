//! Inputs consumed and outputs emitted by the round controller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::domain::{RoundId, StopId};

/// One decoded barcode read. The payload is carried for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub payload: String,
    pub scanned_at: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(payload: impl Into<String>, scanned_at: DateTime<Utc>) -> Self {
        Self {
            payload: payload.into(),
            scanned_at,
        }
    }

    pub fn now(payload: impl Into<String>) -> Self {
        Self::new(payload, Utc::now())
    }
}

/// Identifies one scan cooldown. A release carrying any other token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl From<bool> for PermissionStatus {
    fn from(granted: bool) -> Self {
        if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}

/// Side effects requested by the controller, executed by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fire-and-forget write of the stop's arrival time.
    MarkStopValidated {
        stop_id: StopId,
        validated_at: DateTime<Utc>,
    },
    /// Deliver `cooldown_elapsed(token)` once `after` has passed.
    ArmScanCooldown { token: LockToken, after: Duration },
    CancelScanCooldown { token: LockToken },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::MarkStopValidated { .. } => "mark_stop_validated",
            Command::ArmScanCooldown { .. } => "arm_scan_cooldown",
            Command::CancelScanCooldown { .. } => "cancel_scan_cooldown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Rounds,
    Stops,
}

/// Driver-facing prompts. Rendering is left to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Live data could not be fetched; a canned dataset is shown instead.
    ConnectivityError { data: DataKind, message: String },
    /// The backend answered but the data was unusable; nothing changed.
    FetchFailed { data: DataKind, message: String },
    EmptyItinerary { round_id: RoundId },
    ArrivalConfirmed { location: String },
    /// `next` is `None` when the completed stop was the last of the round.
    StopComplete {
        completed: String,
        next: Option<String>,
    },
    RoundComplete { round: String },
    PermissionDenied,
}

/// Result of feeding one input to the controller.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub applied: bool,
    pub commands: Vec<Command>,
    pub notifications: Vec<Notification>,
}

impl Step {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn applied() -> Self {
        Self {
            applied: true,
            ..Self::default()
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn notify(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }
}
