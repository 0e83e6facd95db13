//! Tokio runtime around [`RoundController`]: fetches data, asks for camera
//! access, runs cooldown timers and the fire-and-forget validation writes.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use client_core::RoundDataProvider;
use shared::domain::{RoundId, RoundListing, StopId};
use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle, JoinSet},
    time::sleep,
};
use tracing::{debug, error, warn};

use crate::{
    controller::{ProgressSnapshot, RoundController, ScreenKind, DEFAULT_SCAN_COOLDOWN},
    events::{Command, LockToken, Notification, ScanEvent, Step},
    permission::PermissionGate,
};

pub const DEFAULT_VALIDATION_RETRY_DELAY: Duration = Duration::from_secs(2);
/// First try plus one retry.
const VALIDATION_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub scan_cooldown: Duration,
    pub validation_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_cooldown: DEFAULT_SCAN_COOLDOWN,
            validation_retry_delay: DEFAULT_VALIDATION_RETRY_DELAY,
        }
    }
}

/// Driver actions and scanner reads, processed one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverInput {
    RefreshRounds,
    SelectRound(RoundId),
    BeginNavigation,
    RequestLocationScan,
    Scan(ScanEvent),
    GoBack,
}

pub struct SessionOutputs {
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub snapshots: watch::Receiver<ProgressSnapshot>,
    pub listings: watch::Receiver<RoundListing>,
}

pub struct RoundSession {
    controller: RoundController,
    provider: Arc<dyn RoundDataProvider>,
    permissions: Arc<dyn PermissionGate>,
    retry_delay: Duration,
    notifications: mpsc::UnboundedSender<Notification>,
    snapshots: watch::Sender<ProgressSnapshot>,
    listings: watch::Sender<RoundListing>,
    cooldown: Option<(LockToken, JoinHandle<()>)>,
    timer_tx: mpsc::UnboundedSender<LockToken>,
    timer_rx: mpsc::UnboundedReceiver<LockToken>,
    writes: JoinSet<()>,
}

impl RoundSession {
    pub fn new(
        provider: Arc<dyn RoundDataProvider>,
        permissions: Arc<dyn PermissionGate>,
        config: SessionConfig,
    ) -> (Self, SessionOutputs) {
        let controller = RoundController::new(config.scan_cooldown);
        let (notifications, notifications_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(controller.snapshot());
        let (listings, listings_rx) = watch::channel(controller.listing().clone());
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let session = Self {
            controller,
            provider,
            permissions,
            retry_delay: config.validation_retry_delay,
            notifications,
            snapshots,
            listings,
            cooldown: None,
            timer_tx,
            timer_rx,
            writes: JoinSet::new(),
        };
        (
            session,
            SessionOutputs {
                notifications: notifications_rx,
                snapshots: snapshots_rx,
                listings: listings_rx,
            },
        )
    }

    pub fn controller(&self) -> &RoundController {
        &self.controller
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.controller.snapshot()
    }

    /// Processes one input to completion, including any data fetch it needs.
    pub async fn handle(&mut self, input: DriverInput) {
        let step = match input {
            DriverInput::RefreshRounds => {
                let fetched = self.provider.list_rounds().await;
                self.controller.load_rounds(fetched)
            }
            DriverInput::SelectRound(round_id) => {
                if self.controller.selectable_round(round_id).is_some() {
                    let stops = self.provider.list_stops(round_id).await;
                    self.controller.select_round(round_id, stops)
                } else {
                    debug!(round_id = round_id.0, "round selection ignored");
                    Step::ignored()
                }
            }
            DriverInput::BeginNavigation => self.controller.begin_navigation(),
            DriverInput::RequestLocationScan => {
                if self.controller.screen().kind() == ScreenKind::Navigating {
                    let granted =
                        self.permissions.is_granted() || self.permissions.request().await;
                    self.controller.request_location_scan(granted.into())
                } else {
                    Step::ignored()
                }
            }
            DriverInput::Scan(scan) => self.controller.on_scan_event(&scan),
            DriverInput::GoBack => self.controller.go_back(),
        };
        self.apply(step);
    }

    /// Feeds a fired cooldown back to the controller.
    pub fn cooldown_elapsed(&mut self, token: LockToken) {
        if matches!(self.cooldown, Some((armed, _)) if armed == token) {
            self.cooldown = None;
        }
        let step = self.controller.cooldown_elapsed(token);
        if !step.applied {
            debug!(token = token.0, "stale cooldown release ignored");
        }
        self.apply(step);
    }

    /// Waits for the next cooldown timer to fire.
    pub async fn next_cooldown(&mut self) -> Option<LockToken> {
        self.timer_rx.recv().await
    }

    /// Waits until every pending validation write has finished (or given up).
    pub async fn flush_writes(&mut self) {
        while let Some(joined) = self.writes.join_next().await {
            log_write_outcome(joined);
        }
    }

    /// Validation writes still in flight.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    fn reap_writes(&mut self) {
        while let Some(joined) = self.writes.try_join_next() {
            log_write_outcome(joined);
        }
    }

    /// Event loop: driver inputs and cooldown releases, one at a time, until
    /// the input channel closes.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<DriverInput>) {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle(input).await,
                    None => break,
                },
                Some(token) = self.timer_rx.recv() => self.cooldown_elapsed(token),
            }
        }
        self.cancel_cooldown();
        self.flush_writes().await;
    }

    fn apply(&mut self, step: Step) {
        self.reap_writes();
        for command in step.commands {
            debug!(command = command.name(), "executing controller command");
            match command {
                Command::MarkStopValidated {
                    stop_id,
                    validated_at,
                } => {
                    self.writes.spawn(record_validation(
                        self.provider.clone(),
                        stop_id,
                        validated_at,
                        self.retry_delay,
                    ));
                }
                Command::ArmScanCooldown { token, after } => {
                    self.cancel_cooldown();
                    let timer_tx = self.timer_tx.clone();
                    let handle = tokio::spawn(async move {
                        sleep(after).await;
                        let _ = timer_tx.send(token);
                    });
                    self.cooldown = Some((token, handle));
                }
                Command::CancelScanCooldown { token } => {
                    if matches!(self.cooldown, Some((armed, _)) if armed == token) {
                        self.cancel_cooldown();
                    }
                }
            }
        }

        for notification in step.notifications {
            if self.notifications.send(notification).is_err() {
                debug!("notification receiver dropped");
            }
        }
        let snapshot = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        let listing = self.controller.listing();
        self.listings.send_if_modified(|current| {
            if current == listing {
                return false;
            }
            *current = listing.clone();
            true
        });
    }

    fn cancel_cooldown(&mut self) {
        if let Some((token, handle)) = self.cooldown.take() {
            handle.abort();
            debug!(token = token.0, "scan cooldown cancelled");
        }
    }
}

fn log_write_outcome(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        warn!(error = %err, "validation write task failed");
    }
}

async fn record_validation(
    provider: Arc<dyn RoundDataProvider>,
    stop_id: StopId,
    validated_at: DateTime<Utc>,
    retry_delay: Duration,
) {
    for attempt in 1..=VALIDATION_ATTEMPTS {
        match provider.mark_stop_validated(stop_id, validated_at).await {
            Ok(()) => {
                debug!(stop_id = stop_id.0, attempt, "stop validation written");
                return;
            }
            Err(err) if attempt < VALIDATION_ATTEMPTS => {
                warn!(stop_id = stop_id.0, attempt, error = %err, "stop validation failed, retrying");
                sleep(retry_delay).await;
            }
            Err(err) => {
                error!(stop_id = stop_id.0, attempt, error = %err, "stop validation abandoned");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
