//! Round progression state machine.
//!
//! ```text
//! RoundList    -> RoundSummary   select_round
//! RoundSummary -> Navigating     begin_navigation
//! Navigating   -> Scanning       request_location_scan (granted)
//! Scanning     -> Scanning       on_scan_event (location confirmed / basket counted)
//! Scanning     -> Navigating     on_scan_event (stop complete, more stops) | go_back
//! Scanning     -> RoundList      on_scan_event (last stop complete)
//! RoundSummary -> RoundList      go_back
//! ```
//!
//! The scan lock belongs to the controller rather than to a screen: a lock
//! armed by the scan that completes a stop still holds when the driver
//! reopens the scanner at the next stop. Only `go_back` or its own release
//! clears it.

use std::{mem, time::Duration};

use client_core::ClientError;
use shared::domain::{
    DataSource, InventorySummary, Itinerary, Round, RoundId, RoundListing, Stop,
};
use tracing::{debug, info, warn};

use crate::events::{
    Command, DataKind, LockToken, Notification, PermissionStatus, ScanEvent, Step,
};

pub const DEFAULT_SCAN_COOLDOWN: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanTarget {
    #[default]
    Location,
    Basket,
}

/// Progress at the active stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopVisit {
    AwaitingLocation,
    CountingBaskets { scanned: u32 },
}

impl StopVisit {
    pub fn target(self) -> ScanTarget {
        match self {
            StopVisit::AwaitingLocation => ScanTarget::Location,
            StopVisit::CountingBaskets { .. } => ScanTarget::Basket,
        }
    }

    pub fn baskets_scanned(self) -> u32 {
        match self {
            StopVisit::AwaitingLocation => 0,
            StopVisit::CountingBaskets { scanned } => scanned,
        }
    }
}

/// State owned for the duration of one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundProgress {
    round: Round,
    itinerary: Itinerary,
    inventory: InventorySummary,
    stop_index: usize,
    visit: StopVisit,
}

impl RoundProgress {
    fn new(round: Round, itinerary: Itinerary) -> Self {
        let inventory = InventorySummary::from_itinerary(&itinerary);
        Self {
            round,
            itinerary,
            inventory,
            stop_index: 0,
            visit: StopVisit::AwaitingLocation,
        }
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    pub fn inventory(&self) -> InventorySummary {
        self.inventory
    }

    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    pub fn visit(&self) -> StopVisit {
        self.visit
    }

    pub fn current_stop(&self) -> Option<&Stop> {
        self.itinerary.get(self.stop_index)
    }

    fn is_last_stop(&self) -> bool {
        self.stop_index + 1 >= self.itinerary.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    RoundList,
    RoundSummary(RoundProgress),
    Navigating(RoundProgress),
    Scanning(RoundProgress),
}

impl Screen {
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::RoundList => ScreenKind::RoundList,
            Screen::RoundSummary(_) => ScreenKind::RoundSummary,
            Screen::Navigating(_) => ScreenKind::Navigating,
            Screen::Scanning(_) => ScreenKind::Scanning,
        }
    }

    pub fn progress(&self) -> Option<&RoundProgress> {
        match self {
            Screen::RoundList => None,
            Screen::RoundSummary(progress)
            | Screen::Navigating(progress)
            | Screen::Scanning(progress) => Some(progress),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScreenKind {
    #[default]
    RoundList,
    RoundSummary,
    Navigating,
    Scanning,
}

/// Flat, read-only view of the controller for rendering and assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub screen: ScreenKind,
    pub round_id: Option<RoundId>,
    pub stop_index: usize,
    pub stop_count: usize,
    pub scan_target: ScanTarget,
    pub baskets_scanned: u32,
    pub expected_baskets: u32,
    pub scan_locked: bool,
    pub source: Option<DataSource>,
    pub current_location: Option<String>,
    pub scan_prompt: Option<String>,
    pub inventory: Option<InventorySummary>,
}

pub struct RoundController {
    cooldown: Duration,
    listing: RoundListing,
    screen: Screen,
    lock: Option<LockToken>,
    next_token: u64,
}

impl Default for RoundController {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_COOLDOWN)
    }
}

impl RoundController {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            listing: RoundListing::default(),
            screen: Screen::RoundList,
            lock: None,
            next_token: 0,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn listing(&self) -> &RoundListing {
        &self.listing
    }

    pub fn progress(&self) -> Option<&RoundProgress> {
        self.screen.progress()
    }

    pub fn scan_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let Some(progress) = self.progress() else {
            return ProgressSnapshot::default();
        };
        ProgressSnapshot {
            screen: self.screen.kind(),
            round_id: Some(progress.round.id),
            stop_index: progress.stop_index,
            stop_count: progress.itinerary.len(),
            scan_target: progress.visit.target(),
            baskets_scanned: progress.visit.baskets_scanned(),
            expected_baskets: progress
                .current_stop()
                .map(Stop::expected_baskets)
                .unwrap_or_default(),
            scan_locked: self.scan_locked(),
            source: Some(progress.itinerary.source),
            current_location: progress.current_stop().map(|stop| stop.location.clone()),
            scan_prompt: self.scan_prompt(),
            inventory: Some(progress.inventory),
        }
    }

    /// Overlay text shown on the scanner.
    pub fn scan_prompt(&self) -> Option<String> {
        let Screen::Scanning(progress) = &self.screen else {
            return None;
        };
        let stop = progress.current_stop()?;
        Some(match progress.visit {
            StopVisit::AwaitingLocation => format!("Scan the location: {}", stop.location),
            StopVisit::CountingBaskets { scanned } => {
                format!("Basket {}/{}", scanned + 1, stop.expected_baskets())
            }
        })
    }

    /// Replaces the round catalog. On a connectivity failure the current live
    /// catalog is kept; without one the canned fallback catalog is shown. Any
    /// other failure leaves the catalog untouched.
    pub fn load_rounds(&mut self, fetched: Result<Vec<Round>, ClientError>) -> Step {
        match fetched {
            Ok(rounds) => {
                info!(count = rounds.len(), "round list loaded");
                self.listing = RoundListing::live(rounds);
                Step::applied()
            }
            Err(err) if err.is_connectivity() => {
                warn!(error = %err, "round list unreachable");
                if self.listing.rounds.is_empty() {
                    self.listing = RoundListing::fallback();
                }
                Step::applied().notify(Notification::ConnectivityError {
                    data: DataKind::Rounds,
                    message: err.to_string(),
                })
            }
            Err(err) => {
                warn!(error = %err, "round list rejected");
                Step::ignored().notify(Notification::FetchFailed {
                    data: DataKind::Rounds,
                    message: err.to_string(),
                })
            }
        }
    }

    /// The round that `select_round` would open, if selection is possible now.
    pub fn selectable_round(&self, round_id: RoundId) -> Option<&Round> {
        match self.screen {
            Screen::RoundList => self.listing.find(round_id),
            _ => None,
        }
    }

    /// Opens `round_id` with the outcome of its stop fetch.
    ///
    /// An unreachable backend substitutes the single-stop fallback itinerary;
    /// an empty live result is kept as is. Other failures keep the driver on
    /// the round list.
    pub fn select_round(
        &mut self,
        round_id: RoundId,
        stops: Result<Vec<Stop>, ClientError>,
    ) -> Step {
        let Some(round) = self.selectable_round(round_id).cloned() else {
            debug!(round_id = round_id.0, "round not selectable");
            return Step::ignored();
        };

        let mut step = Step::applied();
        let itinerary = match stops {
            Ok(stops) => {
                if stops.is_empty() {
                    step = step.notify(Notification::EmptyItinerary { round_id });
                }
                Itinerary::live(stops)
            }
            Err(err) if !err.is_connectivity() => {
                warn!(round_id = round_id.0, error = %err, "stop list rejected");
                return Step::ignored().notify(Notification::FetchFailed {
                    data: DataKind::Stops,
                    message: err.to_string(),
                });
            }
            Err(err) => {
                warn!(
                    round_id = round_id.0,
                    error = %err,
                    "stop list unavailable, using fallback itinerary"
                );
                step = step.notify(Notification::ConnectivityError {
                    data: DataKind::Stops,
                    message: err.to_string(),
                });
                Itinerary::fallback(round_id)
            }
        };

        info!(
            round_id = round_id.0,
            stops = itinerary.len(),
            fallback = itinerary.source.is_fallback(),
            "round selected"
        );
        self.screen = Screen::RoundSummary(RoundProgress::new(round, itinerary));
        step
    }

    pub fn begin_navigation(&mut self) -> Step {
        match mem::replace(&mut self.screen, Screen::RoundList) {
            Screen::RoundSummary(progress) if !progress.itinerary.is_empty() => {
                self.screen = Screen::Navigating(progress);
                Step::applied()
            }
            scanning @ Screen::Scanning(_) => {
                self.screen = scanning;
                self.go_back()
            }
            other => {
                self.screen = other;
                Step::ignored()
            }
        }
    }

    /// Opens the scanner for the active stop once camera access is settled.
    pub fn request_location_scan(&mut self, permission: PermissionStatus) -> Step {
        let Screen::Navigating(_) = self.screen else {
            return Step::ignored();
        };
        if permission == PermissionStatus::Denied {
            return Step::ignored().notify(Notification::PermissionDenied);
        }
        if let Screen::Navigating(progress) = mem::replace(&mut self.screen, Screen::RoundList) {
            self.screen = Screen::Scanning(progress);
        }
        Step::applied()
    }

    /// Core scan handling. Reads outside Scanning or inside a cooldown are dropped.
    pub fn on_scan_event(&mut self, scan: &ScanEvent) -> Step {
        if let Some(active) = self.lock {
            debug!(payload = %scan.payload, token = active.0, "scan dropped during cooldown");
            return Step::ignored();
        }
        let Screen::Scanning(progress) = &mut self.screen else {
            debug!(payload = %scan.payload, "scan outside scanner dropped");
            return Step::ignored();
        };
        let Some(stop) = progress.itinerary.stops.get_mut(progress.stop_index) else {
            return Step::ignored();
        };

        match progress.visit {
            StopVisit::AwaitingLocation => {
                stop.validated_at = Some(scan.scanned_at);
                let mut step = Step::applied().notify(Notification::ArrivalConfirmed {
                    location: stop.location.clone(),
                });
                if progress.itinerary.source == DataSource::Live {
                    step = step.command(Command::MarkStopValidated {
                        stop_id: stop.id,
                        validated_at: scan.scanned_at,
                    });
                }
                info!(stop_id = stop.id.0, payload = %scan.payload, "arrival confirmed");
                progress.visit = StopVisit::CountingBaskets { scanned: 0 };
                self.arm_cooldown(step)
            }
            StopVisit::CountingBaskets { scanned } if scanned + 1 < stop.expected_baskets() => {
                progress.visit = StopVisit::CountingBaskets {
                    scanned: scanned + 1,
                };
                debug!(stop_id = stop.id.0, scanned = scanned + 1, "basket counted");
                self.arm_cooldown(Step::applied())
            }
            StopVisit::CountingBaskets { .. } => self.complete_stop(),
        }
    }

    /// Releases the scan lock armed under `token`. Stale tokens are ignored.
    pub fn cooldown_elapsed(&mut self, token: LockToken) -> Step {
        if self.lock != Some(token) {
            return Step::ignored();
        }
        self.lock = None;
        Step::applied()
    }

    pub fn go_back(&mut self) -> Step {
        match mem::replace(&mut self.screen, Screen::RoundList) {
            Screen::RoundSummary(progress) => {
                info!(round_id = progress.round.id.0, "round closed");
                Step::applied()
            }
            Screen::Scanning(progress) => {
                self.screen = Screen::Navigating(progress);
                let step = Step::applied();
                match self.lock.take() {
                    Some(token) => step.command(Command::CancelScanCooldown { token }),
                    None => step,
                }
            }
            other => {
                self.screen = other;
                Step::ignored()
            }
        }
    }

    fn arm_cooldown(&mut self, step: Step) -> Step {
        self.next_token += 1;
        let token = LockToken(self.next_token);
        self.lock = Some(token);
        step.command(Command::ArmScanCooldown {
            token,
            after: self.cooldown,
        })
    }

    fn complete_stop(&mut self) -> Step {
        let Screen::Scanning(mut progress) = mem::replace(&mut self.screen, Screen::RoundList)
        else {
            return Step::ignored();
        };
        let completed = progress
            .current_stop()
            .map(|stop| stop.location.clone())
            .unwrap_or_default();

        if progress.is_last_stop() {
            self.lock = None;
            info!(round_id = progress.round.id.0, "round complete");
            return Step::applied()
                .notify(Notification::StopComplete {
                    completed,
                    next: None,
                })
                .notify(Notification::RoundComplete {
                    round: progress.round.name,
                });
        }

        progress.stop_index += 1;
        progress.visit = StopVisit::AwaitingLocation;
        let next = progress.current_stop().map(|stop| stop.location.clone());
        info!(
            round_id = progress.round.id.0,
            stop_index = progress.stop_index,
            "stop complete"
        );
        self.screen = Screen::Navigating(progress);
        self.arm_cooldown(Step::applied().notify(Notification::StopComplete { completed, next }))
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
