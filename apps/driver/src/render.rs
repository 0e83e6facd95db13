use round_controller::{DataKind, Notification, ProgressSnapshot, ScreenKind};
use shared::domain::{DataSource, RoundListing};

pub fn notification(notification: &Notification) -> String {
    match notification {
        Notification::ConnectivityError { data, message } => format!(
            "! could not load {} ({message}), showing offline data",
            data_name(*data)
        ),
        Notification::FetchFailed { data, message } => {
            format!("! {} rejected by the server: {message}", data_name(*data))
        }
        Notification::EmptyItinerary { round_id } => {
            format!("! round {round_id} has no stops")
        }
        Notification::ArrivalConfirmed { location } => format!("arrived at {location}"),
        Notification::StopComplete {
            completed,
            next: Some(next),
        } => format!("{completed} done, next stop: {next}"),
        Notification::StopComplete {
            completed,
            next: None,
        } => format!("{completed} done"),
        Notification::RoundComplete { round } => format!("round {round} complete"),
        Notification::PermissionDenied => "! camera access denied".to_string(),
    }
}

fn data_name(data: DataKind) -> &'static str {
    match data {
        DataKind::Rounds => "rounds",
        DataKind::Stops => "stops",
    }
}

pub fn listing(listing: &RoundListing) -> String {
    let mut out = String::from("rounds:");
    if listing.source == DataSource::Fallback {
        out.push_str(" (offline)");
    }
    for round in &listing.rounds {
        out.push_str(&format!("\n  [{}] {} {}", round.id, round.name, round.color));
    }
    out
}

pub fn snapshot(snapshot: &ProgressSnapshot) -> String {
    let Some(round_id) = snapshot.round_id else {
        return "no round in progress, use 'select <id>'".to_string();
    };
    let mut out = format!(
        "{:?} round {round_id}, stop {}/{}",
        snapshot.screen,
        snapshot.stop_index + 1,
        snapshot.stop_count
    );
    if let Some(location) = &snapshot.current_location {
        out.push_str(&format!(" ({location})"));
    }
    if snapshot.source == Some(DataSource::Fallback) {
        out.push_str(" [offline]");
    }
    if let (ScreenKind::RoundSummary, Some(inventory)) = (snapshot.screen, snapshot.inventory) {
        out.push_str(&format!(
            "\n  {} stops, {} baskets, largest drop {}",
            inventory.stop_count, inventory.total_baskets, inventory.largest_drop
        ));
    }
    if let Some(prompt) = &snapshot.scan_prompt {
        out.push_str(&format!("\n  {prompt}"));
        if snapshot.scan_locked {
            out.push_str(" (wait)");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{InventorySummary, RoundId};

    #[test]
    fn last_stop_has_no_next_hint() {
        let text = notification(&Notification::StopComplete {
            completed: "Mairie".into(),
            next: None,
        });
        assert_eq!(text, "Mairie done");
    }

    #[test]
    fn summary_shows_inventory() {
        let text = snapshot(&ProgressSnapshot {
            screen: ScreenKind::RoundSummary,
            round_id: Some(RoundId(1)),
            stop_count: 2,
            current_location: Some("Mairie de Charmes".into()),
            inventory: Some(InventorySummary {
                stop_count: 2,
                total_baskets: 7,
                largest_drop: 5,
            }),
            ..ProgressSnapshot::default()
        });
        assert!(text.starts_with("RoundSummary round 1, stop 1/2 (Mairie de Charmes)"));
        assert!(text.contains("2 stops, 7 baskets, largest drop 5"));
    }

    #[test]
    fn idle_snapshot() {
        assert!(snapshot(&ProgressSnapshot::default()).starts_with("no round"));
    }
}
