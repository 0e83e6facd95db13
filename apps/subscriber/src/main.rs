mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use client_core::PostgrestClient;
use shared::domain::{DashboardStats, DeliveryRecord, LatestBasket, Member};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Show a subscriber's deliveries and latest basket")]
struct Args {
    #[arg(long)]
    email: String,
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config);
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    let client = PostgrestClient::with_timeout(&settings.api_base_url, settings.request_timeout())
        .context("failed to build the API client")?;

    let member = client
        .login(&args.email)
        .await
        .with_context(|| format!("login failed for {}", args.email))?;
    info!(member_id = member.id.0, "signed in");

    let (stats, history, latest) = tokio::try_join!(
        client.dashboard_stats(member.id),
        client.delivery_history(member.id),
        client.latest_basket(member.id),
    )
    .context("failed to load deliveries")?;

    println!("{}", dashboard(&member, &stats));
    println!("{}", history_table(&history));
    println!("{}", basket(latest.as_ref()));
    Ok(())
}

fn day(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn dashboard(member: &Member, stats: &DashboardStats) -> String {
    let last = match (&stats.last_product_name, stats.last_delivery_date) {
        (Some(product), Some(date)) => format!("{product} on {}", day(date)),
        _ => "none yet".to_string(),
    };
    format!(
        "Hello {}\n  deliveries: {}\n  last delivery: {last}",
        member.display_name(),
        stats.total_deliveries
    )
}

fn history_table(history: &[DeliveryRecord]) -> String {
    if history.is_empty() {
        return "history: no deliveries".to_string();
    }
    let mut out = String::from("history:");
    for record in history {
        out.push_str(&format!(
            "\n  {}  {}",
            day(record.delivery.created_at),
            record.product_name
        ));
    }
    out
}

fn basket(latest: Option<&LatestBasket>) -> String {
    let Some(latest) = latest else {
        return "latest basket: none".to_string();
    };
    let mut out = format!(
        "latest basket: {} ({})",
        latest.product_name,
        day(latest.delivery.created_at)
    );
    for vegetable in &latest.composition {
        out.push_str(&format!("\n  - {vegetable}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::domain::{Delivery, DeliveryId, MemberId, ProductId, SubscriptionId};

    fn record(day: u32, product: &str) -> DeliveryRecord {
        DeliveryRecord {
            delivery: Delivery {
                id: DeliveryId(day as i64),
                subscription_id: SubscriptionId(1),
                product_id: ProductId(1),
                created_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            },
            product_name: product.into(),
        }
    }

    #[test]
    fn dashboard_without_deliveries() {
        let member = Member {
            id: MemberId(1),
            email: "ada@example.org".into(),
            first_name: Some("Ada".into()),
            last_name: None,
        };
        let text = dashboard(&member, &DashboardStats::from_history(&[]));
        assert!(text.contains("deliveries: 0"));
        assert!(text.ends_with("last delivery: none yet"));
    }

    #[test]
    fn basket_lists_composition() {
        let latest = LatestBasket {
            delivery: record(7, "Panier familial").delivery,
            product_name: "Panier familial".into(),
            composition: vec!["Poireau".into(), "Unknown".into()],
        };
        assert_eq!(
            basket(Some(&latest)),
            "latest basket: Panier familial (07/03/2024)\n  - Poireau\n  - Unknown"
        );
    }

    #[test]
    fn history_rows_are_dated() {
        let text = history_table(&[record(14, "Panier simple")]);
        assert_eq!(text, "history:\n  14/03/2024  Panier simple");
    }
}
