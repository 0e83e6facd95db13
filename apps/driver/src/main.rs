mod commands;
mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::PostgrestClient;
use round_controller::{
    DriverInput, ProgressSnapshot, RoundSession, SessionOutputs, StaticPermissionGate,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::{parse_line, LineCommand, HELP};

#[derive(Parser, Debug)]
#[command(about = "Walk a delivery round from the terminal")]
struct Args {
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    cooldown_ms: Option<u64>,
    /// Answer every camera permission request with a refusal.
    #[arg(long)]
    deny_camera: bool,
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
    if let Some(ms) = args.cooldown_ms {
        settings.scan_cooldown_ms = ms;
    }

    let client = PostgrestClient::with_timeout(&settings.api_base_url, settings.request_timeout())
        .context("failed to build the API client")?;
    let gate = if args.deny_camera {
        StaticPermissionGate::denied()
    } else {
        StaticPermissionGate::prompting()
    };
    info!(api = %settings.api_base_url, cooldown_ms = settings.scan_cooldown_ms, "driver starting");

    let (session, outputs) =
        RoundSession::new(Arc::new(client), Arc::new(gate), settings.session_config());
    let status = outputs.snapshots.clone();
    let (inputs, inputs_rx) = mpsc::channel(32);
    let runner = tokio::spawn(session.run(inputs_rx));
    let printer = tokio::spawn(print_outputs(outputs));

    inputs
        .send(DriverInput::RefreshRounds)
        .await
        .context("round session stopped")?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_line(&line) {
            Ok(Some(LineCommand::Input(input))) => inputs
                .send(input)
                .await
                .context("round session stopped")?,
            Ok(Some(LineCommand::Status)) => print_status(&status),
            Ok(Some(LineCommand::Help)) => println!("{HELP}"),
            Ok(Some(LineCommand::Quit)) => break,
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }
    }

    drop(inputs);
    runner.await.context("round session panicked")?;
    if let Err(err) = printer.await {
        warn!(error = %err, "output printer failed");
    }
    Ok(())
}

fn print_status(status: &watch::Receiver<ProgressSnapshot>) {
    println!("{}", render::snapshot(&status.borrow()));
}

async fn print_outputs(mut outputs: SessionOutputs) {
    loop {
        tokio::select! {
            notification = outputs.notifications.recv() => match notification {
                Some(notification) => println!("{}", render::notification(&notification)),
                None => break,
            },
            changed = outputs.listings.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render::listing(&outputs.listings.borrow_and_update()));
            }
            changed = outputs.snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render::snapshot(&outputs.snapshots.borrow_and_update()));
            }
        }
    }
}
