#[path = "../bin_common.rs"]
mod common;

use clap::Parser;
use common::{parse_device, print_record};
use mercury200::{Command, DeviceConfig, FrameOutcome, MeterFleet, Metric, Reading};
use std::collections::HashSet;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Bridges bus messages on stdin/stdout to the meter decoder.
///
/// Input lines are `<topic> <json payload>` as delivered by the bus client.
/// Output lines are `<topic> <json payload>` to publish.
#[derive(Parser)]
#[command(name = "mercury-bridge")]
#[command(about = "Poll Mercury 200.02 meters through a line-oriented bus client")]
struct Args {
    /// Meters to poll, SERIAL[@TOPIC]
    #[arg(short, long = "device", value_parser = parse_device, required = true)]
    devices: Vec<DeviceConfig>,

    /// Polling interval in seconds (minimum 1)
    #[arg(long, default_value_t = 60)]
    poll_interval: u64,

    /// Commands sent on each poll
    #[arg(
        short,
        long = "command",
        value_parser = parse_command,
        default_values = ["get_status", "get_energy"]
    )]
    commands: Vec<Command>,

    /// Print all readings on shutdown
    #[arg(long)]
    summary: bool,
}

fn parse_command(s: &str) -> Result<Command, String> {
    s.parse().map_err(|e: mercury200::MercuryError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let poll_interval = Duration::from_secs(args.poll_interval.max(1));

    let (fleet, errors) = MeterFleet::with_devices(&args.devices);
    if fleet.devices().is_empty() {
        return Err(format!("No usable devices ({} rejected)", errors.len()).into());
    }
    let topics: HashSet<String> = fleet.devices().iter().map(|d| d.topic.clone()).collect();
    tracing::info!(
        "Polling {} meter(s) every {:?} on {:?}",
        fleet.devices().len(),
        poll_interval,
        topics
    );

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal");
        cancel_signal.cancel();
    });

    run(&fleet, &topics, &args.commands, poll_interval, cancel).await?;

    if args.summary {
        for record in fleet.devices() {
            print_record(&record);
        }
    }
    tracing::info!("Frame statistics: {:?}", fleet.stats());
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run(
    fleet: &MeterFleet,
    topics: &HashSet<String>,
    commands: &[Command],
    poll_interval: Duration,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for request in fleet.poll_requests(commands) {
                    let payload = match request.payload() {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!("Can't encode request for {}: {}", request.serial, e);
                            continue;
                        }
                    };
                    tracing::trace!("Publishing {} {}", request.topic, payload);
                    let line = format!("{} {}\n", request.topic, payload);
                    stdout.write_all(line.as_bytes()).await?;
                }
                stdout.flush().await?;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => handle_line(fleet, topics, &line),
                    None => {
                        tracing::info!("Input closed");
                        return Ok(());
                    }
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Bridge stopping");
                return Ok(());
            }
        }
    }
}

fn handle_line(fleet: &MeterFleet, topics: &HashSet<String>, line: &str) {
    let Some((topic, payload)) = line.trim().split_once(' ') else {
        if !line.trim().is_empty() {
            tracing::debug!("Ignoring line without payload: {}", line);
        }
        return;
    };
    if !topics.contains(topic) {
        tracing::trace!("Ignoring message on {}", topic);
        return;
    }

    tracing::debug!("Received on {}: {}", topic, payload);
    // Errors are already logged by the fleet; the frame is simply dropped.
    if let Ok(Some(FrameOutcome::Updated { serial, reading })) = fleet.handle_message(payload) {
        let Some(record) = fleet.device(serial.as_str()) else {
            return;
        };
        let tariff = matches!(reading, Reading::Tariff(_));
        for metric in Metric::ALL.into_iter().filter(|m| m.is_energy() == tariff) {
            if let Some(value) = record.value(metric) {
                let name = metric.sensor_name(serial.as_str());
                tracing::info!("{} = {} {}", name, value, metric.unit());
            }
        }
    }
}
