//! Example: Reading a status snapshot
//!
//! Run with: `cargo run --example read_status -- <DEVICE_ADDRESS_OR_NAME>`
//!
//! Set `RUST_LOG=radoneye::frames=debug` to see every frame on the wire.

use std::env;

use radoneye_core::{BleTransport, ClientConfig, ProtocolClient, ScanOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let identifier = if args.len() > 1 {
        &args[1]
    } else {
        eprintln!("Usage: {} <DEVICE_ADDRESS_OR_NAME>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} FR:RU22012020159", args[0]);
        std::process::exit(1);
    };

    let transport = BleTransport::find(identifier, &ScanOptions::default()).await?;
    let client = ProtocolClient::new(transport, ClientConfig::default());
    client.connect().await?;

    let result = client.status().await;
    client.disconnect().await;
    let status = result?;

    println!("Serial:    {}", status.serial);
    println!("Model:     {} ({})", status.model, status.firmware_version);
    println!("Latest:    {}", status.latest);
    println!("Day avg:   {}", status.day_avg);
    println!("Month avg: {}", status.month_avg);
    println!("Peak:      {}", status.peak);
    println!("Counts:    {}", status.counts);
    println!("Uptime:    {}", status.uptime);
    if let Some(unit) = status.display_unit {
        println!("Display:   {unit}");
    }
    if let Some(alarm) = status.alarm {
        println!(
            "Alarm:     {} at {} every {} min",
            if alarm.enabled { "on" } else { "off" },
            alarm.level,
            alarm.interval_minutes
        );
    }
    Ok(())
}
