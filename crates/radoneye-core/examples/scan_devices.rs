//! Example: Scanning for RadonEye monitors
//!
//! Run with: `cargo run --example scan_devices`

use std::time::Duration;

use radoneye_core::ScanOptions;
use radoneye_core::scan::scan_with_options;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let options = ScanOptions::new().duration(Duration::from_secs(10));
    let devices = scan_with_options(options).await?;

    if devices.is_empty() {
        println!("No RadonEye devices found.");
        return Ok(());
    }

    for device in devices {
        println!(
            "{}\t{}\t{} dBm",
            device.identifier,
            device.name.as_deref().unwrap_or("Unknown"),
            device.rssi.map_or_else(|| "?".to_string(), |r| r.to_string())
        );
    }
    Ok(())
}
