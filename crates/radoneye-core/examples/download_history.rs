//! Example: Downloading the stored history
//!
//! The device keeps one averaged value per hour. V1 firmware streams them
//! raw after a metadata frame; V2 and later send numbered pages.
//!
//! Run with: `cargo run --example download_history -- <DEVICE_ADDRESS_OR_NAME>`

use std::env;

use radoneye_core::{BleTransport, ClientConfig, ProtocolClient, ScanOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let identifier = if args.len() > 1 {
        &args[1]
    } else {
        eprintln!("Usage: {} <DEVICE_ADDRESS_OR_NAME>", args[0]);
        std::process::exit(1);
    };

    let transport = BleTransport::find(identifier, &ScanOptions::default()).await?;
    let client = ProtocolClient::new(transport, ClientConfig::default());
    client.connect().await?;
    println!("Connected ({:?})", client.version());

    println!("Downloading history (this may take a moment)...");
    let result = client.history().await;
    client.disconnect().await;
    let history = result?;

    println!("Downloaded {} hourly values:", history.len());
    println!("{:>5} {:>8} {:>8}", "#", "Bq/m3", "pCi/L");
    for (index, value) in history.values().iter().enumerate() {
        println!("{:>5} {:>8} {:>8}", index + 1, value.bq_m3, value.pci_l);
    }
    Ok(())
}
