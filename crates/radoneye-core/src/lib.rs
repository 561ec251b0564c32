//! Core BLE protocol engine for RadonEye radon monitors.
//!
//! This crate talks to Ecosense RadonEye RD200 devices over Bluetooth Low
//! Energy: it detects which of the three firmware protocols a device speaks,
//! runs request/response exchanges over notification channels, and decodes
//! the resulting frames into [`radoneye_types`] records.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby monitors (`FR:` name prefix)
//! - **Status snapshots**: latest, day, month and peak radon levels, counts, uptime
//! - **History**: the stored hourly history, reassembled from pages or raw streams
//! - **Settings**: beep, alarm configuration, display unit
//! - **Transport abstraction**: run the same engine over BLE or [`MockTransport`]
//!
//! # Supported Protocols
//!
//! | Protocol | Firmware | Status | History |
//! |----------|----------|--------|---------|
//! | V1 | original RD200 | multi-frame burst, pCi/L floats | metadata frame + raw stream |
//! | V2 | RD200 v2 | single frame, Bq/m³ integers | numbered pages |
//! | V3 | RD200 v3 | V2 wire format, different serial layout | numbered pages |
//!
//! # Quick Start
//!
//! ```no_run
//! use radoneye_core::{BleTransport, ClientConfig, ProtocolClient, ScanOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = BleTransport::find("FR:RU2201", &ScanOptions::default()).await?;
//!     let client = ProtocolClient::new(transport, ClientConfig::default());
//!     client.connect().await?;
//!
//!     let status = client.status().await?;
//!     println!("Latest: {}", status.latest);
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod client;
pub mod codec;
pub mod commands;
pub mod error;
mod exchange;
pub mod guard;
pub mod mock;
pub mod scan;
pub mod transport;
pub mod util;
pub mod version;

// Re-export the shared records and UUID constants from radoneye-types
pub use radoneye_types::types;
pub use radoneye_types::uuid;
pub use radoneye_types::{
    AlarmSettings, DeviceStatus, HistoryReading, RadonUnit, RadonValue, RoundingPolicy,
    UnitConverter,
};

// Core exports
pub use ble::BleTransport;
pub use client::{ClientConfig, ClientState, ProtocolClient};
pub use codec::FrameCodec;
pub use error::{Error, Result};
pub use exchange::FRAME_TARGET;
pub use guard::SubscriptionGuard;
pub use mock::MockTransport;
pub use scan::{DiscoveredDevice, ScanOptions};
pub use transport::{FrameCallback, SubscriptionHandle, Transport};
pub use version::{HistoryScale, ProtocolVersion, V1Layout, VersionDetector};
