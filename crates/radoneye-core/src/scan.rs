//! Device discovery and scanning.
//!
//! RadonEye monitors advertise a local name starting with `FR:` followed by
//! the serial, e.g. `FR:RU22012020159`.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::util::{create_identifier, format_peripheral_id};
use crate::uuid::{NAME_PREFIX, V1_SERVICE, V2_SERVICE};

/// Default scan duration.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Information about a discovered device.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Advertised name (e.g. "FR:RU22012020159").
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `id` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address elsewhere).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the advertisement looks like a RadonEye.
    pub is_radoneye: bool,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan.
    pub duration: Duration,
    /// Adapter to use, by position in the system's adapter list.
    pub adapter_index: Option<usize>,
    /// Only return devices that look like RadonEye monitors.
    pub filter_radoneye_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SCAN_DURATION,
            adapter_index: None,
            filter_radoneye_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Select an adapter by index.
    #[must_use]
    pub fn adapter_index(mut self, index: Option<usize>) -> Self {
        self.adapter_index = index;
        self
    }

    /// Scan for all BLE devices, not just RadonEye.
    #[must_use]
    pub fn all_devices(mut self) -> Self {
        self.filter_radoneye_only = false;
        self
    }
}

/// Get a Bluetooth adapter, the first one unless `index` is given.
pub async fn get_adapter(index: Option<usize>) -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    debug!("{} Bluetooth adapter(s) available", adapters.len());

    let wanted = index.unwrap_or(0);
    adapters.into_iter().nth(wanted).ok_or_else(|| {
        Error::DeviceNotFound(match index {
            Some(i) => format!("no Bluetooth adapter at index {i}"),
            None => "no Bluetooth adapter available".to_string(),
        })
    })
}

/// Scan for RadonEye devices with default options.
pub async fn scan_for_devices() -> Result<Vec<DiscoveredDevice>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan for devices with custom options.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter(options.adapter_index).await?;
    scan_with_adapter(&adapter, &options).await
}

/// Scan for devices using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: &ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let mut discovered = Vec::new();
    for peripheral in adapter.peripherals().await? {
        match process_peripheral(&peripheral, options.filter_radoneye_only).await {
            Ok(Some(device)) => {
                info!("Found device: {:?}", device.name);
                discovered.push(device);
            }
            Ok(None) => {}
            Err(e) => debug!("Error processing peripheral: {}", e),
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

async fn process_peripheral(
    peripheral: &Peripheral,
    filter_radoneye_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let is_radoneye = is_radoneye_device(&properties);
    if filter_radoneye_only && !is_radoneye {
        return Ok(None);
    }

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredDevice {
        name: properties.local_name,
        id,
        address,
        identifier,
        rssi: properties.rssi,
        is_radoneye,
    }))
}

/// Whether an advertised name belongs to a RadonEye.
pub fn is_radoneye_name(name: &str) -> bool {
    name.starts_with(NAME_PREFIX)
}

fn is_radoneye_device(properties: &PeripheralProperties) -> bool {
    if properties
        .services
        .iter()
        .any(|s| *s == V1_SERVICE || *s == V2_SERVICE)
    {
        return true;
    }
    properties
        .local_name
        .as_deref()
        .is_some_and(is_radoneye_name)
}

/// Find a specific device by address, peripheral ID or name.
///
/// Already-known peripherals are checked first. Otherwise up to three scans
/// of increasing length are made.
pub async fn find_device(
    identifier: &str,
    options: &ScanOptions,
) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter(options.adapter_index).await?;
    let identifier_lower = identifier.to_lowercase();

    info!("Looking for device: {}", identifier);

    if let Some(peripheral) = find_known_peripheral(&adapter, &identifier_lower).await? {
        info!("Found device in cache (no scan needed)");
        return Ok((adapter, peripheral));
    }

    let max_attempts: u32 = 3;
    let base_duration = (options.duration / 2).max(Duration::from_secs(2));

    for attempt in 1..=max_attempts {
        let scan_duration = base_duration * attempt;
        info!(
            "Scan attempt {}/{} ({}s)...",
            attempt,
            max_attempts,
            scan_duration.as_secs()
        );

        adapter.start_scan(ScanFilter::default()).await?;
        sleep(scan_duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) = find_known_peripheral(&adapter, &identifier_lower).await? {
            info!("Found device on attempt {}", attempt);
            return Ok((adapter, peripheral));
        }
        if attempt < max_attempts {
            warn!("Device not found, retrying...");
        }
    }

    warn!(
        "Device not found after {} attempts: {}",
        max_attempts, identifier
    );
    Err(Error::DeviceNotFound(identifier.to_string()))
}

async fn find_known_peripheral(
    adapter: &Adapter,
    identifier_lower: &str,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        let peripheral_id = format_peripheral_id(&peripheral.id());
        if matches_identifier(
            identifier_lower,
            &props.address.to_string(),
            &peripheral_id,
            props.local_name.as_deref(),
        ) {
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

/// Match a lowercase identifier against a peripheral's address, ID and name.
///
/// Addresses match with or without colons. Names and IDs match on substring.
fn matches_identifier(
    identifier_lower: &str,
    address: &str,
    peripheral_id: &str,
    name: Option<&str>,
) -> bool {
    if peripheral_id.to_lowercase().contains(identifier_lower) {
        debug!("Matched by peripheral ID: {}", peripheral_id);
        return true;
    }

    let address = address.to_lowercase();
    if address != "00:00:00:00:00:00"
        && address.replace(':', "") == identifier_lower.replace(':', "")
    {
        debug!("Matched by address: {}", address);
        return true;
    }

    if let Some(name) = name
        && name.to_lowercase().contains(identifier_lower)
    {
        debug!("Matched by name: {}", name);
        return true;
    }
    false
}
