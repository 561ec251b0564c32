//! Utility functions for CLI operations.

use anyhow::{Context, Result};
use radoneye_core::{BleTransport, ClientConfig, ProtocolClient, ScanOptions};
use tracing::info;

/// Get the device identifier, with a helpful error message.
pub fn require_device(device: Option<String>) -> Result<String> {
    device.ok_or_else(|| {
        anyhow::anyhow!(
            "No device specified. Pass an address or set the RADONEYE_DEVICE environment variable.\n\
             Run 'radoneye list' to find nearby devices."
        )
    })
}

/// Find a device over BLE and connect to it.
pub async fn connect_device(
    identifier: &str,
    adapter: Option<usize>,
    config: ClientConfig,
) -> Result<ProtocolClient<BleTransport>> {
    let options = ScanOptions::new().adapter_index(adapter);
    let transport = BleTransport::find(identifier, &options)
        .await
        .with_context(|| format!("Failed to find device '{identifier}'"))?;

    let client = ProtocolClient::new(transport, config);
    client
        .connect()
        .await
        .with_context(|| format!("Failed to connect to '{identifier}'"))?;

    if let Some(version) = client.version() {
        info!("Connected to {} (protocol {})", identifier, version);
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_device() {
        assert_eq!(require_device(Some("FR:1".to_string())).unwrap(), "FR:1");

        let err = require_device(None).unwrap_err();
        assert!(err.to_string().contains("RADONEYE_DEVICE"));
    }
}
