//! Unit command implementation.

use std::io::Write;

use anyhow::{Context, Result, bail};
use radoneye_core::{ProtocolClient, Transport};
use radoneye_types::RadonUnit;

use crate::cli::OutputFormat;
use crate::format::format_unit;

/// Print the display unit, or change it when `set` is given.
pub async fn cmd_unit<T>(
    client: &ProtocolClient<T>,
    set: Option<RadonUnit>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport + ?Sized + 'static,
{
    match set {
        None => {
            let status = client.status().await.context("Failed to read status")?;
            let Some(unit) = status.display_unit else {
                bail!("This device does not report its display unit");
            };
            match format {
                OutputFormat::Text => writeln!(out, "Current display unit is {unit}")?,
                OutputFormat::Json => writeln!(out, "{}", format_unit(unit)?)?,
            }
        }
        Some(unit) => {
            match format {
                OutputFormat::Text => writeln!(out, "Updating display unit to {unit}")?,
                OutputFormat::Json => writeln!(out, "{}", format_unit(unit)?)?,
            }
            client
                .set_unit(unit)
                .await
                .context("Failed to set display unit")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{output, v2_client};
    use radoneye_core::uuid::V2_COMMAND;

    #[tokio::test]
    async fn test_unit_get() {
        let client = v2_client().await;

        let mut buf = Vec::new();
        cmd_unit(&client, None, OutputFormat::Text, &mut buf)
            .await
            .unwrap();
        assert_eq!(output(buf), "Current display unit is pci/l\n");

        let mut buf = Vec::new();
        cmd_unit(&client, None, OutputFormat::Json, &mut buf)
            .await
            .unwrap();
        assert_eq!(output(buf), "\"pci/l\"\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_set() {
        let client = v2_client().await;
        let mut buf = Vec::new();
        cmd_unit(&client, Some(RadonUnit::BqM3), OutputFormat::Text, &mut buf)
            .await
            .unwrap();

        assert_eq!(output(buf), "Updating display unit to bq/m3\n");
        assert_eq!(
            client.transport().writes().last(),
            Some(&(V2_COMMAND, vec![0xA2, 0x11, 0x01]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_get_propagates_read_failure() {
        let client = v2_client().await;
        client.transport().on_command(0x40, Vec::new());

        let mut buf = Vec::new();
        let err = cmd_unit(&client, None, OutputFormat::Text, &mut buf)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
        assert!(buf.is_empty());
    }
}
