//! Alarm command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use radoneye_core::{ProtocolClient, Transport};
use radoneye_types::RadonUnit;

use crate::cli::OutputFormat;
use crate::format::format_alarm;

pub async fn cmd_alarm<T>(
    client: &ProtocolClient<T>,
    enabled: bool,
    level: f64,
    unit: RadonUnit,
    interval_minutes: u32,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport + ?Sized + 'static,
{
    writeln!(
        out,
        "{}",
        format_alarm(enabled, level, unit, interval_minutes, format)?
    )?;
    client
        .set_alarm(enabled, level, unit, interval_minutes)
        .await
        .context("Failed to configure alarm")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{output, v2_client};
    use radoneye_core::uuid::V2_COMMAND;

    #[tokio::test(start_paused = true)]
    async fn test_alarm_writes_command() {
        let client = v2_client().await;
        let mut buf = Vec::new();
        cmd_alarm(
            &client,
            true,
            4.0,
            RadonUnit::PciL,
            60,
            OutputFormat::Text,
            &mut buf,
        )
        .await
        .unwrap();

        assert_eq!(
            output(buf),
            "Setup alarm: enabled, level = 4 pci/l, interval = 60 mins\n"
        );
        assert_eq!(
            client.transport().writes().last(),
            Some(&(V2_COMMAND, vec![0xAA, 0x11, 0x01, 0x94, 0x00, 0x06]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_alarm_rejects_bad_interval() {
        let client = v2_client().await;
        let mut buf = Vec::new();
        let err = cmd_alarm(
            &client,
            true,
            100.0,
            RadonUnit::BqM3,
            5000,
            OutputFormat::Text,
            &mut buf,
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("Invalid configuration"));
    }
}
