//! List command implementation.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use radoneye_core::ScanOptions;
use radoneye_core::scan::scan_with_options;

use crate::cli::OutputFormat;
use crate::format::format_device;

pub async fn cmd_list(
    timeout: Duration,
    adapter: Option<usize>,
    all: bool,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let mut options = ScanOptions::new().duration(timeout).adapter_index(adapter);
    if all {
        options = options.all_devices();
    }

    let devices = scan_with_options(options)
        .await
        .context("Failed to scan for devices")?;

    for device in &devices {
        writeln!(out, "{}", format_device(device, format)?)?;
    }
    Ok(())
}
