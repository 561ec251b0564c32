//! Status command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use radoneye_core::{ProtocolClient, Transport};

use crate::cli::OutputFormat;
use crate::format::format_status;

pub async fn cmd_status<T>(
    client: &ProtocolClient<T>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport + ?Sized + 'static,
{
    let status = client.status().await.context("Failed to read status")?;
    writeln!(out, "{}", format_status(&status, format)?)?;
    Ok(())
}
