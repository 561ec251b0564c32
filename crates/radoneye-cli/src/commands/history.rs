//! History command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use radoneye_core::{ProtocolClient, Transport};
use tracing::info;

use crate::cli::OutputFormat;
use crate::format::format_history;

pub async fn cmd_history<T>(
    client: &ProtocolClient<T>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport + ?Sized + 'static,
{
    let history = client.history().await.context("Failed to read history")?;
    info!("Read {} history samples", history.len());
    writeln!(out, "{}", format_history(&history, format)?)?;
    Ok(())
}
