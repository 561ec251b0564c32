//! Beep command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use radoneye_core::{ProtocolClient, Transport};

pub async fn cmd_beep<T>(
    client: &ProtocolClient<T>,
    identifier: &str,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport + ?Sized + 'static,
{
    writeln!(out, "Beeping on {identifier}")?;
    client.beep().await.context("Failed to send beep")?;
    Ok(())
}
