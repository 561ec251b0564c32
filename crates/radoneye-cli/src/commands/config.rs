//! Config command implementation.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: &ConfigAction, path: &Path, out: &mut dyn Write) -> Result<()> {
    match action {
        ConfigAction::Path => writeln!(out, "{}", path.display())?,
        ConfigAction::Show => write!(out, "{}", Config::load_from(path)?.to_toml()?)?,
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(path)?;
            config.set(key, value)?;
            config.save_to(path)?;
            writeln!(out, "Set {key} = {value}")?;
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load_from(path)?;
            config.unset(key)?;
            config.save_to(path)?;
            writeln!(out, "Unset {key}")?;
        }
    }
    Ok(())
}
