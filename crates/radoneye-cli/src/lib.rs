//! Command-line interface for Ecosense RadonEye radon monitors.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `list` | Scan for nearby RadonEye devices |
//! | `status` | Read the current status |
//! | `history` | Read the stored hourly history |
//! | `beep` | Make the device beep |
//! | `alarm` | Configure the radon alarm |
//! | `unit` | Show or change the display unit |
//! | `config` | Manage the CLI configuration file |
//!
//! # Output Formats
//!
//! - **Text** (default): `key = value` lines for status, tab-separated rows for history
//! - **JSON**: compact, one document per line
//!
//! # Configuration
//!
//! Defaults can be stored in `config.toml` under the platform config
//! directory (`~/.config/radoneye/` on Linux). Flags and environment
//! variables (`RADONEYE_DEVICE`, `RADONEYE_ROUNDING_OFF`) take precedence.

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod util;
