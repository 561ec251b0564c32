//! CLI argument definitions using clap.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use radoneye_types::RadonUnit;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable device argument
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device address, peripheral ID or name, or use RADONEYE_DEVICE env var
    #[arg(env = "RADONEYE_DEVICE")]
    pub address: Option<String>,
}

#[derive(Debug, Parser)]
#[command(name = "radoneye")]
#[command(author, version, about = "CLI for Ecosense RadonEye radon monitors", long_about = None)]
pub struct Cli {
    /// Bluetooth adapter index
    #[arg(long, global = true)]
    pub adapter: Option<usize>,

    /// Enable debug output, including frame dumps
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Connection timeout in seconds
    #[arg(long, global = true)]
    pub connect_timeout: Option<u64>,

    /// Status and history read timeout in seconds
    #[arg(long, global = true)]
    pub read_timeout: Option<u64>,

    /// Report exact values instead of rounding them
    #[arg(long, global = true, env = "RADONEYE_ROUNDING_OFF")]
    pub no_rounding: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "RADONEYE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan for nearby RadonEye devices
    List {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,

        /// Include every BLE device, not only RadonEye monitors
        #[arg(long)]
        all: bool,
    },

    /// Manage the CLI configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    #[command(flatten)]
    Device(DeviceCommand),
}

/// Commands that talk to a connected device.
#[derive(Debug, Clone, Subcommand)]
pub enum DeviceCommand {
    /// Read the current status
    Status {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read the stored hourly history
    History {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Make the device beep
    Beep {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Configure the radon alarm
    #[command(group(ArgGroup::new("state").required(true).args(["enabled", "disabled"])))]
    Alarm {
        #[command(flatten)]
        device: DeviceArgs,

        /// Arm the alarm
        #[arg(long)]
        enabled: bool,

        /// Disarm the alarm
        #[arg(long)]
        disabled: bool,

        /// Alarm level, in the unit given by --unit
        #[arg(long, default_value = "2.0")]
        level: f64,

        /// Unit of --level (bq/m3 or pci/l)
        #[arg(long, default_value = "pci/l", value_parser = RadonUnit::from_str)]
        unit: RadonUnit,

        /// Minutes between repeated alarms
        #[arg(long, default_value = "60")]
        interval: u32,
    },

    /// Show or change the display unit
    Unit {
        #[command(flatten)]
        device: DeviceArgs,

        /// New display unit (bq/m3 or pci/l)
        #[arg(long, value_parser = RadonUnit::from_str)]
        set: Option<RadonUnit>,
    },
}

impl DeviceCommand {
    /// Device argument shared by every variant.
    pub fn device(&self) -> &DeviceArgs {
        match self {
            DeviceCommand::Status { device }
            | DeviceCommand::History { device }
            | DeviceCommand::Beep { device }
            | DeviceCommand::Alarm { device, .. }
            | DeviceCommand::Unit { device, .. } => device,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of: device, adapter, connect_timeout, read_timeout, rounding, history_scale
        key: String,
        value: String,
    },
    /// Remove a configuration value
    Unset { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "radoneye",
            "status",
            "FR:RU2201",
            "--output",
            "json",
            "--connect-timeout",
            "20",
            "--read-timeout",
            "8",
            "--no-rounding",
            "--adapter",
            "1",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.connect_timeout, Some(20));
        assert_eq!(cli.read_timeout, Some(8));
        assert!(cli.no_rounding);
        assert_eq!(cli.adapter, Some(1));
        match cli.command {
            Commands::Device(DeviceCommand::Status { device }) => {
                assert_eq!(device.address.as_deref(), Some("FR:RU2201"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["radoneye", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                timeout: 5,
                all: false
            }
        ));
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.debug);
    }

    #[test]
    fn test_alarm_arguments() {
        let cli = Cli::try_parse_from([
            "radoneye", "alarm", "addr", "--enabled", "--level", "150", "--unit", "bq/m3",
            "--interval", "30",
        ])
        .unwrap();

        match cli.command {
            Commands::Device(DeviceCommand::Alarm {
                enabled,
                disabled,
                level,
                unit,
                interval,
                ..
            }) => {
                assert!(enabled);
                assert!(!disabled);
                assert_eq!(level, 150.0);
                assert_eq!(unit, RadonUnit::BqM3);
                assert_eq!(interval, 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_alarm_defaults_when_disabled() {
        let cli = Cli::try_parse_from(["radoneye", "alarm", "addr", "--disabled"]).unwrap();
        match cli.command {
            Commands::Device(DeviceCommand::Alarm {
                enabled,
                level,
                unit,
                interval,
                ..
            }) => {
                assert!(!enabled);
                assert_eq!(level, 2.0);
                assert_eq!(unit, RadonUnit::PciL);
                assert_eq!(interval, 60);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_alarm_requires_a_state() {
        assert!(Cli::try_parse_from(["radoneye", "alarm", "addr"]).is_err());
        assert!(
            Cli::try_parse_from(["radoneye", "alarm", "addr", "--enabled", "--disabled"]).is_err()
        );
    }

    #[test]
    fn test_unit_parsing() {
        let cli = Cli::try_parse_from(["radoneye", "unit", "addr", "--set", "Bq/m3"]).unwrap();
        match cli.command {
            Commands::Device(DeviceCommand::Unit { set, .. }) => {
                assert_eq!(set, Some(RadonUnit::BqM3));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["radoneye", "unit", "addr", "--set", "ppm"]).is_err());
    }

    #[test]
    fn test_debug_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["radoneye", "--debug", "--quiet", "list"]).is_err());
    }

    #[test]
    fn test_device_accessor() {
        let command = DeviceCommand::Unit {
            device: DeviceArgs {
                address: Some("addr".to_string()),
            },
            set: None,
        };
        assert_eq!(command.device().address.as_deref(), Some("addr"));
    }
}
