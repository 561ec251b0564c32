//! Command implementations for the CLI.
//!
//! Device commands are generic over the transport so they run the same way
//! against a real monitor and against `MockTransport`.

mod alarm;
mod beep;
mod config;
mod history;
mod list;
mod status;
mod unit;

use std::io::Write;

use anyhow::Result;
use radoneye_core::{ProtocolClient, Transport};

use crate::cli::{DeviceCommand, OutputFormat};

pub use alarm::cmd_alarm;
pub use beep::cmd_beep;
pub use config::cmd_config;
pub use history::cmd_history;
pub use list::cmd_list;
pub use status::cmd_status;
pub use unit::cmd_unit;

/// Run a device command on an already connected client.
pub async fn run_device_command<T>(
    client: &ProtocolClient<T>,
    identifier: &str,
    command: &DeviceCommand,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport + ?Sized + 'static,
{
    match command {
        DeviceCommand::Status { .. } => cmd_status(client, format, out).await,
        DeviceCommand::History { .. } => cmd_history(client, format, out).await,
        DeviceCommand::Beep { .. } => cmd_beep(client, identifier, out).await,
        DeviceCommand::Alarm {
            enabled,
            level,
            unit,
            interval,
            ..
        } => cmd_alarm(client, *enabled, *level, *unit, *interval, format, out).await,
        DeviceCommand::Unit { set, .. } => cmd_unit(client, *set, format, out).await,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use radoneye_core::uuid::{V2_HISTORY, V2_STATUS};
    use radoneye_core::{ClientConfig, MockTransport, ProtocolClient};

    /// A V2 status frame: serial RU22012020159, pCi/L display, alarm off at 148 Bq/m³.
    pub fn v2_status_frame(latest_bq_m3: u16) -> Vec<u8> {
        let mut frame = vec![0u8; 53];
        frame[0] = 0x40;
        frame[1] = 0x35;
        frame[2..8].copy_from_slice(b"201202");
        frame[8..11].copy_from_slice(b"RU2");
        frame[11..15].copy_from_slice(b"0159");
        frame[16..22].copy_from_slice(b"RD200P");
        frame[22..28].copy_from_slice(b"V2.0.1");
        frame[30..32].copy_from_slice(&148u16.to_le_bytes());
        frame[32] = 6;
        frame[33..35].copy_from_slice(&latest_bq_m3.to_le_bytes());
        frame[43..47].copy_from_slice(&90u32.to_le_bytes());
        frame
    }

    pub fn page(page_count: u8, page_no: u8, values: &[u16]) -> Vec<u8> {
        let mut frame = vec![0x41, page_count, page_no, values.len() as u8];
        for value in values {
            frame.extend_from_slice(&value.to_le_bytes());
        }
        frame
    }

    /// A connected client for a scripted V2 device.
    pub async fn v2_client() -> ProtocolClient<MockTransport> {
        let transport = MockTransport::v2();
        transport.on_command(0x40, vec![(V2_STATUS, v2_status_frame(21))]);
        transport.on_command(
            0x41,
            vec![
                (V2_HISTORY, page(2, 1, &[10, 20])),
                (V2_HISTORY, page(2, 2, &[37])),
            ],
        );
        let client = ProtocolClient::new(transport, ClientConfig::default());
        client.connect().await.unwrap();
        client
    }

    pub fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{output, v2_client};
    use super::*;
    use crate::cli::DeviceArgs;

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_runs_the_selected_command() {
        let client = v2_client().await;
        let command = DeviceCommand::Beep {
            device: DeviceArgs { address: None },
        };

        let mut buf = Vec::new();
        run_device_command(&client, "FR:RU2201", &command, OutputFormat::Text, &mut buf)
            .await
            .unwrap();

        assert_eq!(output(buf), "Beeping on FR:RU2201\n");
        assert_eq!(client.transport().writes().last().unwrap().1, vec![0xA1]);
    }
}
