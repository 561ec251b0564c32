//! Connection lifecycle and high-level operations.
//!
//! [`ProtocolClient`] owns one transport, detects the protocol version once
//! per connection and runs at most one exchange at a time.
//!
//! ```text
//! Disconnected -> Connecting -> VersionUnknown -> Ready <-> Busy
//!       ^                                           |
//!       +------------------ Disconnecting <---------+
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use radoneye_types::{
    DeviceStatus, HistoryReading, RadonUnit, RoundingPolicy, UnitConverter,
};

use crate::codec::{self, FrameCodec};
use crate::error::{Error, Result};
use crate::exchange::ExchangeEngine;
use crate::transport::{Transport, TransportCapabilities};
use crate::version::{HistoryScale, ProtocolVersion, V1Layout, VersionDetector};

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for a status read.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a history read.
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default pause after a write-only command.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Default wait for the optional V1 settings frame.
pub const DEFAULT_EXTENDED_STATUS_GRACE: Duration = Duration::from_millis(500);

/// Lifecycle state of a [`ProtocolClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No link.
    Disconnected,
    /// Transport connect in progress.
    Connecting,
    /// Linked, protocol not yet selected.
    VersionUnknown,
    /// Idle and able to start an operation.
    Ready,
    /// An operation is running.
    Busy,
    /// Tearing the link down.
    Disconnecting,
}

/// Client settings.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use radoneye_core::{ClientConfig, HistoryScale};
///
/// let config = ClientConfig::default()
///     .history_timeout(Duration::from_secs(120))
///     .history_scale(HistoryScale::Legacy);
/// assert_eq!(config.status_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout for the transport connect.
    pub connect_timeout: Duration,
    /// Deadline for a status exchange and for the V1 history metadata read.
    pub status_timeout: Duration,
    /// Deadline for a history exchange. V1 bounds its metadata read by
    /// `status_timeout` and only the raw stream that follows by this.
    pub history_timeout: Duration,
    /// Pause after beep and setting writes.
    pub settle_delay: Duration,
    /// Rounding applied to reported values.
    pub rounding: RoundingPolicy,
    /// Divisor used for V1 history values.
    pub history_scale: HistoryScale,
    /// Expected V1 status layout.
    pub v1_layout: V1Layout,
    /// How long to wait for the optional V1 settings frame.
    pub extended_status_grace: Duration,
    /// Skip detection and use this protocol.
    pub version_override: Option<ProtocolVersion>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            rounding: RoundingPolicy::default(),
            history_scale: HistoryScale::default(),
            v1_layout: V1Layout::default(),
            extended_status_grace: DEFAULT_EXTENDED_STATUS_GRACE,
            version_override: None,
        }
    }
}

impl ClientConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the status deadline.
    #[must_use]
    pub fn status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Set the history deadline.
    #[must_use]
    pub fn history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }

    /// Set the pause after write-only commands.
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the rounding policy.
    #[must_use]
    pub fn rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    /// Set the V1 history divisor.
    #[must_use]
    pub fn history_scale(mut self, scale: HistoryScale) -> Self {
        self.history_scale = scale;
        self
    }

    /// Pin the V1 status layout.
    #[must_use]
    pub fn v1_layout(mut self, layout: V1Layout) -> Self {
        self.v1_layout = layout;
        self
    }

    /// Set the wait for the optional V1 settings frame.
    #[must_use]
    pub fn extended_status_grace(mut self, grace: Duration) -> Self {
        self.extended_status_grace = grace;
        self
    }

    /// Force a protocol version instead of detecting it.
    #[must_use]
    pub fn version_override(mut self, version: Option<ProtocolVersion>) -> Self {
        self.version_override = version;
        self
    }

    fn converter(&self) -> UnitConverter {
        UnitConverter::new(self.rounding)
    }
}

struct Session {
    state: ClientState,
    codec: Option<Arc<dyn FrameCodec>>,
}

/// Returns the client to Ready when an operation ends.
struct BusyGuard<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        // A concurrent disconnect already moved the state on.
        if session.state == ClientState::Busy {
            session.state = ClientState::Ready;
        }
    }
}

/// High-level access to one RadonEye device.
///
/// # Example
///
/// ```
/// use radoneye_core::{ClientConfig, MockTransport, ProtocolClient};
///
/// #[tokio::main]
/// async fn main() -> radoneye_core::Result<()> {
///     let client = ProtocolClient::new(MockTransport::v2(), ClientConfig::default());
///     client.connect().await?;
///     println!("Protocol: {:?}", client.version());
///     client.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct ProtocolClient<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
    engine: ExchangeEngine<T>,
    config: ClientConfig,
    session: Mutex<Session>,
}

impl<T: Transport + 'static> ProtocolClient<T> {
    /// Create a client that owns `transport`.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self::with_shared(Arc::new(transport), config)
    }
}

impl<T: Transport + ?Sized + 'static> ProtocolClient<T> {
    /// Create a client over a shared transport.
    pub fn with_shared(transport: Arc<T>, config: ClientConfig) -> Self {
        Self {
            engine: ExchangeEngine::new(Arc::clone(&transport)),
            transport,
            config,
            session: Mutex::new(Session {
                state: ClientState::Disconnected,
                codec: None,
            }),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Settings in effect.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        self.session().state
    }

    /// Protocol of the current connection, once detected.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.session().codec.as_ref().map(|codec| codec.version())
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ClientState) {
        self.session().state = state;
    }

    // --- Connection Management ---

    /// Connect and select the protocol version.
    ///
    /// Does nothing when already connected. On failure the link is torn down
    /// and the client is back in [`ClientState::Disconnected`].
    #[tracing::instrument(level = "info", skip_all, fields(connect_timeout = ?self.config.connect_timeout))]
    pub async fn connect(&self) -> Result<()> {
        {
            let mut session = self.session();
            match session.state {
                ClientState::Ready | ClientState::Busy => return Ok(()),
                ClientState::Disconnected => session.state = ClientState::Connecting,
                ClientState::Connecting
                | ClientState::VersionUnknown
                | ClientState::Disconnecting => return Err(Error::ExchangeInProgress),
            }
        }

        match self.establish().await {
            Ok(codec) => {
                info!("Connected ({} protocol)", codec.version());
                let mut session = self.session();
                session.codec = Some(codec);
                session.state = ClientState::Ready;
                Ok(())
            }
            Err(e) => {
                if let Err(teardown) = self.transport.disconnect().await {
                    warn!("Teardown after failed connect also failed: {}", teardown);
                }
                self.set_state(ClientState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<Arc<dyn FrameCodec>> {
        let timeout = self.config.connect_timeout;
        info!("Connecting to device...");
        tokio::time::timeout(timeout, self.transport.connect())
            .await
            .map_err(|_| Error::timeout("connect", timeout))??;
        self.set_state(ClientState::VersionUnknown);

        let version = match self.config.version_override {
            Some(version) => {
                debug!("Using configured protocol {}", version);
                version
            }
            None => VersionDetector::new(self.config.history_scale)
                .detect(&TransportCapabilities(&*self.transport))?,
        };

        Ok(codec::for_version(
            version,
            self.config.converter(),
            self.config.v1_layout,
        ))
    }

    /// Disconnect. Valid from any state; transport errors are logged only.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn disconnect(&self) {
        {
            let mut session = self.session();
            if session.state == ClientState::Disconnected {
                debug!("Already disconnected");
                return;
            }
            session.state = ClientState::Disconnecting;
            session.codec = None;
        }

        info!("Disconnecting from device...");
        if let Err(e) = self.transport.disconnect().await {
            warn!("Error while disconnecting (ignored): {}", e);
        }
        self.set_state(ClientState::Disconnected);
    }

    /// Claim the connection for one operation.
    fn begin(&self) -> Result<(BusyGuard<'_>, Arc<dyn FrameCodec>)> {
        let mut session = self.session();
        match session.state {
            ClientState::Ready => {
                let codec = session
                    .codec
                    .clone()
                    .ok_or(Error::NotConnected(ClientState::Ready))?;
                session.state = ClientState::Busy;
                Ok((
                    BusyGuard {
                        session: &self.session,
                    },
                    codec,
                ))
            }
            ClientState::Busy => Err(Error::ExchangeInProgress),
            state => Err(Error::NotConnected(state)),
        }
    }

    // --- Operations ---

    /// Read the current status snapshot.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn status(&self) -> Result<DeviceStatus> {
        let (_busy, codec) = self.begin()?;
        self.engine
            .status(
                &*codec,
                self.config.extended_status_grace,
                self.config.status_timeout,
            )
            .await
    }

    /// Read the stored history, oldest sample first.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn history(&self) -> Result<HistoryReading> {
        let (_busy, codec) = self.begin()?;
        let history = self
            .engine
            .history(codec, self.config.status_timeout, self.config.history_timeout)
            .await?;
        debug!("Read {} history samples", history.len());
        Ok(history)
    }

    /// Make the device beep.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn beep(&self) -> Result<()> {
        let (_busy, codec) = self.begin()?;
        self.engine
            .send(
                "beep",
                codec.channels().command,
                &codec.encode_beep(),
                self.config.settle_delay,
            )
            .await
    }

    /// Configure the radon alarm.
    ///
    /// `level` is given in `unit` and converted to Bq/m³ before encoding.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn set_alarm(
        &self,
        enabled: bool,
        level: f64,
        unit: RadonUnit,
        interval_minutes: u32,
    ) -> Result<()> {
        let (_busy, codec) = self.begin()?;
        let level_bq_m3 = UnitConverter::exact().convert(level, unit, RadonUnit::BqM3);
        let command = codec.encode_set_alarm(enabled, level_bq_m3, interval_minutes)?;
        self.engine
            .send(
                "set_alarm",
                codec.channels().command,
                &command,
                self.config.settle_delay,
            )
            .await
    }

    /// Change the unit shown on the device display.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn set_unit(&self, unit: RadonUnit) -> Result<()> {
        let (_busy, codec) = self.begin()?;
        self.engine
            .send(
                "set_unit",
                codec.channels().command,
                &codec.encode_set_unit(unit),
                self.config.settle_delay,
            )
            .await
    }
}
