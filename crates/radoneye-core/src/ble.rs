//! Bluetooth Low Energy transport over btleplug.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{ScanOptions, find_device};
use crate::transport::{FrameCallback, SubscriptionHandle, Transport};
use crate::util::{create_identifier, format_peripheral_id};

/// Default timeout for service discovery.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a characteristic write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

struct Pump {
    channel: Uuid,
    task: JoinHandle<()>,
}

/// A RadonEye reached over BLE.
///
/// Each subscription runs a notification pump task that forwards matching
/// notifications to its callback. Pumps are aborted on unsubscribe and on
/// disconnect.
///
/// # Cleanup
///
/// Call [`Transport::disconnect`] before dropping. Dropping a connected
/// transport logs a warning and spawns a best-effort disconnect.
pub struct BleTransport {
    // Held so the peripheral's adapter outlives the connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    address: String,
    discovery_timeout: Duration,
    write_timeout: Duration,
    services: RwLock<HashSet<Uuid>>,
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
    pumps: Mutex<HashMap<u64, Pump>>,
    next_id: AtomicU64,
    disconnected: AtomicBool,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Wrap an already-discovered peripheral. Nothing is connected yet.
    pub async fn new(adapter: Adapter, peripheral: Peripheral) -> Result<Self> {
        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());
        // macOS reports a zero address; fall back to the peripheral ID there.
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            services: RwLock::new(HashSet::new()),
            characteristics: RwLock::new(HashMap::new()),
            pumps: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            disconnected: AtomicBool::new(true),
        })
    }

    /// Scan for `identifier` (address, peripheral ID or name) and wrap it.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn find(identifier: &str, options: &ScanOptions) -> Result<Self> {
        let (adapter, peripheral) = find_device(identifier, options).await?;
        Self::new(adapter, peripheral).await
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Advertised name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Address, or peripheral ID on macOS.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn pumps(&self) -> MutexGuard<'_, HashMap<u64, Pump>> {
        self.pumps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.characteristics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uuid)
            .cloned()
            .ok_or_else(|| Error::CharacteristicNotFound(uuid.to_string()))
    }

    fn abort_pumps(&self) {
        for (_, pump) in self.pumps().drain() {
            pump.task.abort();
        }
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn connect(&self) -> Result<()> {
        info!("Connecting to {}...", self.address);
        self.peripheral.connect().await?;
        self.disconnected.store(false, Ordering::SeqCst);
        info!("Connected!");

        info!("Discovering services...");
        timeout(self.discovery_timeout, self.peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.discovery_timeout))??;

        let mut services = HashSet::new();
        let mut characteristics = HashMap::new();
        for service in self.peripheral.services() {
            debug!("  Service: {}", service.uuid);
            services.insert(service.uuid);
            for characteristic in service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
                characteristics.insert(characteristic.uuid, characteristic);
            }
        }
        debug!(
            "Cached {} services and {} characteristics",
            services.len(),
            characteristics.len()
        );

        *self.services.write().unwrap_or_else(PoisonError::into_inner) = services;
        *self
            .characteristics
            .write()
            .unwrap_or_else(PoisonError::into_inner) = characteristics;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        self.abort_pumps();

        if self.peripheral.is_connected().await.unwrap_or(false) {
            info!("Disconnecting from {}...", self.address);
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }

    fn has_service(&self, service: Uuid) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&service)
    }

    async fn subscribe(
        &self,
        channel: Uuid,
        on_frame: FrameCallback,
    ) -> Result<SubscriptionHandle> {
        let characteristic = self.find_characteristic(channel)?;
        self.peripheral.subscribe(&characteristic).await?;

        let mut stream = self.peripheral.notifications().await?;
        let task = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == channel {
                    on_frame(&notification.value);
                }
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pumps().insert(id, Pump { channel, task });
        let handle = SubscriptionHandle::new(id, channel);
        debug!("Subscribed {}", handle);
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        let still_listening = {
            let mut pumps = self.pumps();
            if let Some(pump) = pumps.remove(&handle.id()) {
                pump.task.abort();
            }
            pumps.values().any(|p| p.channel == handle.channel())
        };

        if !still_listening && !self.disconnected.load(Ordering::SeqCst) {
            let characteristic = self.find_characteristic(handle.channel())?;
            self.peripheral.unsubscribe(&characteristic).await?;
        }
        Ok(())
    }

    async fn write(&self, channel: Uuid, data: &[u8]) -> Result<()> {
        let characteristic = self.find_characteristic(channel)?;
        timeout(
            self.write_timeout,
            self.peripheral
                .write(&characteristic, data, WriteType::WithResponse),
        )
        .await
        .map_err(|_| Error::timeout(format!("write characteristic {channel}"), self.write_timeout))??;
        Ok(())
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }

        warn!(
            device_address = %self.address,
            "BleTransport dropped without calling disconnect() - performing best-effort cleanup"
        );
        self.abort_pumps();

        let peripheral = self.peripheral.clone();
        let address = self.address.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(
                        device_address = %address,
                        error = %e,
                        "Best-effort disconnect failed (device may already be disconnected)"
                    );
                }
            });
        }
    }
}
