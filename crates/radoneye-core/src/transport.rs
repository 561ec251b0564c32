//! Transport abstraction between the protocol engine and the radio.
//!
//! The protocol engine never talks to btleplug directly. Everything it needs
//! from a connection is captured by [`Transport`], which allows the same
//! engine to run over [`crate::ble::BleTransport`] or the in-memory
//! [`crate::mock::MockTransport`].

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::version::Capabilities;

/// Callback invoked for every notification frame on a subscribed channel.
pub type FrameCallback = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    channel: Uuid,
}

impl SubscriptionHandle {
    /// Create a handle. Transports choose unique ids per subscription.
    pub fn new(id: u64, channel: Uuid) -> Self {
        Self { id, channel }
    }

    /// Transport-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Channel (characteristic UUID) this subscription listens on.
    pub fn channel(&self) -> Uuid {
        self.channel
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.id, self.channel)
    }
}

/// A connection to one RadonEye device.
///
/// Implementations preserve delivery order within a channel. No ordering is
/// guaranteed across channels.
#[async_trait]
pub trait Transport: Send + Sync {
    // --- Connection Management ---

    /// Establish the link and discover services.
    async fn connect(&self) -> Result<()>;

    /// Tear the link down. Calling this on a closed link must succeed.
    async fn disconnect(&self) -> Result<()>;

    // --- Capabilities ---

    /// Whether the connected device exposes `service`.
    fn has_service(&self, service: Uuid) -> bool;

    // --- Notifications ---

    /// Start delivering notifications from `channel` to `on_frame`.
    async fn subscribe(&self, channel: Uuid, on_frame: FrameCallback)
    -> Result<SubscriptionHandle>;

    /// Stop a subscription. No callback invocation happens after this returns.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()>;

    // --- Writes ---

    /// Write `data` to `channel`.
    async fn write(&self, channel: Uuid, data: &[u8]) -> Result<()>;
}

/// Adapter exposing a transport's service lookup to the version detector.
pub(crate) struct TransportCapabilities<'a, T: ?Sized>(pub &'a T);

impl<T: Transport + ?Sized> Capabilities for TransportCapabilities<'_, T> {
    fn has_service(&self, service: Uuid) -> bool {
        self.0.has_service(service)
    }
}
