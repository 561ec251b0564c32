//! In-memory transport for testing.
//!
//! [`MockTransport`] implements [`Transport`] without any radio. Replies are
//! scripted per command opcode and delivered synchronously to subscribers as
//! soon as the command is written, which keeps exchange tests deterministic.
//!
//! # Features
//!
//! - **Scripted replies**: map an opcode to the frames the device sends back
//! - **Write log**: inspect every command the client wrote
//! - **Failure injection**: fail connect, write, unsubscribe or disconnect
//! - **Manual delivery**: push frames at any time with [`MockTransport::emit`]

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{FrameCallback, SubscriptionHandle, Transport};
use crate::uuid::{V1_SERVICE, V2_SERVICE};

type SharedCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<u64, (Uuid, SharedCallback)>,
    replies: HashMap<u8, Vec<(Uuid, Vec<u8>)>>,
    writes: Vec<(Uuid, Vec<u8>)>,
}

/// A scripted RadonEye link.
///
/// # Example
///
/// ```
/// use radoneye_core::{MockTransport, Transport};
/// use radoneye_core::uuid::{V2_COMMAND, V2_STATUS};
///
/// #[tokio::main]
/// async fn main() {
///     let transport = MockTransport::v2();
///     transport.on_command(0xA1, Vec::new());
///     transport.connect().await.unwrap();
///     transport.write(V2_COMMAND, &[0xA1]).await.unwrap();
///     assert_eq!(transport.writes(), vec![(V2_COMMAND, vec![0xA1])]);
///     assert_eq!(transport.emit(V2_STATUS, &[0x40]), 0);
/// }
/// ```
pub struct MockTransport {
    address: String,
    services: HashSet<Uuid>,
    state: Mutex<MockState>,
    next_id: AtomicU64,
    connected: AtomicBool,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    fail_connect: AtomicBool,
    fail_write: AtomicBool,
    fail_unsubscribe: AtomicBool,
    fail_disconnect: AtomicBool,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("address", &self.address)
            .field("services", &self.services)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockTransport {
    /// Create a transport exposing `services`.
    pub fn new(services: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            address: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
            services: services.into_iter().collect(),
            state: Mutex::new(MockState::default()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
            connect_count: AtomicU32::new(0),
            disconnect_count: AtomicU32::new(0),
            fail_connect: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            fail_unsubscribe: AtomicBool::new(false),
            fail_disconnect: AtomicBool::new(false),
        }
    }

    /// A first-generation device.
    pub fn v1() -> Self {
        Self::new([V1_SERVICE])
    }

    /// A second or third generation device.
    pub fn v2() -> Self {
        Self::new([V2_SERVICE])
    }

    /// Random address assigned to this mock.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Scripting ---

    /// Frames to deliver, in order, whenever a command with `opcode` is written.
    ///
    /// Replaces any previous script for the opcode.
    pub fn on_command(&self, opcode: u8, replies: Vec<(Uuid, Vec<u8>)>) {
        self.state().replies.insert(opcode, replies);
    }

    /// Deliver `frame` to every subscriber of `channel`.
    ///
    /// Returns the number of callbacks reached.
    pub fn emit(&self, channel: Uuid, frame: &[u8]) -> usize {
        let callbacks: Vec<SharedCallback> = self
            .state()
            .subscriptions
            .values()
            .filter(|(sub_channel, _)| *sub_channel == channel)
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &callbacks {
            callback(frame);
        }
        callbacks.len()
    }

    // --- Inspection ---

    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.state().writes.clone()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.state().subscriptions.len()
    }

    /// Whether the link is up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Number of disconnect calls, failed or not.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::Relaxed)
    }

    // --- Failure injection ---

    /// Make `connect` fail.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::Relaxed);
    }

    /// Make `write` fail after recording the write.
    pub fn fail_write(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::Relaxed);
    }

    /// Make `unsubscribe` fail and keep the subscription.
    pub fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::Relaxed);
    }

    /// Make `disconnect` report an error after tearing down.
    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::Relaxed);
    }

    fn check_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::Transport(format!("{} is not connected", self.address)))
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        if self.fail_connect.load(Ordering::Relaxed) {
            return Err(Error::DeviceNotFound(self.address.clone()));
        }
        self.connected.store(true, Ordering::Relaxed);
        self.connect_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_count.fetch_add(1, Ordering::Relaxed);
        self.connected.store(false, Ordering::Relaxed);
        self.state().subscriptions.clear();

        if self.fail_disconnect.load(Ordering::Relaxed) {
            return Err(Error::Transport("mock disconnect failure".to_string()));
        }
        Ok(())
    }

    fn has_service(&self, service: Uuid) -> bool {
        self.is_connected() && self.services.contains(&service)
    }

    async fn subscribe(
        &self,
        channel: Uuid,
        on_frame: FrameCallback,
    ) -> Result<SubscriptionHandle> {
        self.check_connected()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.state()
            .subscriptions
            .insert(id, (channel, Arc::from(on_frame)));
        Ok(SubscriptionHandle::new(id, channel))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        if self.fail_unsubscribe.load(Ordering::Relaxed) {
            return Err(Error::Transport(format!(
                "mock unsubscribe failure for {handle}"
            )));
        }
        self.state().subscriptions.remove(&handle.id());
        Ok(())
    }

    async fn write(&self, channel: Uuid, data: &[u8]) -> Result<()> {
        self.check_connected()?;

        let replies = {
            let mut state = self.state();
            state.writes.push((channel, data.to_vec()));
            data.first()
                .and_then(|opcode| state.replies.get(opcode))
                .cloned()
                .unwrap_or_default()
        };

        if self.fail_write.load(Ordering::Relaxed) {
            return Err(Error::Transport("mock write failure".to_string()));
        }

        for (reply_channel, frame) in replies {
            let reached = self.emit(reply_channel, &frame);
            trace!("Mock reply reached {} subscriber(s)", reached);
        }
        Ok(())
    }
}
