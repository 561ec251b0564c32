//! Subscription guard for release on drop.
//!
//! Every exchange owns exactly one notification subscription. The guard
//! releases it explicitly on the normal path and falls back to a spawned
//! unsubscribe when the exchange future is dropped mid-flight.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::transport::{SubscriptionHandle, Transport};

/// Owns a live subscription until it is released.
///
/// # Example
///
/// ```ignore
/// let handle = transport.subscribe(channel, callback).await?;
/// let guard = SubscriptionGuard::new(Arc::clone(&transport), handle);
///
/// // ... drive the exchange ...
///
/// guard.release().await?;
/// ```
pub struct SubscriptionGuard<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
    handle: Option<SubscriptionHandle>,
}

impl<T: Transport + ?Sized + 'static> SubscriptionGuard<T> {
    /// Take ownership of `handle`.
    pub fn new(transport: Arc<T>, handle: SubscriptionHandle) -> Self {
        Self {
            transport,
            handle: Some(handle),
        }
    }

    /// The guarded subscription, if not yet released.
    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.handle
    }

    /// Unsubscribe now. The guard does nothing further on drop.
    pub async fn release(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => {
                debug!("Releasing subscription {}", handle);
                self.transport.unsubscribe(handle).await
            }
            None => Ok(()),
        }
    }
}

impl<T: Transport + ?Sized + 'static> Drop for SubscriptionGuard<T> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let transport = Arc::clone(&self.transport);
        if let Ok(runtime) = Handle::try_current() {
            runtime.spawn(async move {
                if let Err(e) = transport.unsubscribe(handle).await {
                    warn!("Failed to release subscription {} in guard drop: {}", handle, e);
                }
            });
        } else {
            warn!(
                "No tokio runtime available to release subscription {}",
                handle
            );
        }
    }
}
