//! Trigger hub and subscriptions
//!
//! ```ignore
//! let hub = TriggerHub::new("manual");
//! let mut subscription = hub.subscribe();
//!
//! hub.fire();
//! subscription.recv().await; // Some(1)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace};

use crate::error::Result;

/// Pending notifications kept per subscription before they coalesce
const CHANNEL_CAPACITY: usize = 16;

/// A subscribable source of rotation requests
pub trait RotationTrigger: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Start receiving notifications; dropping the subscription ends them
    fn subscribe(&self) -> Result<TriggerSubscription>;

    /// Number of live subscriptions
    fn subscriber_count(&self) -> usize;
}

/// Fan-out point for one trigger
///
/// Cheap to clone; clones share subscribers.
#[derive(Clone)]
pub struct TriggerHub {
    name: Arc<str>,
    sender: broadcast::Sender<u64>,
    fired: Arc<AtomicU64>,
}

impl TriggerHub {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            sender,
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Notify every current subscriber
    ///
    /// Returns how many subscribers were notified. With none this does
    /// nothing beyond counting the firing.
    pub fn fire(&self) -> usize {
        let seq = self.fired.fetch_add(1, Ordering::Relaxed) + 1;

        // Sending only fails when nobody is subscribed
        let notified = self.sender.send(seq).unwrap_or(0);
        trace!(trigger = %self.name, seq, notified, "trigger fired");
        notified
    }

    /// Subscribe to future firings
    pub fn subscribe(&self) -> TriggerSubscription {
        debug!(trigger = %self.name, "trigger subscribed");
        TriggerSubscription {
            name: Arc::clone(&self.name),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Times [`fire`](Self::fire) was called, subscribed or not
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

impl RotationTrigger for TriggerHub {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self) -> Result<TriggerSubscription> {
        Ok(TriggerHub::subscribe(self))
    }

    fn subscriber_count(&self) -> usize {
        TriggerHub::subscriber_count(self)
    }
}

impl fmt::Debug for TriggerHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerHub")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .field("fired", &self.fired_count())
            .finish()
    }
}

/// A live subscription; dropping it unsubscribes
#[derive(Debug)]
pub struct TriggerSubscription {
    name: Arc<str>,
    receiver: broadcast::Receiver<u64>,
}

impl TriggerSubscription {
    /// Wait for the next firing
    ///
    /// Returns the firing's sequence number, or `None` once the trigger is
    /// gone. A subscriber that falls more than a channel's worth of firings
    /// behind skips the oldest ones.
    pub async fn recv(&mut self) -> Option<u64> {
        loop {
            match self.receiver.recv().await {
                Ok(seq) => return Some(seq),
                Err(RecvError::Lagged(missed)) => {
                    debug!(trigger = %self.name, missed, "coalesced trigger firings");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[path = "trigger_test.rs"]
mod trigger_test;
