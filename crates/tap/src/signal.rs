//! SIGHUP as a rotation trigger
//!
//! One process-wide listener forwards every SIGHUP to a [`TriggerHub`]. The
//! listener is installed by [`HangupSignal::install_listener`] or on the
//! first subscription, and reinstalled if the runtime it ran on has gone
//! away. Once installed, SIGHUP no longer terminates the process, so a
//! binary that does not rotate should still install it.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{Result, TapError};
use crate::trigger::{RotationTrigger, TriggerHub, TriggerSubscription};

const SIGNAL_NAME: &str = "SIGHUP";

static GLOBAL: OnceLock<Arc<HangupSignal>> = OnceLock::new();

/// Rotation trigger fired by SIGHUP
#[derive(Debug)]
pub struct HangupSignal {
    hub: TriggerHub,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl HangupSignal {
    /// The process-wide instance
    pub fn global() -> Arc<HangupSignal> {
        let signal = GLOBAL.get_or_init(|| {
            Arc::new(HangupSignal {
                hub: TriggerHub::new(SIGNAL_NAME),
                listener: Mutex::new(None),
            })
        });
        Arc::clone(signal)
    }

    /// The hub signals are forwarded to
    pub fn hub(&self) -> &TriggerHub {
        &self.hub
    }

    /// Start forwarding SIGHUP to the hub
    ///
    /// Firing with nobody subscribed is a no-op. Calling this again while
    /// the listener runs does nothing.
    pub fn install_listener(&self) -> Result<()> {
        let mut listener = self.listener.lock();
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }
        *listener = Some(self.install()?);
        Ok(())
    }

    #[cfg(unix)]
    fn install(&self) -> Result<JoinHandle<()>> {
        use tokio::signal::unix::{SignalKind, signal};

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TapError::NoRuntime { signal: SIGNAL_NAME })?;

        let mut hangup =
            signal(SignalKind::hangup()).map_err(|source| TapError::SignalInstall {
                signal: SIGNAL_NAME,
                source,
            })?;

        let hub = self.hub.clone();
        let task = runtime.spawn(async move {
            while hangup.recv().await.is_some() {
                let notified = hub.fire();
                info!(notified, "received SIGHUP, requesting access log rotation");
            }
        });

        info!("SIGHUP listener installed");
        Ok(task)
    }

    #[cfg(not(unix))]
    fn install(&self) -> Result<JoinHandle<()>> {
        Err(TapError::Unsupported { signal: SIGNAL_NAME })
    }
}

impl RotationTrigger for HangupSignal {
    fn name(&self) -> &str {
        SIGNAL_NAME
    }

    fn subscribe(&self) -> Result<TriggerSubscription> {
        self.install_listener()?;
        Ok(self.hub.subscribe())
    }

    fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

#[cfg(test)]
#[path = "signal_test.rs"]
mod signal_test;
