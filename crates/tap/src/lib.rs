//! Access log - Rotation triggers
//!
//! A trigger is a subscribable source of "rotate now" notifications. The
//! pipeline subscribes while it runs and drops its subscription when it
//! stops, so a stopped pipeline no longer reacts to the trigger.
//!
//! # Architecture
//!
//! ```text
//! SIGHUP ──→ HangupSignal (one listener per process)
//!                 │
//!                 ▼
//!            TriggerHub ──broadcast──┬──→ TriggerSubscription (pipeline A)
//!                 ▲                  └──→ TriggerSubscription (pipeline B)
//!        fire() ──┘
//! ```
//!
//! Firing with no subscribers is a no-op.

mod error;
pub mod signal;
pub mod trigger;

pub use error::{Result, TapError};
pub use signal::HangupSignal;
pub use trigger::{RotationTrigger, TriggerHub, TriggerSubscription};
