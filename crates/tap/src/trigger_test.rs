//! Tests for the trigger hub

use super::*;
use std::time::Duration;

#[test]
fn test_new_hub_has_no_subscribers() {
    let hub = TriggerHub::new("manual");
    assert!(!hub.has_subscribers());
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(RotationTrigger::name(&hub), "manual");
}

#[test]
fn test_fire_without_subscribers_is_noop() {
    let hub = TriggerHub::new("manual");
    assert_eq!(hub.fire(), 0);
    assert_eq!(hub.fired_count(), 1);
}

#[test]
fn test_dropping_subscription_unsubscribes() {
    let hub = TriggerHub::new("manual");

    let first = hub.subscribe();
    let second = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 2);

    drop(first);
    assert_eq!(hub.subscriber_count(), 1);

    drop(second);
    assert!(!hub.has_subscribers());
    assert_eq!(hub.fire(), 0);
}

#[tokio::test]
async fn test_every_subscriber_is_notified() {
    let hub = TriggerHub::new("manual");
    let mut a = hub.subscribe();
    let mut b = hub.subscribe();

    assert_eq!(hub.fire(), 2);
    assert_eq!(a.recv().await, Some(1));
    assert_eq!(b.recv().await, Some(1));
}

#[tokio::test]
async fn test_subscription_sees_only_later_firings() {
    let hub = TriggerHub::new("manual");
    hub.fire();

    let mut subscription = hub.subscribe();
    let pending = tokio::time::timeout(Duration::from_millis(20), subscription.recv()).await;
    assert!(pending.is_err());

    hub.fire();
    assert_eq!(subscription.recv().await, Some(2));
}

#[tokio::test]
async fn test_lagging_subscriber_still_wakes() {
    let hub = TriggerHub::new("manual");
    let mut subscription = hub.subscribe();

    for _ in 0..(CHANNEL_CAPACITY * 2) {
        hub.fire();
    }

    let seq = subscription.recv().await.unwrap();
    assert!(seq > CHANNEL_CAPACITY as u64);
}

#[tokio::test]
async fn test_recv_ends_when_hub_is_gone() {
    let hub = TriggerHub::new("manual");
    let mut subscription = hub.subscribe();
    drop(hub);

    assert_eq!(subscription.recv().await, None);
}

#[tokio::test]
async fn test_trait_object_subscription() {
    let hub = TriggerHub::new("manual");
    let trigger: Arc<dyn RotationTrigger> = Arc::new(hub.clone());

    let mut subscription = trigger.subscribe().unwrap();
    assert_eq!(trigger.subscriber_count(), 1);
    assert_eq!(subscription.name(), "manual");

    hub.fire();
    assert_eq!(subscription.recv().await, Some(1));
}
