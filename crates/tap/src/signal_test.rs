//! Tests for the SIGHUP trigger

use super::*;
use std::time::Duration;

fn standalone() -> HangupSignal {
    HangupSignal {
        hub: TriggerHub::new(SIGNAL_NAME),
        listener: Mutex::new(None),
    }
}

#[cfg(unix)]
fn send_hangup() {
    let status = std::process::Command::new("kill")
        .args(["-HUP", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn test_global_is_shared() {
    assert!(Arc::ptr_eq(&HangupSignal::global(), &HangupSignal::global()));
    assert_eq!(HangupSignal::global().name(), "SIGHUP");
}

#[test]
fn test_subscribe_outside_runtime_fails() {
    let signal = standalone();
    assert!(signal.subscribe().is_err());
    assert_eq!(signal.subscriber_count(), 0);
}

#[cfg(unix)]
#[test]
fn test_install_outside_runtime_fails() {
    assert!(matches!(
        standalone().install_listener(),
        Err(TapError::NoRuntime { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_listener_without_subscribers_keeps_process_alive() {
    let signal = standalone();
    signal.install_listener().unwrap();
    signal.install_listener().unwrap();
    assert_eq!(signal.subscriber_count(), 0);

    send_hangup();

    tokio::time::timeout(Duration::from_secs(5), async {
        while signal.hub().fired_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(signal.subscriber_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_sighup_reaches_subscribers() {
    let signal = standalone();

    let mut subscription = signal.subscribe().unwrap();
    assert_eq!(signal.subscriber_count(), 1);

    send_hangup();

    let received = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .unwrap();
    assert!(received.is_some());

    drop(subscription);
    assert_eq!(signal.subscriber_count(), 0);
}
