//! Live listener behaviour with paused time.

mod common;

use std::time::Duration;

use common::{Harness, OFF, ON, at, bad_gateway, unauthorized};
use decoy_watch::Error;
use decoy_watch::status::DecoyStatus;
use decoy_watch::testing::{ErrorFn, SELF_ID};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_history_is_not_replayed() {
    let h = Harness::new();
    h.source.server_says(ON, at(9, 0, 0));

    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_secs(10)).await;

    assert_eq!(h.services.store.fact().status, DecoyStatus::Off);
    assert_eq!(h.sink.sends(), 0);
    assert!(h.services.store.is_live());

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_new_signals_apply_in_real_time() {
    let h = Harness::new();
    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_millis(100)).await;

    h.source.server_says(ON, at(10, 0, 0));
    sleep(Duration::from_secs(4)).await;

    let fact = h.services.store.fact();
    assert_eq!(fact.status, DecoyStatus::On);
    assert_eq!(fact.last_signal_time, Some(at(10, 0, 0)));
    assert!(h.sink.contents()[0].starts_with("@everyone"));

    // A stale signal arriving late is ignored.
    h.source.server_says(OFF, at(9, 0, 0));
    sleep(Duration::from_secs(4)).await;
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);

    h.source.server_says(OFF, at(10, 5, 0));
    sleep(Duration::from_secs(4)).await;
    assert_eq!(h.services.store.fact().status, DecoyStatus::Off);
    assert_eq!(h.sink.sends(), 1);
    assert_eq!(h.sink.edits(), 1);

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_own_messages_are_skipped() {
    let h = Harness::new();
    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_millis(100)).await;

    h.source.push(SELF_ID, "watcher", ON, at(10, 0, 0));
    h.source.push(SELF_ID, "watcher", "!interval 60", at(10, 0, 1));
    sleep(Duration::from_secs(4)).await;

    assert_eq!(h.services.store.fact().status, DecoyStatus::Off);
    assert_eq!(h.services.store.interval(), 5);
    assert_eq!(h.sink.sends(), 0);

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_commands_are_dispatched() {
    let h = Harness::new();
    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_millis(100)).await;

    h.player_says("!interval 90");
    h.player_says("!interval 5");
    sleep(Duration::from_secs(4)).await;

    assert_eq!(h.services.store.interval(), 90);
    assert_eq!(
        h.sink.contents(),
        vec!["✅ Check interval changed to 90 seconds".to_string()]
    );

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_login_stops_listener() {
    let h = Harness::new();
    h.source.fail_identity_with(Some(unauthorized as ErrorFn));

    let result = h.listener().run(CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::FeedUnavailable(_))));
    assert!(!h.services.store.is_live());
    assert_eq!(h.source.identity_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_login_failure_is_retried() {
    let h = Harness::new();
    h.source.fail_identity_with(Some(bad_gateway as ErrorFn));

    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_millis(500)).await;
    assert!(!h.services.store.is_live());

    h.source.fail_identity_with(None);
    sleep(Duration::from_secs(2)).await;
    assert!(h.services.store.is_live());
    assert!(h.source.identity_calls() >= 2);

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_poll_failures_back_off_then_recover() {
    let h = Harness::new();
    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_millis(100)).await;

    h.source.fail_fetches(true);
    sleep(Duration::from_secs(4)).await;
    assert!(!h.services.store.is_live());

    h.source.fail_fetches(false);
    h.source.server_says(ON, at(10, 0, 0));
    sleep(Duration::from_secs(10)).await;
    assert!(h.services.store.is_live());
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_revoked_credential_stops_polling() {
    let h = Harness::new();
    let token = CancellationToken::new();
    let task = tokio::spawn(h.listener().run(token.clone()));
    sleep(Duration::from_millis(100)).await;

    h.source.fail_fetches_with(unauthorized);
    sleep(Duration::from_secs(4)).await;

    assert!(task.is_finished());
    let result = task.await.unwrap();
    assert!(matches!(result, Err(Error::FeedUnavailable(_))));
    assert!(!h.services.store.is_live());
}
