//! End-to-end status resolution through the service container.

mod common;

use std::time::Duration;

use common::{Harness, OFF, ON, at};
use decoy_watch::Error;
use decoy_watch::publisher::PublishOutcome;
use decoy_watch::resolver::ResolveOutcome;
use decoy_watch::status::DecoyStatus;
use decoy_watch::testing::SELF_ID;
use futures::future::join_all;

#[tokio::test]
async fn test_later_off_wins_over_earlier_on() {
    let h = Harness::new();
    h.source.server_says(ON, at(10, 0, 0));
    h.source.server_says(OFF, at(10, 5, 0));

    let outcome = h.services.resolver.scan(false).await.unwrap();
    assert!(matches!(
        outcome,
        ResolveOutcome::Changed {
            status: DecoyStatus::Off,
            publish: PublishOutcome::Created(_),
            ..
        }
    ));

    let fact = h.services.store.fact();
    assert_eq!(fact.status, DecoyStatus::Off);
    assert_eq!(fact.last_signal_time, Some(at(10, 5, 0)));
    assert!(h.services.store.is_live());

    let contents = h.sink.contents();
    assert_eq!(contents.len(), 1);
    assert!(contents[0].contains("DECOY STATUS: OFF"));
    assert!(contents[0].contains("2025-03-14 10:05:00"));
    assert!(!contents[0].contains("@everyone"));
}

#[tokio::test]
async fn test_on_status_pings_everyone() {
    let h = Harness::new();
    h.source.server_says(OFF, at(9, 0, 0));
    h.source.server_says(ON, at(9, 30, 0));

    h.services.resolver.scan(false).await.unwrap();

    assert_eq!(h.services.store.fact().status, DecoyStatus::On);
    let contents = h.sink.contents();
    assert!(contents[0].starts_with("@everyone"));
    assert!(contents[0].contains("DECOY STATUS: ON"));
}

#[tokio::test]
async fn test_message_order_does_not_override_timestamps() {
    let h = Harness::new();
    // Posted later but carrying an older timestamp.
    h.source.server_says(OFF, at(10, 5, 0));
    h.source.server_says(ON, at(10, 0, 0));

    h.services.resolver.scan(false).await.unwrap();

    let fact = h.services.store.fact();
    assert_eq!(fact.status, DecoyStatus::Off);
    assert_eq!(fact.last_signal_time, Some(at(10, 5, 0)));
}

#[tokio::test]
async fn test_own_messages_are_not_signals() {
    let h = Harness::new();
    h.source.server_says(OFF, at(10, 0, 0));
    h.source.push(SELF_ID, "watcher", ON, at(10, 10, 0));

    h.services.resolver.scan(false).await.unwrap();

    assert_eq!(h.services.store.fact().status, DecoyStatus::Off);
    assert_eq!(h.services.store.fact().last_signal_time, Some(at(10, 0, 0)));
}

#[tokio::test]
async fn test_repeat_scan_is_quiet() {
    let h = Harness::new();
    h.source.server_says(ON, at(10, 0, 0));

    assert!(h.services.resolver.scan(false).await.unwrap().is_changed());
    let first_check = h.services.store.fact().last_check_time;

    let outcome = h.services.resolver.scan(false).await.unwrap();
    assert_eq!(outcome, ResolveOutcome::Unchanged);
    assert_eq!(h.sink.sends(), 1);
    assert_eq!(h.sink.edits(), 0);
    assert!(h.services.store.fact().last_check_time >= first_check);
}

#[tokio::test]
async fn test_new_signal_edits_status_message_in_place() {
    let h = Harness::new();
    h.source.server_says(ON, at(10, 0, 0));
    h.services.resolver.scan(false).await.unwrap();
    let handle = h.services.store.notification_handle().unwrap();

    h.source.server_says(OFF, at(10, 5, 0));
    let outcome = h.services.resolver.scan(false).await.unwrap();

    assert!(matches!(
        outcome,
        ResolveOutcome::Changed {
            publish: PublishOutcome::Edited(id),
            ..
        } if id == handle
    ));
    assert_eq!(h.sink.sends(), 1);
    assert_eq!(h.sink.edits(), 1);
    assert!(h.sink.content(handle).unwrap().contains("DECOY STATUS: OFF"));
}

#[tokio::test]
async fn test_deleted_status_message_is_recreated_once() {
    let h = Harness::new();
    h.source.server_says(ON, at(10, 0, 0));
    h.services.resolver.scan(false).await.unwrap();
    let stale = h.services.store.notification_handle().unwrap();
    h.sink.remove(stale);

    h.source.server_says(OFF, at(10, 5, 0));
    let outcome = h.services.resolver.scan(false).await.unwrap();

    let ResolveOutcome::Changed {
        publish: PublishOutcome::Created(fresh),
        ..
    } = outcome
    else {
        panic!("expected a new status message, got {outcome:?}");
    };
    assert_ne!(fresh, stale);
    assert_eq!(h.sink.sends(), 2);
    assert_eq!(h.sink.own_with_tag("DECOY STATUS"), vec![fresh]);
    assert_eq!(h.services.store.notification_handle(), Some(fresh));
}

#[tokio::test]
async fn test_publish_failure_still_updates_status() {
    let h = Harness::new();
    h.sink.fail_sends(true);
    h.source.server_says(ON, at(10, 0, 0));

    let outcome = h.services.resolver.scan(false).await.unwrap();

    assert!(matches!(
        outcome,
        ResolveOutcome::Changed {
            status: DecoyStatus::On,
            publish: PublishOutcome::Failed,
            ..
        }
    ));
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);
    assert_eq!(h.services.store.notification_handle(), None);
}

#[tokio::test]
async fn test_signal_leaving_window_resolves_off() {
    let h = Harness::with_env(&[("HISTORY_LIMIT", "2")]);
    h.source.server_says(ON, at(10, 0, 0));
    h.services.resolver.scan(false).await.unwrap();
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);

    h.source.server_says("gg", at(10, 1, 0));
    h.source.server_says("anyone up for a raid", at(10, 2, 0));

    let outcome = h.services.resolver.scan(false).await.unwrap();
    assert!(matches!(
        outcome,
        ResolveOutcome::Changed {
            status: DecoyStatus::Off,
            ..
        }
    ));
    assert_eq!(h.services.store.fact().status, DecoyStatus::Off);
    assert_eq!(h.sink.sends(), 1);
    assert_eq!(h.sink.edits(), 1);
}

#[tokio::test]
async fn test_feed_outage_keeps_status_and_marks_offline() {
    let h = Harness::new();
    h.source.server_says(ON, at(10, 0, 0));
    h.services.resolver.scan(false).await.unwrap();

    h.source.fail_fetches(true);
    let err = h.services.resolver.scan(false).await.unwrap_err();
    assert!(matches!(err, Error::FeedUnavailable(_)));
    assert!(!h.services.store.is_live());
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);

    h.source.fail_fetches(false);
    h.services.resolver.scan(false).await.unwrap();
    assert!(h.services.store.is_live());
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);
}

#[tokio::test]
async fn test_cleanup_keeps_current_status_message() {
    let h = Harness::new();
    for minute in 0..4 {
        h.sink.seed_own("🟢 **DECOY STATUS: OFF**", at(8, minute, 0));
    }
    let chatter = h.sink.seed_own("hello", at(8, 30, 0));

    h.source.server_says(ON, at(10, 0, 0));
    h.services.resolver.scan(false).await.unwrap();
    let handle = h.services.store.notification_handle().unwrap();

    // Publishing a new message prunes the old ones.
    assert_eq!(h.sink.own_with_tag("DECOY STATUS"), vec![handle]);
    assert!(h.sink.content(chatter).is_some());

    let report = h.services.publisher.cleanup().await;
    assert_eq!(report.kept, 1);
    assert_eq!(report.deleted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishes_create_one_message() {
    let h = Harness::new();
    h.sink.delay_sends(Duration::from_millis(20));

    let publishes = (0..8).map(|_| h.services.publisher.publish());
    let outcomes = join_all(publishes).await;

    assert_eq!(h.sink.sends(), 1);
    assert_eq!(h.sink.edits(), 7);
    let created = outcomes
        .iter()
        .filter(|o| matches!(o, PublishOutcome::Created(_)))
        .count();
    assert_eq!(created, 1);
    assert_eq!(h.sink.own_with_tag("DECOY STATUS").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_forced_scans_create_one_message() {
    let h = Harness::new();
    h.sink.delay_sends(Duration::from_millis(20));
    h.source.server_says(ON, at(10, 0, 0));

    let scans = (0..8).map(|_| h.services.resolver.scan(true));
    for outcome in join_all(scans).await {
        assert!(outcome.unwrap().is_changed());
    }

    assert_eq!(h.sink.sends(), 1);
    assert_eq!(h.sink.own_with_tag("DECOY STATUS").len(), 1);
    assert_eq!(h.services.store.fact().status, DecoyStatus::On);
}
