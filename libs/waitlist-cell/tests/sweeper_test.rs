use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};

use waitlist_cell::{EntryStatus, EntryStore, ExpirationSweeper, WaitlistError};

mod common;
use common::Fixture;

#[tokio::test]
async fn test_stale_offer_expires() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let ana = fx.add_patient(list, "Ana", 60).await;
    fx.force_status(ana.id, EntryStatus::Notified, Utc::now() - Duration::minutes(35))
        .await;

    let report = fx.engine.sweeper.sweep().await.unwrap();

    assert_eq!(report.expired_count, 1);
    assert_eq!(report.expired_entry_ids, vec![ana.id]);
    assert_eq!(fx.entry(ana.id).await.status, EntryStatus::Expired);
}

#[tokio::test]
async fn test_recent_offer_is_kept() {
    let fx = Fixture::new().await;
    let ana = fx.add_patient(fx.waitlist.id, "Ana", 60).await;
    fx.force_status(ana.id, EntryStatus::Notified, Utc::now() - Duration::minutes(10))
        .await;

    let report = fx.engine.sweeper.sweep().await.unwrap();

    assert_eq!(report.expired_count, 0);
    assert_eq!(fx.entry(ana.id).await.status, EntryStatus::Notified);
}

#[tokio::test]
async fn test_only_notified_entries_expire() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let long_ago = Utc::now() - Duration::hours(3);
    let waiting = fx.add_patient(list, "Ana", 300).await;
    let declined = fx.add_patient(list, "Bruno", 200).await;
    fx.force_status(waiting.id, EntryStatus::Waiting, long_ago).await;
    fx.force_status(declined.id, EntryStatus::Declined, long_ago).await;

    let report = fx.engine.sweeper.sweep().await.unwrap();

    assert_eq!(report.expired_count, 0);
    assert_eq!(fx.entry(waiting.id).await.status, EntryStatus::Waiting);
    assert_eq!(fx.entry(declined.id).await.status, EntryStatus::Declined);
}

#[tokio::test]
async fn test_second_sweep_finds_nothing() {
    let fx = Fixture::new().await;
    let ana = fx.add_patient(fx.waitlist.id, "Ana", 60).await;
    fx.force_status(ana.id, EntryStatus::Notified, Utc::now() - Duration::minutes(45))
        .await;

    let first = fx.engine.sweeper.sweep().await.unwrap();
    let second = fx.engine.sweeper.sweep().await.unwrap();

    assert_eq!(first.expired_count, 1);
    assert_eq!(second.expired_count, 0);
    assert!(second.expired_entry_ids.is_empty());
}

#[tokio::test]
async fn test_confirmation_before_sweep_wins() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let ana = fx.add_patient(list, "Ana", 60).await;
    fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();
    fx.engine.resolution.confirm(list, ana.patient_id).await.unwrap();

    let report = fx
        .engine
        .sweeper
        .sweep_at(Utc::now() + Duration::hours(2))
        .await
        .unwrap();

    assert_eq!(report.expired_count, 0);
    assert_eq!(fx.entry(ana.id).await.status, EntryStatus::Confirmed);
}

#[tokio::test]
async fn test_late_reply_after_expiry_is_rejected() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let ana = fx.add_patient(list, "Ana", 60).await;
    fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();

    fx.engine
        .sweeper
        .sweep_at(Utc::now() + Duration::minutes(31))
        .await
        .unwrap();

    let result = fx.engine.resolution.confirm(list, ana.patient_id).await;
    assert_matches!(result, Err(WaitlistError::Expired));
}

#[tokio::test]
async fn test_expiry_unblocks_next_dispatch() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let ana = fx.add_patient(list, "Ana", 60).await;
    let bruno = fx.add_patient(list, "Bruno", 50).await;
    fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();

    assert_matches!(
        fx.engine.dispatcher.dispatch(list, "14:30").await,
        Err(WaitlistError::AlreadyBusy(id)) if id == ana.id
    );

    fx.engine
        .sweeper
        .sweep_at(Utc::now() + Duration::minutes(31))
        .await
        .unwrap();

    let outcome = fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();
    assert_eq!(outcome.offer.entry_id, bruno.id);
}

#[tokio::test]
async fn test_custom_timeout() {
    let fx = Fixture::new().await;
    let ana = fx.add_patient(fx.waitlist.id, "Ana", 60).await;
    fx.force_status(ana.id, EntryStatus::Notified, Utc::now() - Duration::minutes(10))
        .await;

    let sweeper = ExpirationSweeper::new(fx.store.clone() as Arc<dyn EntryStore>, 5);
    let report = sweeper.sweep().await.unwrap();

    assert_eq!(report.expired_entry_ids, vec![ana.id]);
}
