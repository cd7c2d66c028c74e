use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::predicate;
use uuid::Uuid;

use waitlist_cell::{
    DeliveryStatus, EngineSettings, EntryStatus, EntryStore, NotifierPayload, OfferDispatcher,
    OfferNotifier, WaitlistEntry, WaitlistError,
};

mod common;
use common::Fixture;

mockall::mock! {
    pub Transport {}

    #[async_trait]
    impl OfferNotifier for Transport {
        async fn send_offer(&self, payload: &NotifierPayload) -> Result<(), WaitlistError>;
    }
}

#[tokio::test]
async fn test_dispatch_selects_oldest_waiting_entry() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let newest = fx.add_patient(list, "Carla", 10).await;
    let oldest = fx.add_patient(list, "Ana", 30).await;
    let middle = fx.add_patient(list, "Bruno", 20).await;

    let outcome = fx.engine.dispatcher.dispatch(list, "20/10/2026 14:30").await.unwrap();

    assert_eq!(outcome.offer.entry_id, oldest.id);
    assert_eq!(outcome.offer.patient_name, "Ana");
    assert_eq!(outcome.delivery, DeliveryStatus::Delivered);
    assert_eq!(fx.entry(oldest.id).await.status, EntryStatus::Notified);
    assert_eq!(fx.entry(middle.id).await.status, EntryStatus::Waiting);
    assert_eq!(fx.entry(newest.id).await.status, EntryStatus::Waiting);
}

#[tokio::test]
async fn test_dispatch_breaks_added_at_ties_by_id() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let joined = Utc::now() - Duration::minutes(5);

    let mut first = WaitlistEntry::new(list, Uuid::new_v4(), joined);
    let mut second = WaitlistEntry::new(list, Uuid::new_v4(), joined);
    if second.id < first.id {
        std::mem::swap(&mut first, &mut second);
    }
    fx.store.insert_entry(second.clone()).await;
    fx.store.insert_entry(first.clone()).await;

    let outcome = fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();

    assert_eq!(outcome.offer.entry_id, first.id);
}

#[tokio::test]
async fn test_dispatch_normalises_phone_in_payload() {
    let fx = Fixture::new().await;
    fx.add_patient(fx.waitlist.id, "Ana", 5).await;

    fx.engine.dispatcher.dispatch(fx.waitlist.id, "14:30").await.unwrap();

    let sent = fx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].phone, "5511987654321");
    assert_eq!(sent[0].slot_time, "14:30");
    assert_eq!(sent[0].waitlist_id, fx.waitlist.id);
}

#[tokio::test]
async fn test_dispatch_empty_queue() {
    let fx = Fixture::new().await;

    let result = fx.engine.dispatcher.dispatch(fx.waitlist.id, "14:30").await;

    assert_matches!(result, Err(WaitlistError::EmptyQueue));
    assert!(fx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_refuses_second_offer_while_one_is_outstanding() {
    let fx = Fixture::new().await;
    let list = fx.waitlist.id;
    let first = fx.add_patient(list, "Ana", 20).await;
    let second = fx.add_patient(list, "Bruno", 10).await;

    fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();
    let result = fx.engine.dispatcher.dispatch(list, "15:00").await;

    assert_matches!(result, Err(WaitlistError::AlreadyBusy(id)) if id == first.id);
    assert_eq!(fx.entry(second.id).await.status, EntryStatus::Waiting);
    assert_eq!(fx.count_with_status(list, EntryStatus::Notified).await, 1);
}

#[tokio::test]
async fn test_quota_exceeded_consumes_no_entry() {
    let fx = Fixture::with_limit(0).await;
    let entry = fx.add_patient(fx.waitlist.id, "Ana", 5).await;

    let result = fx.engine.dispatcher.dispatch(fx.waitlist.id, "14:30").await;

    assert_matches!(result, Err(WaitlistError::QuotaExceeded));
    assert_eq!(fx.entry(entry.id).await.status, EntryStatus::Waiting);
    assert!(fx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_quota_checked_before_busy() {
    let fx = Fixture::with_limit(1).await;
    let list = fx.waitlist.id;
    fx.add_patient(list, "Ana", 20).await;
    fx.add_patient(list, "Bruno", 10).await;

    fx.engine.dispatcher.dispatch(list, "14:30").await.unwrap();
    let result = fx.engine.dispatcher.dispatch(list, "14:30").await;

    assert_matches!(result, Err(WaitlistError::QuotaExceeded));
}

#[tokio::test]
async fn test_successful_delivery_charges_quota_once() {
    let fx = Fixture::new().await;
    fx.add_patient(fx.waitlist.id, "Ana", 5).await;

    fx.engine.dispatcher.dispatch(fx.waitlist.id, "14:30").await.unwrap();

    assert_eq!(fx.messages_sent(fx.tenant_id).await, 1);
}

#[tokio::test]
async fn test_failed_delivery_keeps_offer_and_charges_nothing() {
    let fx = Fixture::new().await;
    let entry = fx.add_patient(fx.waitlist.id, "Ana", 5).await;
    fx.notifier.fail_deliveries(true);

    let outcome = fx.engine.dispatcher.dispatch(fx.waitlist.id, "14:30").await.unwrap();

    assert!(!outcome.delivered());
    assert_matches!(outcome.delivery, DeliveryStatus::Failed { ref reason } if reason.contains("transport down"));
    assert_eq!(fx.entry(entry.id).await.status, EntryStatus::Notified);
    assert_eq!(fx.messages_sent(fx.tenant_id).await, 0);
}

#[tokio::test]
async fn test_patient_without_phone_is_not_sent() {
    let fx = Fixture::new().await;
    let entry = fx
        .add_patient_with_phone(fx.waitlist.id, "Ana", None, 5)
        .await;

    let outcome = fx.engine.dispatcher.dispatch(fx.waitlist.id, "14:30").await.unwrap();

    assert!(!outcome.delivered());
    assert!(fx.notifier.sent().is_empty());
    assert_eq!(fx.entry(entry.id).await.status, EntryStatus::Notified);
}

#[tokio::test]
async fn test_unknown_and_inactive_waitlists() {
    let fx = Fixture::new().await;
    let unknown = Uuid::new_v4();

    let result = fx.engine.dispatcher.dispatch(unknown, "14:30").await;
    assert_matches!(result, Err(WaitlistError::WaitlistNotFound(id)) if id == unknown);

    let mut closed = fx.add_waitlist(fx.tenant_id, "Closed").await;
    closed.is_active = false;
    fx.store.insert_waitlist(closed.clone()).await;
    fx.add_patient(closed.id, "Ana", 5).await;

    let result = fx.engine.dispatcher.dispatch(closed.id, "14:30").await;
    assert_matches!(result, Err(WaitlistError::WaitlistInactive(_)));
}

#[tokio::test]
async fn test_blank_slot_description_is_rejected() {
    let fx = Fixture::new().await;
    let entry = fx.add_patient(fx.waitlist.id, "Ana", 5).await;

    let result = fx.engine.dispatcher.dispatch(fx.waitlist.id, "   ").await;

    assert_matches!(result, Err(WaitlistError::Validation(_)));
    assert_eq!(fx.entry(entry.id).await.status, EntryStatus::Waiting);
}

#[tokio::test]
async fn test_notifier_receives_exactly_one_payload() {
    let fx = Fixture::new().await;
    let entry = fx.add_patient(fx.waitlist.id, "Ana", 5).await;

    let mut transport = MockTransport::new();
    transport
        .expect_send_offer()
        .with(predicate::function(move |p: &NotifierPayload| {
            p.patient_id == entry.patient_id && p.patient_name == "Ana" && p.slot_time == "09:00"
        }))
        .times(1)
        .returning(|_| Ok(()));

    let dispatcher = OfferDispatcher::new(
        fx.store.clone() as Arc<dyn EntryStore>,
        Arc::new(transport),
        EngineSettings::default(),
    );

    let outcome = dispatcher.dispatch(fx.waitlist.id, "09:00").await.unwrap();
    assert!(outcome.delivered());
}
