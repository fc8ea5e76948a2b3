use marketplace_booking::background::{effects_channel, start_notification_worker, EffectSender};
use marketplace_booking::config::Config;
use marketplace_booking::domain::models::booking::{
    ClientStatus, CreativeStatus, NewBookingParams, PaymentOption, PaymentSnapshot, PaymentStatus, StatusPair, StatusUpdate,
};
use marketplace_booking::domain::models::deliverable::DeliverableRef;
use marketplace_booking::domain::models::notification::{Actor, Notification, NotificationKind};
use marketplace_booking::domain::ports::{BookingRepository, NotificationDispatcher, NotificationRepository};
use marketplace_booking::domain::services::availability::AvailabilityService;
use marketplace_booking::domain::services::booking_service::BookingService;
use marketplace_booking::error::AppError;
use marketplace_booking::infra::factory::{assemble, Adapters};
use marketplace_booking::infra::memory::{
    FailingDispatcher, InMemoryBookingRepo, InMemoryCalendarRepo, InMemoryDeliverables, RecordingDispatcher,
};
use std::sync::Arc;
use std::time::Duration;

fn params(price: i64, option: PaymentOption) -> NewBookingParams {
    NewBookingParams {
        service_id: "svc-mem".into(),
        client_user_id: "client".into(),
        creative_user_id: "creative".into(),
        price,
        payment_option: option,
        split_deposit_amount: None,
        booking_date: None,
        start_time: None,
        end_time: None,
    }
}

fn service(bookings: &InMemoryBookingRepo, effects: EffectSender) -> BookingService {
    let repo = Arc::new(bookings.clone());
    let availability = Arc::new(AvailabilityService::new(
        Arc::new(InMemoryCalendarRepo::new()),
        repo.clone(),
        chrono_tz::Tz::UTC,
    ));
    BookingService::new(repo.clone(), Arc::new(bookings.deliverables()), repo, availability, effects)
}

async fn wait_for(recorder: &RecordingDispatcher, count: usize) -> Vec<(NotificationKind, String)> {
    for _ in 0..100 {
        let sent = recorder.sent().unwrap();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    recorder.sent().unwrap()
}

#[tokio::test]
async fn test_dispatch_failure_does_not_block_other_dispatchers() {
    let recorder = RecordingDispatcher::new();
    let dispatchers: Vec<Arc<dyn NotificationDispatcher>> = vec![Arc::new(FailingDispatcher), Arc::new(recorder.clone())];
    let (tx, rx) = effects_channel();
    tokio::spawn(start_notification_worker(rx, dispatchers));

    let bookings = InMemoryBookingRepo::new();
    let svc = service(&bookings, tx);
    let placed = svc.place_booking(params(3000, PaymentOption::Later)).await.unwrap();
    let approved = svc.approve(&placed.booking.id, &Actor::new("creative")).await.unwrap();

    assert_eq!(approved.booking.status(), StatusPair::new(CreativeStatus::InProgress, ClientStatus::InProgress));
    let sent = wait_for(&recorder, 2).await;
    assert_eq!(sent, vec![
        (NotificationKind::BookingPlaced, "creative".to_string()),
        (NotificationKind::BookingApproved, "client".to_string()),
    ]);
}

#[tokio::test]
async fn test_disabled_effects_still_commit() {
    let bookings = InMemoryBookingRepo::new();
    let svc = service(&bookings, EffectSender::disabled());

    let placed = svc.place_booking(params(3000, PaymentOption::Upfront)).await.unwrap();
    let rejected = svc.reject(&placed.booking.id, &Actor::new("creative")).await.unwrap();

    assert_eq!(rejected.effects, vec![NotificationKind::BookingRejected]);
    assert_eq!(rejected.booking.status(), StatusPair::new(CreativeStatus::Rejected, ClientStatus::Placed));
}

#[tokio::test]
async fn test_overpayment_is_treated_as_paid() {
    let bookings = InMemoryBookingRepo::new();
    let svc = service(&bookings, EffectSender::disabled());
    let creative = Actor::new("creative");

    let placed = svc.place_booking(params(10000, PaymentOption::Later)).await.unwrap();
    svc.approve(&placed.booking.id, &creative).await.unwrap();
    bookings.set_payment(&placed.booking.id, PaymentSnapshot {
        payment_status: PaymentStatus::PartiallyPaid,
        amount_paid: 12000,
    }).unwrap();

    let outcome = svc.finalize(&placed.booking.id, &creative, Vec::new()).await.unwrap();
    assert_eq!(outcome.booking.status(), StatusPair::new(CreativeStatus::Completed, ClientStatus::Completed));
}

#[tokio::test]
async fn test_stale_finalize_records_no_files() {
    let bookings = InMemoryBookingRepo::new();
    let svc = service(&bookings, EffectSender::disabled());
    let creative = Actor::new("creative");

    let placed = svc.place_booking(params(10000, PaymentOption::Later)).await.unwrap();
    let approved = svc.approve(&placed.booking.id, &creative).await.unwrap();
    svc.finalize(&placed.booking.id, &creative, vec![DeliverableRef("mem://first.zip".into())]).await.unwrap();

    let update = StatusUpdate { status: approved.booking.status(), approved_at: None, canceled_date: None };
    let stale = vec![DeliverableRef("mem://second.zip".into())];
    let written = bookings.update_status(&placed.booking.id, approved.booking.status(), &update, &stale).await.unwrap();

    assert!(!written);
    let files = bookings.deliverables().files_for(&placed.booking.id).unwrap();
    assert_eq!(files.iter().map(|f| f.file_ref.as_str()).collect::<Vec<_>>(), vec!["mem://first.zip"]);
}

#[tokio::test]
async fn test_invalid_placement_is_rejected() {
    let bookings = InMemoryBookingRepo::new();
    let svc = service(&bookings, EffectSender::disabled());

    let mut same_party = params(1000, PaymentOption::Later);
    same_party.creative_user_id = "client".into();
    assert!(svc.place_booking(same_party).await.is_err());

    let mut deposit_without_split = params(1000, PaymentOption::Upfront);
    deposit_without_split.split_deposit_amount = Some(500);
    assert!(svc.place_booking(deposit_without_split).await.is_err());

    let mut split = params(1000, PaymentOption::Split);
    split.split_deposit_amount = Some(400);
    assert!(svc.place_booking(split).await.is_ok());
}

#[tokio::test]
async fn test_worker_stops_when_senders_are_dropped() {
    let recorder = RecordingDispatcher::new();
    let (tx, rx) = effects_channel();
    let dispatchers: Vec<Arc<dyn NotificationDispatcher>> = vec![Arc::new(recorder.clone())];
    let handle = tokio::spawn(start_notification_worker(rx, dispatchers));

    drop(tx);
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert!(recorder.sent().unwrap().is_empty());
}

#[tokio::test]
async fn test_disabled_config_yields_no_receiver() {
    let config = Config { notifications_enabled: false, ..Config::for_database("sqlite::memory:") };
    let repo = Arc::new(InMemoryBookingRepo::new());
    let adapters = Adapters {
        booking_repo: repo.clone(),
        payments: repo,
        calendar_repo: Arc::new(InMemoryCalendarRepo::new()),
        deliverables: Arc::new(InMemoryDeliverables::new()),
        notification_repo: Arc::new(NoopNotifications),
    };

    let (state, receiver) = assemble(&config, adapters, Vec::new());
    assert!(receiver.is_none());
    let placed = state.bookings.place_booking(params(0, PaymentOption::Free)).await.unwrap();
    assert_eq!(placed.effects, vec![NotificationKind::BookingPlaced]);
}

struct NoopNotifications;

#[async_trait::async_trait]
impl NotificationRepository for NoopNotifications {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        Ok(notification.clone())
    }

    async fn list_for_user(&self, _user_id: &str) -> Result<Vec<Notification>, AppError> {
        Ok(Vec::new())
    }
}
