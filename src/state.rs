use std::sync::Arc;
use crate::config::Config;
use crate::domain::ports::{
    BookingRepository, CalendarRepository, DeliverableProvider, NotificationDispatcher,
    NotificationRepository, PaymentStatusProvider,
};
use crate::domain::services::availability::AvailabilityService;
use crate::domain::services::booking_service::BookingService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub calendar_repo: Arc<dyn CalendarRepository>,
    pub deliverables: Arc<dyn DeliverableProvider>,
    pub payments: Arc<dyn PaymentStatusProvider>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub dispatchers: Vec<Arc<dyn NotificationDispatcher>>,
    pub availability: Arc<AvailabilityService>,
    pub bookings: Arc<BookingService>,
}
