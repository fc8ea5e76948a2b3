use crate::domain::models::{
    booking::{Booking, PaymentSnapshot, StatusPair, StatusUpdate},
    calendar::{CalendarSettings, TimeSlot, WeeklyScheduleEntry},
    deliverable::DeliverableRef,
    notification::{Actor, Notification, NotificationKind},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    /// Bookings dated within `[start, end]` that still hold their slot
    /// (not rejected by the creative, not cancelled by the client).
    async fn find_active_for_service(&self, service_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Booking>, AppError>;
    async fn insert(&self, booking: &Booking) -> Result<Booking, AppError>;
    /// Compare-and-swap: writes only if the stored status still equals
    /// `expected`. `files` are recorded as deliverables in the same write,
    /// so a lost swap leaves no files behind. Returns whether a row was updated.
    async fn update_status(
        &self,
        id: &str,
        expected: StatusPair,
        update: &StatusUpdate,
        files: &[DeliverableRef],
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CalendarRepository: Send + Sync {
    async fn get_active_settings(&self, service_id: &str) -> Result<Option<CalendarSettings>, AppError>;
    async fn get_weekly_schedule(&self, settings_id: &str) -> Result<Vec<WeeklyScheduleEntry>, AppError>;
    async fn get_time_slots(&self, weekly_schedule_id: &str) -> Result<Vec<TimeSlot>, AppError>;
}

#[async_trait]
pub trait DeliverableProvider: Send + Sync {
    async fn has_deliverables(&self, booking_id: &str) -> Result<bool, AppError>;
}

/// Read-only view of the payment collaborator's bookkeeping.
#[async_trait]
pub trait PaymentStatusProvider: Send + Sync {
    async fn payment_snapshot(&self, booking_id: &str) -> Result<Option<PaymentSnapshot>, AppError>;
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, kind: NotificationKind, booking: &Booking, actor: &Actor) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, AppError>;
}
