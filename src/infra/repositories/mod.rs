pub mod sqlite_booking_repo;
pub mod sqlite_calendar_repo;
pub mod sqlite_deliverable_repo;
pub mod sqlite_notification_repo;

pub mod postgres_booking_repo;
pub mod postgres_calendar_repo;
pub mod postgres_deliverable_repo;
pub mod postgres_notification_repo;
