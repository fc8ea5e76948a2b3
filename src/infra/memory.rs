//! In-process adapters for the booking ports.
//!
//! Used by the test suites and by embedders that drive the engine without a
//! database. Every store is a cloneable handle over shared state.

use crate::domain::models::booking::{Booking, PaymentSnapshot, StatusPair, StatusUpdate};
use crate::domain::models::calendar::{CalendarSettings, ServiceCalendar, TimeSlot, WeeklyScheduleEntry};
use crate::domain::models::deliverable::{Deliverable, DeliverableRef};
use crate::domain::models::notification::{Actor, NotificationKind};
use crate::domain::ports::{
    BookingRepository, CalendarRepository, DeliverableProvider, NotificationDispatcher, PaymentStatusProvider,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    m.lock().map_err(|_| AppError::Internal("Mutex lock failed".to_string()))
}

/// Booking store that also serves as the payment collaborator. Deliverables
/// recorded by a status update land in the store returned by `deliverables`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingRepo {
    bookings: Arc<Mutex<HashMap<String, Booking>>>,
    deliverables: InMemoryDeliverables,
}

impl InMemoryBookingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliverables(&self) -> InMemoryDeliverables {
        self.deliverables.clone()
    }

    /// Records a payment made outside the engine.
    pub fn set_payment(&self, booking_id: &str, snapshot: PaymentSnapshot) -> Result<(), AppError> {
        let mut guard = lock(&self.bookings)?;
        let booking = guard.get_mut(booking_id)
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))?;
        booking.payment_status = snapshot.payment_status;
        booking.amount_paid = snapshot.amount_paid;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        Ok(lock(&self.bookings)?.get(id).cloned())
    }

    async fn find_active_for_service(&self, service_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let mut found: Vec<Booking> = lock(&self.bookings)?
            .values()
            .filter(|b| b.service_id == service_id && b.status().occupies_calendar())
            .filter(|b| b.booking_date.is_some_and(|d| d >= start && d <= end))
            .cloned()
            .collect();
        found.sort_by_key(|b| (b.booking_date, b.start_time));
        Ok(found)
    }

    async fn insert(&self, booking: &Booking) -> Result<Booking, AppError> {
        let mut guard = lock(&self.bookings)?;
        if guard.contains_key(&booking.id) {
            return Err(AppError::Conflict("Booking already exists".into()));
        }
        guard.insert(booking.id.clone(), booking.clone());
        Ok(booking.clone())
    }

    async fn update_status(&self, id: &str, expected: StatusPair, update: &StatusUpdate, files: &[DeliverableRef]) -> Result<bool, AppError> {
        let mut guard = lock(&self.bookings)?;
        match guard.get_mut(id) {
            Some(booking) if booking.status() == expected => {
                lock(&self.deliverables.files)?.extend(files.iter().map(|f| Deliverable::new(id, f)));
                booking.apply_update(update);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PaymentStatusProvider for InMemoryBookingRepo {
    async fn payment_snapshot(&self, booking_id: &str) -> Result<Option<PaymentSnapshot>, AppError> {
        Ok(lock(&self.bookings)?.get(booking_id).map(|b| PaymentSnapshot {
            payment_status: b.payment_status,
            amount_paid: b.amount_paid,
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendarRepo {
    settings: Arc<Mutex<Vec<CalendarSettings>>>,
    schedule: Arc<Mutex<Vec<WeeklyScheduleEntry>>>,
}

impl InMemoryCalendarRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a calendar; slots stay attached to their schedule entries.
    pub fn with_calendar(self, calendar: ServiceCalendar) -> Result<Self, AppError> {
        lock(&self.settings)?.push(calendar.settings);
        lock(&self.schedule)?.extend(calendar.schedule);
        Ok(self)
    }
}

#[async_trait]
impl CalendarRepository for InMemoryCalendarRepo {
    async fn get_active_settings(&self, service_id: &str) -> Result<Option<CalendarSettings>, AppError> {
        Ok(lock(&self.settings)?
            .iter()
            .rev()
            .find(|s| s.service_id == service_id && s.is_active)
            .cloned())
    }

    async fn get_weekly_schedule(&self, settings_id: &str) -> Result<Vec<WeeklyScheduleEntry>, AppError> {
        Ok(lock(&self.schedule)?
            .iter()
            .filter(|e| e.calendar_settings_id == settings_id)
            .map(|e| WeeklyScheduleEntry { time_slots: Vec::new(), ..e.clone() })
            .collect())
    }

    async fn get_time_slots(&self, weekly_schedule_id: &str) -> Result<Vec<TimeSlot>, AppError> {
        let mut slots: Vec<TimeSlot> = lock(&self.schedule)?
            .iter()
            .filter(|e| e.id == weekly_schedule_id)
            .flat_map(|e| e.time_slots.iter().cloned())
            .collect();
        slots.sort_by_key(|s| s.time);
        Ok(slots)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliverables {
    files: Arc<Mutex<Vec<Deliverable>>>,
}

impl InMemoryDeliverables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files_for(&self, booking_id: &str) -> Result<Vec<Deliverable>, AppError> {
        Ok(lock(&self.files)?.iter().filter(|d| d.booking_id == booking_id).cloned().collect())
    }
}

#[async_trait]
impl DeliverableProvider for InMemoryDeliverables {
    async fn has_deliverables(&self, booking_id: &str) -> Result<bool, AppError> {
        Ok(lock(&self.files)?.iter().any(|d| d.booking_id == booking_id))
    }
}

/// Dispatcher that records what it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<(NotificationKind, String)>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(kind, recipient_user_id)` pairs in dispatch order.
    pub fn sent(&self) -> Result<Vec<(NotificationKind, String)>, AppError> {
        Ok(lock(&self.sent)?.clone())
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, kind: NotificationKind, booking: &Booking, _actor: &Actor) -> Result<(), AppError> {
        lock(&self.sent)?.push((kind, kind.recipient().user_id(booking).to_string()));
        Ok(())
    }
}

/// Dispatcher whose delivery always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn notify(&self, kind: NotificationKind, _booking: &Booking, _actor: &Actor) -> Result<(), AppError> {
        Err(AppError::ExternalService(format!("Delivery of {} refused", kind)))
    }
}
