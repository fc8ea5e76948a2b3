use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};
use crate::background::{Effect, EffectSender};
use crate::domain::models::booking::{Booking, NewBookingParams};
use crate::domain::models::deliverable::DeliverableRef;
use crate::domain::models::notification::{Actor, NotificationKind};
use crate::domain::ports::{BookingRepository, DeliverableProvider, PaymentStatusProvider};
use crate::domain::services::availability::{is_bookable, AvailabilityService};
use crate::domain::services::lifecycle::{self, BookingAction};
use crate::error::AppError;

/// Result of a booking command: the booking as committed and the
/// notifications handed to the effects channel.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub booking: Booking,
    pub effects: Vec<NotificationKind>,
}

pub struct BookingService {
    booking_repo: Arc<dyn BookingRepository>,
    deliverables: Arc<dyn DeliverableProvider>,
    payments: Arc<dyn PaymentStatusProvider>,
    availability: Arc<AvailabilityService>,
    effects: EffectSender,
}

impl BookingService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        deliverables: Arc<dyn DeliverableProvider>,
        payments: Arc<dyn PaymentStatusProvider>,
        availability: Arc<AvailabilityService>,
        effects: EffectSender,
    ) -> Self {
        Self { booking_repo, deliverables, payments, availability, effects }
    }

    pub async fn place_booking(&self, params: NewBookingParams) -> Result<ActionOutcome, AppError> {
        params.validate()?;

        if let (Some(date), Some(time)) = (params.booking_date, params.start_time)
            && let Some(calendar) = self.availability.load_calendar(&params.service_id).await?
        {
            let tz = self.availability.timezone(&calendar);
            let booked = self.booking_repo.find_active_for_service(&params.service_id, date, date).await?;
            if !is_bookable(&calendar, tz, date, time, &booked, Utc::now())? {
                warn!(service_id = %params.service_id, %date, %time, "Booking rejected: slot not available");
                return Err(AppError::Conflict("Selected time slot is not available".into()));
            }
        }

        let booking = self.booking_repo.insert(&Booking::new(params)).await?;
        info!(booking_id = %booking.id, service_id = %booking.service_id, "Booking placed");

        let client = Actor::new(booking.client_user_id.clone());
        let effects = vec![NotificationKind::BookingPlaced];
        self.emit(&booking, &client, &effects);
        Ok(ActionOutcome { booking, effects })
    }

    /// Loads a booking on behalf of one of its two parties.
    pub async fn get_booking(&self, booking_id: &str, actor: &Actor) -> Result<Booking, AppError> {
        let booking = self.load(booking_id).await?;
        if actor.user_id != booking.client_user_id && actor.user_id != booking.creative_user_id {
            return Err(AppError::Forbidden("Not a party to this booking".into()));
        }
        Ok(booking)
    }

    pub async fn approve(&self, booking_id: &str, actor: &Actor) -> Result<ActionOutcome, AppError> {
        self.perform(booking_id, actor, BookingAction::Approve).await
    }

    pub async fn reject(&self, booking_id: &str, actor: &Actor) -> Result<ActionOutcome, AppError> {
        self.perform(booking_id, actor, BookingAction::Reject).await
    }

    pub async fn cancel(&self, booking_id: &str, actor: &Actor) -> Result<ActionOutcome, AppError> {
        self.perform(booking_id, actor, BookingAction::Cancel).await
    }

    pub async fn mark_download_complete(&self, booking_id: &str, actor: &Actor) -> Result<ActionOutcome, AppError> {
        self.perform(booking_id, actor, BookingAction::MarkDownloadComplete).await
    }

    pub async fn send_payment_reminder(&self, booking_id: &str, actor: &Actor) -> Result<ActionOutcome, AppError> {
        self.perform(booking_id, actor, BookingAction::SendPaymentReminder).await
    }

    /// Finalizes delivered work. `files` are recorded in the same write as
    /// the status swap; previously attached deliverables also count as files.
    pub async fn finalize(&self, booking_id: &str, actor: &Actor, files: Vec<DeliverableRef>) -> Result<ActionOutcome, AppError> {
        let mut booking = self.load(booking_id).await?;
        let action = BookingAction::Finalize { has_files: false };
        lifecycle::authorize(&booking, actor, &action)?;
        lifecycle::apply(&booking, &action, Utc::now())?;

        let has_files = !files.is_empty() || self.deliverables.has_deliverables(booking_id).await?;
        self.overlay_payment(&mut booking).await?;
        self.commit(booking, actor, BookingAction::Finalize { has_files }, &files).await
    }

    async fn perform(&self, booking_id: &str, actor: &Actor, action: BookingAction) -> Result<ActionOutcome, AppError> {
        let mut booking = self.load(booking_id).await?;
        lifecycle::authorize(&booking, actor, &action)?;
        self.overlay_payment(&mut booking).await?;
        self.commit(booking, actor, action, &[]).await
    }

    async fn commit(&self, mut booking: Booking, actor: &Actor, action: BookingAction, files: &[DeliverableRef]) -> Result<ActionOutcome, AppError> {
        let transition = lifecycle::apply(&booking, &action, Utc::now())?;

        if transition.changes_state() {
            let written = self.booking_repo.update_status(&booking.id, transition.from, &transition.update, files).await?;
            if !written {
                let current = match self.booking_repo.find_by_id(&booking.id).await? {
                    Some(latest) => latest.status(),
                    None => transition.from,
                };
                warn!(booking_id = %booking.id, action = action.name(), %current, "Concurrent update won the race");
                return Err(AppError::InvalidStateTransition { action: action.name(), current });
            }
            if !files.is_empty() {
                info!(booking_id = %booking.id, count = files.len(), "Deliverables attached");
            }
            booking.apply_update(&transition.update);
            info!(
                booking_id = %booking.id,
                from = %transition.from,
                to = %booking.status(),
                "Booking transitioned: {}",
                action.name()
            );
        }

        self.emit(&booking, actor, &transition.effects);
        Ok(ActionOutcome { booking, effects: transition.effects })
    }

    async fn load(&self, booking_id: &str) -> Result<Booking, AppError> {
        self.booking_repo.find_by_id(booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))
    }

    async fn overlay_payment(&self, booking: &mut Booking) -> Result<(), AppError> {
        if let Some(snapshot) = self.payments.payment_snapshot(&booking.id).await? {
            booking.payment_status = snapshot.payment_status;
            booking.amount_paid = snapshot.amount_paid;
        }
        Ok(())
    }

    fn emit(&self, booking: &Booking, actor: &Actor, kinds: &[NotificationKind]) {
        for kind in kinds {
            self.effects.emit(Effect { kind: *kind, booking: booking.clone(), actor: actor.clone() });
        }
    }
}
