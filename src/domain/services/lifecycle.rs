//! Dual-status booking state machine.
//!
//! `apply` is the single source of truth for which action is legal in which
//! state and where it leads. It performs no I/O; the booking service loads,
//! persists and dispatches around it.

use crate::domain::models::booking::{
    Booking, ClientStatus as Cl, CreativeStatus as Cr, PaymentOption, PaymentStatus, StatusPair, StatusUpdate,
};
use crate::domain::models::notification::{Actor, NotificationKind, Party};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Approve,
    Reject,
    Cancel,
    Finalize { has_files: bool },
    MarkDownloadComplete,
    SendPaymentReminder,
}

impl BookingAction {
    pub fn name(&self) -> &'static str {
        match self {
            BookingAction::Approve => "approve",
            BookingAction::Reject => "reject",
            BookingAction::Cancel => "cancel",
            BookingAction::Finalize { .. } => "finalize",
            BookingAction::MarkDownloadComplete => "mark download complete for",
            BookingAction::SendPaymentReminder => "send payment reminder for",
        }
    }

    /// The side of the booking allowed to perform the action.
    pub fn party(&self) -> Party {
        match self {
            BookingAction::Approve
            | BookingAction::Reject
            | BookingAction::Finalize { .. }
            | BookingAction::SendPaymentReminder => Party::Creative,
            BookingAction::Cancel | BookingAction::MarkDownloadComplete => Party::Client,
        }
    }
}

/// Outcome of a legal action: the write to perform and the notifications
/// to emit once it is committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: StatusPair,
    pub update: StatusUpdate,
    pub effects: Vec<NotificationKind>,
}

impl Transition {
    pub fn changes_state(&self) -> bool {
        self.update.status != self.from
            || self.update.approved_at.is_some()
            || self.update.canceled_date.is_some()
    }
}

pub fn authorize(booking: &Booking, actor: &Actor, action: &BookingAction) -> Result<(), AppError> {
    let party = action.party();
    if party.user_id(booking) != actor.user_id {
        let side = match party {
            Party::Creative => "creative",
            Party::Client => "client",
        };
        return Err(AppError::Forbidden(format!(
            "Only the booking's {} can {} this booking",
            side,
            action.name()
        )));
    }
    Ok(())
}

/// `paymentStatus = fully_paid OR amountPaid >= price`. An overpayment is
/// reported and otherwise treated as fully paid.
pub fn is_fully_paid(booking: &Booking) -> bool {
    if booking.amount_paid > booking.price {
        warn!(
            booking_id = %booking.id,
            amount_paid = booking.amount_paid,
            price = booking.price,
            "{}",
            AppError::ExternalInconsistency("amount paid exceeds price".into())
        );
    }
    booking.payment_status == PaymentStatus::FullyPaid || booking.amount_paid >= booking.price
}

pub fn approval_target(price: i64, option: PaymentOption) -> StatusPair {
    if price == 0 || option == PaymentOption::Later || option == PaymentOption::Free {
        StatusPair::new(Cr::InProgress, Cl::InProgress)
    } else {
        StatusPair::new(Cr::AwaitingPayment, Cl::PaymentRequired)
    }
}

/// Paid bookings whose balance is settled after delivery.
pub fn is_deferred(price: i64, option: PaymentOption) -> bool {
    price > 0 && matches!(option, PaymentOption::Split | PaymentOption::Later)
}

pub fn finalize_target(price: i64, option: PaymentOption, has_files: bool, fully_paid: bool) -> StatusPair {
    match (is_deferred(price, option), has_files, fully_paid) {
        (false, true, _) | (true, true, true) => StatusPair::new(Cr::Completed, Cl::Download),
        (false, false, _) | (true, false, true) => StatusPair::new(Cr::Completed, Cl::Completed),
        (true, true, false) => StatusPair::new(Cr::AwaitingPayment, Cl::Locked),
        (true, false, false) => StatusPair::new(Cr::AwaitingPayment, Cl::PaymentRequired),
    }
}

fn finalize_effect(target: StatusPair) -> NotificationKind {
    match target.client {
        Cl::Download => NotificationKind::DeliverablesReady,
        Cl::Locked => NotificationKind::DeliverablesLocked,
        Cl::PaymentRequired => NotificationKind::PaymentRequired,
        _ => NotificationKind::BookingCompleted,
    }
}

/// Computes the transition for `action` from the booking's current state.
/// Authorization is checked separately and first.
pub fn apply(booking: &Booking, action: &BookingAction, now: DateTime<Utc>) -> Result<Transition, AppError> {
    let from = booking.status();
    let rejected = || AppError::InvalidStateTransition { action: action.name(), current: from };
    let to = |status: StatusPair| StatusUpdate { status, approved_at: None, canceled_date: None };

    let (update, effects) = match (action, from.creative, from.client) {
        (BookingAction::Approve, Cr::PendingApproval, Cl::Placed) => {
            let target = approval_target(booking.price, booking.payment_option);
            let effect = if target.client == Cl::PaymentRequired {
                NotificationKind::PaymentRequired
            } else {
                NotificationKind::BookingApproved
            };
            (StatusUpdate { approved_at: Some(now), ..to(target) }, vec![effect])
        }
        (BookingAction::Reject, Cr::PendingApproval, Cl::Placed) => (
            StatusUpdate { canceled_date: Some(now), ..to(StatusPair::new(Cr::Rejected, from.client)) },
            vec![NotificationKind::BookingRejected],
        ),
        (BookingAction::Cancel, Cr::PendingApproval, Cl::Placed) => (
            StatusUpdate { canceled_date: Some(now), ..to(StatusPair::new(from.creative, Cl::Cancelled)) },
            vec![NotificationKind::BookingCancelled],
        ),
        (BookingAction::Finalize { has_files }, Cr::InProgress, _) => {
            // Payment only gates deferred bookings.
            let fully_paid = is_deferred(booking.price, booking.payment_option) && is_fully_paid(booking);
            let target = finalize_target(booking.price, booking.payment_option, *has_files, fully_paid);
            (to(target), vec![finalize_effect(target)])
        }
        (BookingAction::MarkDownloadComplete, _, Cl::Download) => (
            to(StatusPair::new(from.creative, Cl::Completed)),
            vec![NotificationKind::DownloadCompleted],
        ),
        (BookingAction::SendPaymentReminder, _, Cl::PaymentRequired | Cl::Locked) => {
            (to(from), vec![NotificationKind::PaymentReminder])
        }
        _ => return Err(rejected()),
    };

    if !update.status.is_reachable() {
        return Err(AppError::Internal(format!(
            "{} from {} produced unreachable state {}",
            action.name(),
            from,
            update.status
        )));
    }

    Ok(Transition { from, update, effects })
}
