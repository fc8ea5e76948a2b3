use crate::domain::models::booking::Booking;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Which side of a booking an actor or recipient is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Creative,
    Client,
}

impl Party {
    pub fn user_id<'a>(&self, booking: &'a Booking) -> &'a str {
        match self {
            Party::Creative => &booking.creative_user_id,
            Party::Client => &booking.client_user_id,
        }
    }
}

/// The user performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingPlaced,
    BookingApproved,
    PaymentRequired,
    BookingRejected,
    BookingCancelled,
    DeliverablesReady,
    DeliverablesLocked,
    BookingCompleted,
    DownloadCompleted,
    PaymentReminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingPlaced => "booking_placed",
            NotificationKind::BookingApproved => "booking_approved",
            NotificationKind::PaymentRequired => "payment_required",
            NotificationKind::BookingRejected => "booking_rejected",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::DeliverablesReady => "deliverables_ready",
            NotificationKind::DeliverablesLocked => "deliverables_locked",
            NotificationKind::BookingCompleted => "booking_completed",
            NotificationKind::DownloadCompleted => "download_completed",
            NotificationKind::PaymentReminder => "payment_reminder",
        }
    }

    pub fn recipient(&self) -> Party {
        match self {
            NotificationKind::BookingPlaced
            | NotificationKind::BookingCancelled
            | NotificationKind::DownloadCompleted => Party::Creative,
            NotificationKind::BookingApproved
            | NotificationKind::PaymentRequired
            | NotificationKind::BookingRejected
            | NotificationKind::DeliverablesReady
            | NotificationKind::DeliverablesLocked
            | NotificationKind::BookingCompleted
            | NotificationKind::PaymentReminder => Party::Client,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::BookingPlaced => "New booking request",
            NotificationKind::BookingApproved => "Your booking was approved",
            NotificationKind::PaymentRequired => "Payment required for your booking",
            NotificationKind::BookingRejected => "Your booking was declined",
            NotificationKind::BookingCancelled => "A booking was cancelled",
            NotificationKind::DeliverablesReady => "Your files are ready to download",
            NotificationKind::DeliverablesLocked => "Your files are ready once payment is complete",
            NotificationKind::BookingCompleted => "Your booking is complete",
            NotificationKind::DownloadCompleted => "Client downloaded the deliverables",
            NotificationKind::PaymentReminder => "Payment reminder",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-app notification record.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Notification {
    pub id: String,
    pub booking_id: String,
    pub recipient_user_id: String,
    pub actor_user_id: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, booking: &Booking, actor: &Actor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            recipient_user_id: kind.recipient().user_id(booking).to_string(),
            actor_user_id: actor.user_id.clone(),
            kind: kind.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}
