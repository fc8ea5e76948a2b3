use crate::domain::models::wall_clock::WallClock;
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::Validation(format!("Unknown {}: {}", $label, other))),
                }
            }
        }
    };
}

string_enum!(CreativeStatus, "creative status" {
    PendingApproval => "pending_approval",
    InProgress => "in_progress",
    AwaitingPayment => "awaiting_payment",
    Rejected => "rejected",
    Completed => "completed",
});

string_enum!(ClientStatus, "client status" {
    Placed => "placed",
    InProgress => "in_progress",
    PaymentRequired => "payment_required",
    Locked => "locked",
    Download => "download",
    Completed => "completed",
    Cancelled => "cancelled",
});

string_enum!(PaymentOption, "payment option" {
    Free => "free",
    Upfront => "upfront",
    Split => "split",
    Later => "later",
});

string_enum!(PaymentStatus, "payment status" {
    Pending => "pending",
    PartiallyPaid => "partially_paid",
    FullyPaid => "fully_paid",
});

/// The two legs of a booking's status, always moved together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusPair {
    pub creative: CreativeStatus,
    pub client: ClientStatus,
}

impl StatusPair {
    pub const INITIAL: StatusPair = StatusPair::new(CreativeStatus::PendingApproval, ClientStatus::Placed);

    /// Every pair the lifecycle table can produce from `INITIAL`.
    pub const REACHABLE: [StatusPair; 8] = [
        StatusPair::INITIAL,
        StatusPair::new(CreativeStatus::InProgress, ClientStatus::InProgress),
        StatusPair::new(CreativeStatus::AwaitingPayment, ClientStatus::PaymentRequired),
        StatusPair::new(CreativeStatus::AwaitingPayment, ClientStatus::Locked),
        StatusPair::new(CreativeStatus::Rejected, ClientStatus::Placed),
        StatusPair::new(CreativeStatus::PendingApproval, ClientStatus::Cancelled),
        StatusPair::new(CreativeStatus::Completed, ClientStatus::Download),
        StatusPair::new(CreativeStatus::Completed, ClientStatus::Completed),
    ];

    pub const fn new(creative: CreativeStatus, client: ClientStatus) -> Self {
        Self { creative, client }
    }

    pub fn is_reachable(&self) -> bool {
        Self::REACHABLE.contains(self)
    }

    /// Bookings in these states hold their slot on the calendar.
    pub fn occupies_calendar(&self) -> bool {
        self.creative != CreativeStatus::Rejected && self.client != ClientStatus::Cancelled
    }
}

impl fmt::Display for StatusPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.creative, self.client)
    }
}

/// Amounts are integer minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub service_id: String,
    pub client_user_id: String,
    pub creative_user_id: String,
    pub price: i64,
    pub payment_option: PaymentOption,
    pub split_deposit_amount: Option<i64>,
    pub booking_date: Option<NaiveDate>,
    pub start_time: Option<WallClock>,
    pub end_time: Option<WallClock>,
    pub creative_status: CreativeStatus,
    pub client_status: ClientStatus,
    pub payment_status: PaymentStatus,
    pub amount_paid: i64,
    pub order_date: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub canceled_date: Option<DateTime<Utc>>,
}

pub struct NewBookingParams {
    pub service_id: String,
    pub client_user_id: String,
    pub creative_user_id: String,
    pub price: i64,
    pub payment_option: PaymentOption,
    pub split_deposit_amount: Option<i64>,
    pub booking_date: Option<NaiveDate>,
    pub start_time: Option<WallClock>,
    pub end_time: Option<WallClock>,
}

impl NewBookingParams {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.price < 0 {
            return Err(AppError::Validation("Price cannot be negative".into()));
        }
        if self.client_user_id == self.creative_user_id {
            return Err(AppError::Validation("Client and creative must be different users".into()));
        }
        match (self.payment_option, self.split_deposit_amount) {
            (PaymentOption::Split, Some(deposit)) if deposit <= 0 || deposit > self.price => {
                return Err(AppError::Validation("Split deposit must be positive and not exceed the price".into()));
            }
            (PaymentOption::Split, _) => {}
            (_, Some(_)) => {
                return Err(AppError::Validation("Split deposit is only valid for split payments".into()));
            }
            (_, None) => {}
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && end <= start
        {
            return Err(AppError::Validation("End time must be after start time".into()));
        }
        if self.start_time.is_some() && self.booking_date.is_none() {
            return Err(AppError::Validation("A start time requires a booking date".into()));
        }
        Ok(())
    }
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            service_id: params.service_id,
            client_user_id: params.client_user_id,
            creative_user_id: params.creative_user_id,
            price: params.price,
            payment_option: params.payment_option,
            split_deposit_amount: params.split_deposit_amount,
            booking_date: params.booking_date,
            start_time: params.start_time,
            end_time: params.end_time,
            creative_status: StatusPair::INITIAL.creative,
            client_status: StatusPair::INITIAL.client,
            payment_status: PaymentStatus::Pending,
            amount_paid: 0,
            order_date: Utc::now(),
            approved_at: None,
            canceled_date: None,
        }
    }

    pub fn status(&self) -> StatusPair {
        StatusPair::new(self.creative_status, self.client_status)
    }

    pub fn apply_update(&mut self, update: &StatusUpdate) {
        self.creative_status = update.status.creative;
        self.client_status = update.status.client;
        if update.approved_at.is_some() {
            self.approved_at = update.approved_at;
        }
        if update.canceled_date.is_some() {
            self.canceled_date = update.canceled_date;
        }
    }
}

/// Fields written by a compare-and-swap status update.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: StatusPair,
    pub approved_at: Option<DateTime<Utc>>,
    pub canceled_date: Option<DateTime<Utc>>,
}

/// Payment progress as reported by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSnapshot {
    pub payment_status: PaymentStatus,
    pub amount_paid: i64,
}

/// Raw `bookings` row; statuses and times are decoded at the repository edge.
#[derive(Debug, FromRow, Clone)]
pub struct BookingRow {
    pub id: String,
    pub service_id: String,
    pub client_user_id: String,
    pub creative_user_id: String,
    pub price: i64,
    pub payment_option: String,
    pub split_deposit_amount: Option<i64>,
    pub booking_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub creative_status: String,
    pub client_status: String,
    pub payment_status: String,
    pub amount_paid: i64,
    pub order_date: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub canceled_date: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            payment_option: row.payment_option.parse()?,
            start_time: row.start_time.as_deref().map(WallClock::parse).transpose()?,
            end_time: row.end_time.as_deref().map(WallClock::parse).transpose()?,
            creative_status: row.creative_status.parse()?,
            client_status: row.client_status.parse()?,
            payment_status: row.payment_status.parse()?,
            id: row.id,
            service_id: row.service_id,
            client_user_id: row.client_user_id,
            creative_user_id: row.creative_user_id,
            price: row.price,
            split_deposit_amount: row.split_deposit_amount,
            booking_date: row.booking_date,
            amount_paid: row.amount_paid,
            order_date: row.order_date,
            approved_at: row.approved_at,
            canceled_date: row.canceled_date,
        })
    }
}
