use crate::domain::models::wall_clock::WallClock;
use crate::error::AppError;
use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl FromStr for TimeUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minutes" => Ok(TimeUnit::Minutes),
            "hours" => Ok(TimeUnit::Hours),
            "days" => Ok(TimeUnit::Days),
            "weeks" => Ok(TimeUnit::Weeks),
            "months" => Ok(TimeUnit::Months),
            other => Err(AppError::Validation(format!("Unknown time unit: {}", other))),
        }
    }
}

/// An `{amount, unit}` pair from the calendar settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl Lead {
    pub const fn new(amount: i64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    /// Months are approximated as 30 days and weeks as 7. Amounts too large
    /// for a duration are rejected.
    pub fn to_duration(&self) -> Result<Duration, AppError> {
        let amount = self.amount.max(0);
        let duration = match self.unit {
            TimeUnit::Minutes => Duration::try_minutes(amount),
            TimeUnit::Hours => Duration::try_hours(amount),
            TimeUnit::Days => Duration::try_days(amount),
            TimeUnit::Weeks => amount.checked_mul(7).and_then(Duration::try_days),
            TimeUnit::Months => amount.checked_mul(30).and_then(Duration::try_days),
        };
        duration.ok_or_else(|| AppError::Validation(format!("Lead time of {} {:?} is out of range", self.amount, self.unit)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSettings {
    pub id: String,
    pub service_id: String,
    pub is_scheduling_enabled: bool,
    /// Offered session lengths in minutes.
    pub session_durations: Vec<i32>,
    pub default_session_length: i32,
    pub min_notice: Lead,
    pub max_advance: Lead,
    /// Stored but not applied when filtering slots.
    pub buffer_time: Lead,
    pub timezone: Option<String>,
    pub is_active: bool,
}

impl CalendarSettings {
    pub fn tz(&self, fallback: Tz) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub start: WallClock,
    pub end: WallClock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub weekly_schedule_id: String,
    pub time: WallClock,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyScheduleEntry {
    pub id: String,
    pub calendar_settings_id: String,
    pub day_of_week: Weekday,
    pub is_enabled: bool,
    pub time_blocks: Vec<TimeBlock>,
    pub time_slots: Vec<TimeSlot>,
}

/// Active settings plus the weekly template they own, slots included.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCalendar {
    pub settings: CalendarSettings,
    pub schedule: Vec<WeeklyScheduleEntry>,
}

impl ServiceCalendar {
    pub fn day(&self, weekday: Weekday) -> Option<&WeeklyScheduleEntry> {
        self.schedule.iter().find(|entry| entry.day_of_week == weekday)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableDate {
    pub date: NaiveDate,
    #[serde(with = "weekday_name")]
    pub day_of_week: Weekday,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableTimeSlot {
    pub id: String,
    pub slot_time: WallClock,
    #[serde(with = "weekday_name")]
    pub day_of_week: Weekday,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    #[serde(with = "weekday_name")]
    pub day_of_week: Weekday,
    pub slots: Vec<AvailableTimeSlot>,
}

pub fn weekday_to_str(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn weekday_from_str(raw: &str) -> Result<Weekday, AppError> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| AppError::Validation(format!("Unknown day of week: {}", raw)))
}

mod weekday_name {
    use chrono::Weekday;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::weekday_to_str(*day))
    }
}

#[derive(Debug, FromRow, Clone)]
pub struct CalendarSettingsRow {
    pub id: String,
    pub service_id: String,
    pub is_scheduling_enabled: bool,
    pub session_durations: String,
    pub default_session_length: i32,
    pub min_notice_amount: i64,
    pub min_notice_unit: String,
    pub max_advance_amount: i64,
    pub max_advance_unit: String,
    pub buffer_time_amount: i64,
    pub buffer_time_unit: String,
    pub timezone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CalendarSettingsRow> for CalendarSettings {
    type Error = AppError;

    fn try_from(row: CalendarSettingsRow) -> Result<Self, Self::Error> {
        let session_durations = serde_json::from_str(&row.session_durations)
            .map_err(|e| AppError::Validation(format!("Invalid session durations: {}", e)))?;
        Ok(Self {
            id: row.id,
            service_id: row.service_id,
            is_scheduling_enabled: row.is_scheduling_enabled,
            session_durations,
            default_session_length: row.default_session_length,
            min_notice: Lead::new(row.min_notice_amount, row.min_notice_unit.parse()?),
            max_advance: Lead::new(row.max_advance_amount, row.max_advance_unit.parse()?),
            buffer_time: Lead::new(row.buffer_time_amount, row.buffer_time_unit.parse()?),
            timezone: row.timezone,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, FromRow, Clone)]
pub struct WeeklyScheduleRow {
    pub id: String,
    pub calendar_settings_id: String,
    pub day_of_week: String,
    pub is_enabled: bool,
    pub time_blocks: String,
}

impl TryFrom<WeeklyScheduleRow> for WeeklyScheduleEntry {
    type Error = AppError;

    fn try_from(row: WeeklyScheduleRow) -> Result<Self, Self::Error> {
        let time_blocks = serde_json::from_str(&row.time_blocks)
            .map_err(|e| AppError::Validation(format!("Invalid time blocks: {}", e)))?;
        Ok(Self {
            day_of_week: weekday_from_str(&row.day_of_week)?,
            id: row.id,
            calendar_settings_id: row.calendar_settings_id,
            is_enabled: row.is_enabled,
            time_blocks,
            time_slots: Vec::new(),
        })
    }
}

#[derive(Debug, FromRow, Clone)]
pub struct TimeSlotRow {
    pub id: String,
    pub weekly_schedule_id: String,
    pub slot_time: String,
    pub is_enabled: bool,
}

impl TryFrom<TimeSlotRow> for TimeSlot {
    type Error = AppError;

    fn try_from(row: TimeSlotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            time: WallClock::parse(&row.slot_time)?,
            id: row.id,
            weekly_schedule_id: row.weekly_schedule_id,
            is_enabled: row.is_enabled,
        })
    }
}
