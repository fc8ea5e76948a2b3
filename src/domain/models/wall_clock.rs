use crate::error::AppError;
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A time of day at minute precision.
///
/// Stores may hand back `"09:00"`, `"09:00:00"`, `"09:00:00+00"` or a full
/// timestamp (`T` or space separated) for the same slot. Everything is reduced to `HH:MM` here so
/// slot matching is a plain equality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallClock(NaiveTime);

impl WallClock {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let invalid = || AppError::Validation(format!("Invalid time of day: {:?}", raw));

        let mut value = raw.trim();
        if let Some(idx) = value.find('T') {
            value = &value[idx + 1..];
        } else if let Some((date, rest)) = value.split_once(' ')
            && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
        {
            value = rest;
        }
        // Offset suffixes: "+00", "+05:30", "-08", "Z"
        if let Some(idx) = value.find(['+', '-', 'Z', 'z']) {
            value = &value[..idx];
        }

        let mut parts = value.trim().split(':');
        let hour = parts.next().ok_or_else(invalid)?;
        let minute = parts.next().ok_or_else(invalid)?;
        if let Some(seconds) = parts.next()
            && seconds.split('.').next().is_none_or(|s| s.parse::<u32>().is_err())
        {
            return Err(invalid());
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl From<NaiveTime> for WallClock {
    fn from(time: NaiveTime) -> Self {
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for WallClock {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WallClock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallClock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses a calendar date as sent by callers (`YYYY-MM-DD`).
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date format: {:?}", raw)))
}
