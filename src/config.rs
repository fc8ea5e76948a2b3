use crate::error::AppError;
use chrono_tz::Tz;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub mail_service_url: Option<String>,
    pub mail_service_token: String,
    pub notifications_enabled: bool,
    /// Zone used for calendars that do not name their own.
    pub default_timezone: Tz,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Validation("DATABASE_URL must be set".into()))?;

        let notifications_enabled = match env::var("NOTIFICATIONS_ENABLED") {
            Ok(v) => parse_flag(&v)
                .ok_or_else(|| AppError::Validation(format!("NOTIFICATIONS_ENABLED must be true or false, got '{}'", v)))?,
            Err(_) => true,
        };

        let default_timezone = match env::var("DEFAULT_TIMEZONE") {
            Ok(v) => v.parse::<Tz>()
                .map_err(|_| AppError::Validation(format!("DEFAULT_TIMEZONE '{}' is not an IANA zone", v)))?,
            Err(_) => Tz::UTC,
        };

        Ok(Self {
            database_url,
            mail_service_url: env::var("MAIL_SERVICE_URL").ok().filter(|s| !s.trim().is_empty()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_default(),
            notifications_enabled,
            default_timezone,
        })
    }

    /// Config for an embedded engine on the given database.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            mail_service_url: None,
            mail_service_token: String::new(),
            notifications_enabled: true,
            default_timezone: Tz::UTC,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
