use crate::domain::models::booking::Booking;
use crate::domain::models::calendar::{
    AvailableDate, AvailableTimeSlot, CalendarDay, ServiceCalendar,
};
use crate::domain::models::wall_clock::WallClock;
use crate::domain::ports::{BookingRepository, CalendarRepository};
use crate::error::AppError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error};

/// Longest window a single request may walk.
const MAX_RANGE_DAYS: i64 = 366;

/// Instant of local midnight for `date`. A midnight skipped by a DST jump
/// resolves to the first valid instant after the gap.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    for shift in 0..4 {
        if let Some(local) = tz.from_local_datetime(&(midnight + Duration::hours(shift))).earliest() {
            return local.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&midnight)
}

/// Default `[start, end]` window: today through `start + maxAdvance`.
pub fn resolve_range(
    calendar: &ServiceCalendar,
    tz: Tz,
    range_start: Option<NaiveDate>,
    range_end: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start = range_start.unwrap_or_else(|| now.with_timezone(&tz).date_naive());
    let end = match range_end {
        Some(end) => end,
        None => {
            let advance = calendar.settings.max_advance.to_duration()?;
            local_midnight(tz, start)
                .checked_add_signed(advance)
                .ok_or_else(|| AppError::Validation("Maximum advance reaches past the supported calendar".into()))?
                .with_timezone(&tz)
                .date_naive()
        }
    };
    let capped = start.checked_add_signed(Duration::days(MAX_RANGE_DAYS)).unwrap_or(NaiveDate::MAX);
    Ok((start, end.min(capped)))
}

/// Start times already taken on `date` by bookings that hold their slot.
fn taken_times(bookings: &[Booking], date: NaiveDate) -> HashSet<WallClock> {
    bookings
        .iter()
        .filter(|b| b.booking_date == Some(date) && b.status().occupies_calendar())
        .filter_map(|b| b.start_time)
        .collect()
}

/// Free slots on `date`, ignoring notice and advance windows.
pub fn calculate_time_slots(calendar: &ServiceCalendar, date: NaiveDate, bookings: &[Booking]) -> Vec<AvailableTimeSlot> {
    if !calendar.settings.is_scheduling_enabled {
        return Vec::new();
    }
    let weekday = date.weekday();
    let Some(day) = calendar.day(weekday).filter(|d| d.is_enabled) else {
        return Vec::new();
    };

    // buffer_time is not consulted; slots match on start time only.
    let taken = taken_times(bookings, date);
    let mut slots: Vec<AvailableTimeSlot> = day
        .time_slots
        .iter()
        .filter(|slot| slot.is_enabled && !taken.contains(&slot.time))
        .map(|slot| AvailableTimeSlot {
            id: slot.id.clone(),
            slot_time: slot.time,
            day_of_week: weekday,
        })
        .collect();
    slots.sort_by_key(|s| s.slot_time);
    slots
}

pub fn calculate_dates(
    calendar: &ServiceCalendar,
    tz: Tz,
    start: NaiveDate,
    end: NaiveDate,
    bookings: &[Booking],
    now: DateTime<Utc>,
) -> Result<Vec<AvailableDate>, AppError> {
    if !calendar.settings.is_scheduling_enabled || end < start {
        return Ok(Vec::new());
    }
    let cutoff = now
        .checked_add_signed(calendar.settings.min_notice.to_duration()?)
        .ok_or_else(|| AppError::Validation("Minimum notice reaches past the supported calendar".into()))?;

    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        let enabled = calendar.day(current.weekday()).is_some_and(|d| d.is_enabled);
        if enabled
            && local_midnight(tz, current) >= cutoff
            && !calculate_time_slots(calendar, current, bookings).is_empty()
        {
            dates.push(AvailableDate {
                date: current,
                day_of_week: current.weekday(),
                is_available: true,
            });
        }
        let Some(next) = current.succ_opt() else {
            break;
        };
        current = next;
    }
    Ok(dates)
}

/// Whether a new booking may claim `time` on `date` right now.
pub fn is_bookable(
    calendar: &ServiceCalendar,
    tz: Tz,
    date: NaiveDate,
    time: WallClock,
    bookings: &[Booking],
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let (start, end) = resolve_range(calendar, tz, None, None, now)?;
    let open = calculate_dates(calendar, tz, start, end, bookings, now)?
        .iter()
        .any(|d| d.date == date);
    Ok(open && calculate_time_slots(calendar, date, bookings).iter().any(|s| s.slot_time == time))
}

pub struct AvailabilityService {
    calendar_repo: Arc<dyn CalendarRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    default_tz: Tz,
}

impl AvailabilityService {
    pub fn new(calendar_repo: Arc<dyn CalendarRepository>, booking_repo: Arc<dyn BookingRepository>, default_tz: Tz) -> Self {
        Self { calendar_repo, booking_repo, default_tz }
    }

    /// Active, scheduling-enabled calendar for the service with every
    /// weekday's slots loaded, or `None` when the service takes no
    /// scheduled bookings.
    pub async fn load_calendar(&self, service_id: &str) -> Result<Option<ServiceCalendar>, AppError> {
        let Some(settings) = self.calendar_repo.get_active_settings(service_id).await? else {
            return Ok(None);
        };
        if !settings.is_active || !settings.is_scheduling_enabled {
            return Ok(None);
        }

        let mut schedule = self.calendar_repo.get_weekly_schedule(&settings.id).await?;
        for entry in &mut schedule {
            entry.time_slots = self.calendar_repo.get_time_slots(&entry.id).await?;
        }
        Ok(Some(ServiceCalendar { settings, schedule }))
    }

    pub fn timezone(&self, calendar: &ServiceCalendar) -> Tz {
        calendar.settings.tz(self.default_tz)
    }

    /// Bookable dates in the range. Missing configuration and store
    /// failures both yield an empty list.
    pub async fn available_dates(
        &self,
        service_id: &str,
        range_start: Option<NaiveDate>,
        range_end: Option<NaiveDate>,
    ) -> Vec<AvailableDate> {
        match self.try_available_dates(service_id, range_start, range_end, Utc::now()).await {
            Ok(dates) => dates,
            Err(e) => {
                error!(service_id, "Failed to compute available dates: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn try_available_dates(
        &self,
        service_id: &str,
        range_start: Option<NaiveDate>,
        range_end: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailableDate>, AppError> {
        let Some(calendar) = self.load_calendar(service_id).await? else {
            debug!(service_id, "No active scheduling configuration");
            return Ok(Vec::new());
        };
        let tz = self.timezone(&calendar);
        let (start, end) = resolve_range(&calendar, tz, range_start, range_end, now)?;
        if end < start {
            return Ok(Vec::new());
        }

        let bookings = self.booking_repo.find_active_for_service(service_id, start, end).await?;
        calculate_dates(&calendar, tz, start, end, &bookings, now)
    }

    /// Free slots on `date`. Missing configuration and store failures both
    /// yield an empty list.
    pub async fn available_time_slots(&self, service_id: &str, date: NaiveDate) -> Vec<AvailableTimeSlot> {
        match self.try_available_time_slots(service_id, date).await {
            Ok(slots) => slots.unwrap_or_default(),
            Err(e) => {
                error!(service_id, %date, "Failed to compute available time slots: {}", e);
                Vec::new()
            }
        }
    }

    /// `Ok(None)` when the service has no active scheduling.
    pub async fn try_available_time_slots(&self, service_id: &str, date: NaiveDate) -> Result<Option<Vec<AvailableTimeSlot>>, AppError> {
        let Some(calendar) = self.load_calendar(service_id).await? else {
            return Ok(None);
        };
        let bookings = self.booking_repo.find_active_for_service(service_id, date, date).await?;
        Ok(Some(calculate_time_slots(&calendar, date, &bookings)))
    }

    /// Dates with their free slots. A date whose slots cannot be loaded is
    /// shown with none rather than failing the whole view.
    pub async fn calendar_view(
        &self,
        service_id: &str,
        range_start: Option<NaiveDate>,
        range_end: Option<NaiveDate>,
    ) -> Vec<CalendarDay> {
        let dates = self.available_dates(service_id, range_start, range_end).await;
        let mut days = Vec::with_capacity(dates.len());
        for date in dates {
            let slots = self.available_time_slots(service_id, date.date).await;
            days.push(CalendarDay {
                date: date.date,
                day_of_week: date.day_of_week,
                slots,
            });
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking::{
        ClientStatus, CreativeStatus, NewBookingParams, PaymentOption,
    };
    use crate::domain::models::calendar::{
        CalendarSettings, Lead, TimeSlot, TimeUnit, WeeklyScheduleEntry,
    };
    use crate::infra::memory::{InMemoryBookingRepo, InMemoryCalendarRepo};
    use chrono::Weekday;

    fn slot(id: &str, h: u32, m: u32, enabled: bool) -> TimeSlot {
        TimeSlot {
            id: id.into(),
            weekly_schedule_id: "w".into(),
            time: WallClock::new(h, m).unwrap(),
            is_enabled: enabled,
        }
    }

    fn day(weekday: Weekday, enabled: bool, slots: Vec<TimeSlot>) -> WeeklyScheduleEntry {
        WeeklyScheduleEntry {
            id: format!("w-{}", weekday),
            calendar_settings_id: "cal".into(),
            day_of_week: weekday,
            is_enabled: enabled,
            time_blocks: Vec::new(),
            time_slots: slots,
        }
    }

    fn calendar(min_notice: Lead, max_advance: Lead) -> ServiceCalendar {
        ServiceCalendar {
            settings: CalendarSettings {
                id: "cal".into(),
                service_id: "svc".into(),
                is_scheduling_enabled: true,
                session_durations: vec![60],
                default_session_length: 60,
                min_notice,
                max_advance,
                buffer_time: Lead::new(30, TimeUnit::Minutes),
                timezone: None,
                is_active: true,
            },
            schedule: vec![
                day(Weekday::Mon, true, vec![slot("m1", 9, 0, true), slot("m2", 10, 0, true), slot("m3", 11, 0, false)]),
                day(Weekday::Tue, false, vec![slot("t1", 9, 0, true)]),
                day(Weekday::Wed, true, vec![]),
            ],
        }
    }

    fn default_calendar() -> ServiceCalendar {
        calendar(Lead::new(0, TimeUnit::Hours), Lead::new(4, TimeUnit::Weeks))
    }

    fn booked(date: NaiveDate, h: u32, m: u32) -> Booking {
        Booking::new(NewBookingParams {
            service_id: "svc".into(),
            client_user_id: "client".into(),
            creative_user_id: "creative".into(),
            price: 100,
            payment_option: PaymentOption::Upfront,
            split_deposit_amount: None,
            booking_date: Some(date),
            start_time: WallClock::new(h, m),
            end_time: None,
        })
    }

    // 2030-06-03 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 3).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_slots_exclude_exact_matches_only() {
        let cal = default_calendar();
        let bookings = vec![booked(monday(), 9, 0), booked(monday(), 9, 30)];
        let slots = calculate_time_slots(&cal, monday(), &bookings);
        let times: Vec<String> = slots.iter().map(|s| s.slot_time.to_string()).collect();
        // 09:30 does not collide with any configured slot even though it overlaps 09:00's session.
        assert_eq!(times, vec!["10:00"]);
        assert_eq!(slots[0].day_of_week, Weekday::Mon);
    }

    #[test]
    fn test_slots_ignore_other_dates_and_released_bookings() {
        let cal = default_calendar();
        let mut rejected = booked(monday(), 9, 0);
        rejected.creative_status = CreativeStatus::Rejected;
        let mut cancelled = booked(monday(), 10, 0);
        cancelled.client_status = ClientStatus::Cancelled;
        let next_week = booked(monday() + Duration::days(7), 9, 0);

        let slots = calculate_time_slots(&cal, monday(), &[rejected, cancelled, next_week]);
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn test_slots_empty_for_disabled_or_unconfigured_days() {
        let cal = default_calendar();
        let tuesday = monday() + Duration::days(1);
        let wednesday = monday() + Duration::days(2);
        let thursday = monday() + Duration::days(3);
        assert!(calculate_time_slots(&cal, tuesday, &[]).is_empty());
        assert!(calculate_time_slots(&cal, wednesday, &[]).is_empty());
        assert!(calculate_time_slots(&cal, thursday, &[]).is_empty());

        let mut disabled = default_calendar();
        disabled.settings.is_scheduling_enabled = false;
        assert!(calculate_time_slots(&disabled, monday(), &[]).is_empty());
    }

    #[test]
    fn test_dates_only_enabled_weekdays_with_free_slots() {
        let cal = default_calendar();
        let start = monday();
        let end = monday() + Duration::days(13);
        let dates = calculate_dates(&cal, chrono_tz::UTC, start, end, &[], now()).unwrap();
        let listed: Vec<NaiveDate> = dates.iter().map(|d| d.date).collect();
        assert_eq!(listed, vec![monday(), monday() + Duration::days(7)]);
        assert!(dates.iter().all(|d| d.is_available && d.day_of_week == Weekday::Mon));
    }

    #[test]
    fn test_fully_booked_date_disappears_partially_booked_stays() {
        let cal = default_calendar();
        let end = monday() + Duration::days(7);
        let bookings = vec![
            booked(monday(), 9, 0),
            booked(monday(), 10, 0),
            booked(monday() + Duration::days(7), 9, 0),
        ];
        let dates = calculate_dates(&cal, chrono_tz::UTC, monday(), end, &bookings, now()).unwrap();
        let listed: Vec<NaiveDate> = dates.iter().map(|d| d.date).collect();
        assert_eq!(listed, vec![monday() + Duration::days(7)]);
    }

    #[test]
    fn test_min_notice_applies_to_midnight() {
        // now + 36h = 2030-06-03 00:00, exactly Monday midnight.
        let cal = calendar(Lead::new(36, TimeUnit::Hours), Lead::new(4, TimeUnit::Weeks));
        let dates = calculate_dates(&cal, chrono_tz::UTC, monday(), monday(), &[], now()).unwrap();
        assert_eq!(dates.len(), 1);

        let strict = calendar(Lead::new(2, TimeUnit::Days), Lead::new(4, TimeUnit::Weeks));
        assert!(calculate_dates(&strict, chrono_tz::UTC, monday(), monday(), &[], now()).unwrap().is_empty());

        let minutes = calendar(Lead::new(36 * 60 + 1, TimeUnit::Minutes), Lead::new(4, TimeUnit::Weeks));
        assert!(calculate_dates(&minutes, chrono_tz::UTC, monday(), monday(), &[], now()).unwrap().is_empty());
    }

    #[test]
    fn test_default_range_uses_max_advance() {
        let cal = calendar(Lead::new(0, TimeUnit::Hours), Lead::new(2, TimeUnit::Weeks));
        let (start, end) = resolve_range(&cal, chrono_tz::UTC, None, None, now()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2030, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2030, 6, 15).unwrap());

        let months = calendar(Lead::new(0, TimeUnit::Hours), Lead::new(1, TimeUnit::Months));
        let (_, end) = resolve_range(&months, chrono_tz::UTC, Some(monday()), None, now()).unwrap();
        assert_eq!(end, monday() + Duration::days(30));

        let hours = calendar(Lead::new(0, TimeUnit::Hours), Lead::new(36, TimeUnit::Hours));
        let (_, end) = resolve_range(&hours, chrono_tz::UTC, Some(monday()), None, now()).unwrap();
        assert_eq!(end, monday() + Duration::days(1));
    }

    #[test]
    fn test_today_resolved_in_calendar_timezone() {
        let cal = default_calendar();
        // 2030-06-01 23:30 UTC is already June 2nd in Tokyo.
        let late = Utc.with_ymd_and_hms(2030, 6, 1, 23, 30, 0).unwrap();
        let (start, _) = resolve_range(&cal, chrono_tz::Asia::Tokyo, None, None, late).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2030, 6, 2).unwrap());
    }

    #[test]
    fn test_local_midnight_survives_dst_gap() {
        // Chile springs forward at 00:00 on 2030-09-08 (America/Santiago).
        let tz = chrono_tz::America::Santiago;
        let date = NaiveDate::from_ymd_opt(2030, 9, 8).unwrap();
        let instant = local_midnight(tz, date);
        assert_eq!(instant.with_timezone(&tz).date_naive(), date);
    }

    #[test]
    fn test_is_bookable_requires_free_slot_inside_window() {
        let cal = default_calendar();
        let taken = vec![booked(monday(), 9, 0)];
        let nine = WallClock::new(9, 0).unwrap();
        let ten = WallClock::new(10, 0).unwrap();
        let eleven = WallClock::new(11, 0).unwrap();
        assert!(is_bookable(&cal, chrono_tz::UTC, monday(), ten, &taken, now()).unwrap());
        assert!(!is_bookable(&cal, chrono_tz::UTC, monday(), nine, &taken, now()).unwrap());
        assert!(!is_bookable(&cal, chrono_tz::UTC, monday(), eleven, &taken, now()).unwrap());
        let too_far = monday() + Duration::days(70);
        assert!(!is_bookable(&cal, chrono_tz::UTC, too_far, ten, &[], now()).unwrap());
    }

    #[test]
    fn test_oversized_leads_fail_instead_of_panicking() {
        let far = calendar(Lead::new(0, TimeUnit::Hours), Lead::new(1_000_000_000_000, TimeUnit::Months));
        assert!(matches!(resolve_range(&far, chrono_tz::UTC, None, None, now()), Err(AppError::Validation(_))));
        // An explicit end never consults max_advance.
        assert!(resolve_range(&far, chrono_tz::UTC, Some(monday()), Some(monday()), now()).is_ok());

        let strict = calendar(Lead::new(i64::MAX / 2, TimeUnit::Days), Lead::new(4, TimeUnit::Weeks));
        assert!(calculate_dates(&strict, chrono_tz::UTC, monday(), monday(), &[], now()).is_err());

        // Whole-day notice that fits a duration but not the calendar.
        let distant = calendar(Lead::new(200_000_000_000, TimeUnit::Minutes), Lead::new(4, TimeUnit::Weeks));
        assert!(calculate_dates(&distant, chrono_tz::UTC, monday(), monday(), &[], now()).is_err());
        assert!(is_bookable(&distant, chrono_tz::UTC, monday(), WallClock::new(9, 0).unwrap(), &[], now()).is_err());
    }

    #[test]
    fn test_range_walk_stops_at_last_representable_date() {
        let cal = default_calendar();
        let start = NaiveDate::MAX - Duration::days(3);
        let dates = calculate_dates(&cal, chrono_tz::UTC, start, NaiveDate::MAX, &[], now()).unwrap();
        assert!(dates.iter().all(|d| d.date <= NaiveDate::MAX));
    }

    #[tokio::test]
    async fn test_oversized_config_degrades_to_empty() {
        let repo = Arc::new(InMemoryBookingRepo::new());
        let far = calendar(Lead::new(i64::MAX / 2, TimeUnit::Days), Lead::new(i64::MAX, TimeUnit::Weeks));
        let service = AvailabilityService::new(
            Arc::new(InMemoryCalendarRepo::new().with_calendar(far).unwrap()),
            repo,
            chrono_tz::UTC,
        );

        assert!(service.available_dates("svc", None, None).await.is_empty());
        assert!(service.available_dates("svc", Some(monday()), Some(monday())).await.is_empty());
        assert!(matches!(
            service.try_available_dates("svc", None, None, now()).await,
            Err(AppError::Validation(_))
        ));
        // Slot listing ignores the lead times entirely.
        assert_eq!(service.available_time_slots("svc", monday()).await.len(), 2);
    }
}
