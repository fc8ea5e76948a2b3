use crate::domain::models::calendar::{
    CalendarSettings, CalendarSettingsRow, TimeSlot, TimeSlotRow, WeeklyScheduleEntry, WeeklyScheduleRow,
};
use crate::domain::ports::CalendarRepository;
use crate::error::{db_error, AppError};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCalendarRepo {
    pool: PgPool,
}

impl PostgresCalendarRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarRepository for PostgresCalendarRepo {
    async fn get_active_settings(&self, service_id: &str) -> Result<Option<CalendarSettings>, AppError> {
        let row = sqlx::query_as::<_, CalendarSettingsRow>(
            "SELECT * FROM calendar_settings WHERE service_id = $1 AND is_active = TRUE ORDER BY created_at DESC LIMIT 1"
        )
            .bind(service_id)
            .fetch_optional(&self.pool).await.map_err(db_error)?;
        row.map(CalendarSettings::try_from).transpose()
    }

    async fn get_weekly_schedule(&self, settings_id: &str) -> Result<Vec<WeeklyScheduleEntry>, AppError> {
        sqlx::query_as::<_, WeeklyScheduleRow>("SELECT * FROM weekly_schedule WHERE calendar_settings_id = $1")
            .bind(settings_id)
            .fetch_all(&self.pool).await.map_err(db_error)?
            .into_iter()
            .map(WeeklyScheduleEntry::try_from)
            .collect()
    }

    async fn get_time_slots(&self, weekly_schedule_id: &str) -> Result<Vec<TimeSlot>, AppError> {
        sqlx::query_as::<_, TimeSlotRow>("SELECT * FROM time_slots WHERE weekly_schedule_id = $1 ORDER BY slot_time ASC")
            .bind(weekly_schedule_id)
            .fetch_all(&self.pool).await.map_err(db_error)?
            .into_iter()
            .map(TimeSlot::try_from)
            .collect()
    }
}
