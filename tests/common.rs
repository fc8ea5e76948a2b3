use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use marketplace_booking::{
    background::start_notification_worker,
    config::Config,
    domain::models::booking::{Booking, NewBookingParams, PaymentOption},
    domain::models::calendar::weekday_to_str,
    domain::models::notification::{Actor, Notification},
    domain::models::wall_clock::WallClock,
    domain::ports::{NotificationDispatcher, NotificationRepository},
    infra::factory::{assemble, Adapters},
    infra::notifications::in_app_dispatcher::InAppDispatcher,
    infra::repositories::{
        sqlite_booking_repo::SqliteBookingRepo,
        sqlite_calendar_repo::SqliteCalendarRepo,
        sqlite_deliverable_repo::SqliteDeliverableRepo,
        sqlite_notification_repo::SqliteNotificationRepo,
    },
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub const CLIENT: &str = "client-1";
pub const CREATIVE: &str = "creative-1";

#[allow(dead_code)]
pub struct TestEngine {
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestEngine {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config::for_database(db_url);
        let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let notification_repo = Arc::new(SqliteNotificationRepo::new(pool.clone()));
        let adapters = Adapters {
            booking_repo: booking_repo.clone(),
            payments: booking_repo,
            calendar_repo: Arc::new(SqliteCalendarRepo::new(pool.clone())),
            deliverables: Arc::new(SqliteDeliverableRepo::new(pool.clone())),
            notification_repo: notification_repo.clone(),
        };
        let dispatchers: Vec<Arc<dyn NotificationDispatcher>> = vec![Arc::new(InAppDispatcher::new(notification_repo))];

        let (state, effects) = assemble(&config, adapters, dispatchers.clone());
        let state = Arc::new(state);

        // Start Notification Worker
        let rx = effects.expect("notifications are enabled in tests");
        tokio::spawn(async move {
            start_notification_worker(rx, dispatchers).await;
        });

        Self { pool, db_filename, state }
    }

    /// Seeds an active calendar. `days` maps weekdays to their slot times.
    pub async fn seed_calendar(&self, service_id: &str, days: &[(Weekday, &[&str])]) -> String {
        self.seed_calendar_with(service_id, (0, "hours"), None, days).await
    }

    pub async fn seed_calendar_with(
        &self,
        service_id: &str,
        min_notice: (i64, &str),
        timezone: Option<&str>,
        days: &[(Weekday, &[&str])],
    ) -> String {
        let settings_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO calendar_settings (id, service_id, is_scheduling_enabled, session_durations, default_session_length,
                min_notice_amount, min_notice_unit, max_advance_amount, max_advance_unit, buffer_time_amount, buffer_time_unit,
                timezone, is_active, created_at)
             VALUES (?, ?, 1, '[60]', 60, ?, ?, 3, 'months', 15, 'minutes', ?, 1, ?)"
        )
            .bind(&settings_id).bind(service_id).bind(min_notice.0).bind(min_notice.1)
            .bind(timezone).bind(Utc::now())
            .execute(&self.pool).await.unwrap();

        for (weekday, times) in days {
            let schedule_id = Uuid::new_v4().to_string();
            sqlx::query("INSERT INTO weekly_schedule (id, calendar_settings_id, day_of_week, is_enabled, time_blocks) VALUES (?, ?, ?, 1, '[]')")
                .bind(&schedule_id).bind(&settings_id).bind(weekday_to_str(*weekday))
                .execute(&self.pool).await.unwrap();

            for time in *times {
                sqlx::query("INSERT INTO time_slots (id, weekly_schedule_id, slot_time, is_enabled) VALUES (?, ?, ?, 1)")
                    .bind(Uuid::new_v4().to_string()).bind(&schedule_id).bind(*time)
                    .execute(&self.pool).await.unwrap();
            }
        }
        settings_id
    }

    pub async fn place(
        &self,
        service_id: &str,
        price: i64,
        option: PaymentOption,
        slot: Option<(NaiveDate, &str)>,
    ) -> Booking {
        let params = NewBookingParams {
            service_id: service_id.to_string(),
            client_user_id: CLIENT.to_string(),
            creative_user_id: CREATIVE.to_string(),
            price,
            payment_option: option,
            split_deposit_amount: None,
            booking_date: slot.map(|(d, _)| d),
            start_time: slot.map(|(_, t)| WallClock::parse(t).unwrap()),
            end_time: None,
        };
        self.state.bookings.place_booking(params).await.expect("placement failed").booking
    }

    /// Simulates the payment collaborator settling a booking.
    pub async fn set_payment(&self, booking_id: &str, status: &str, amount_paid: i64) {
        sqlx::query("UPDATE bookings SET payment_status = ?, amount_paid = ? WHERE id = ?")
            .bind(status).bind(amount_paid).bind(booking_id)
            .execute(&self.pool).await.unwrap();
    }

    /// Waits for the worker to persist at least `count` notifications for the user.
    pub async fn wait_for_notifications(&self, user_id: &str, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let found = self.state.notification_repo.list_for_user(user_id).await.unwrap();
            if found.len() >= count {
                return found;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.state.notification_repo.list_for_user(user_id).await.unwrap()
    }
}

impl Drop for TestEngine {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

#[allow(dead_code)]
pub fn client() -> Actor {
    Actor::new(CLIENT)
}

#[allow(dead_code)]
pub fn creative() -> Actor {
    Actor::new(CREATIVE)
}

/// First `weekday` strictly after today.
#[allow(dead_code)]
pub fn next_weekday(weekday: Weekday) -> NaiveDate {
    let mut next = Utc::now().date_naive() + Duration::days(1);
    while next.weekday() != weekday {
        next += Duration::days(1);
    }
    next
}
