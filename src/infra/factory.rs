use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;

use crate::background::{effects_channel, EffectReceiver, EffectSender};
use crate::config::Config;
use crate::domain::ports::{
    BookingRepository, CalendarRepository, DeliverableProvider, NotificationDispatcher,
    NotificationRepository, PaymentStatusProvider,
};
use crate::domain::services::availability::AvailabilityService;
use crate::domain::services::booking_service::BookingService;
use crate::error::AppError;
use crate::infra::notifications::{
    http_email_dispatcher::{load_templates, HttpEmailDispatcher},
    in_app_dispatcher::InAppDispatcher,
};
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_calendar_repo::PostgresCalendarRepo,
    postgres_deliverable_repo::PostgresDeliverableRepo, postgres_notification_repo::PostgresNotificationRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_calendar_repo::SqliteCalendarRepo,
    sqlite_deliverable_repo::SqliteDeliverableRepo, sqlite_notification_repo::SqliteNotificationRepo,
};
use crate::state::AppState;

/// Storage-side ports the engine is assembled from.
pub struct Adapters {
    pub booking_repo: Arc<dyn BookingRepository>,
    pub calendar_repo: Arc<dyn CalendarRepository>,
    pub deliverables: Arc<dyn DeliverableProvider>,
    pub payments: Arc<dyn PaymentStatusProvider>,
    pub notification_repo: Arc<dyn NotificationRepository>,
}

/// Connects to the configured database, runs migrations and wires the
/// services. The receiver is `None` when notifications are disabled.
pub async fn bootstrap_engine(config: &Config) -> Result<(AppState, Option<EffectReceiver>), AppError> {
    let database_url = &config.database_url;

    let adapters = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse()
            .map_err(|e| AppError::Validation(format!("Invalid Postgres URL: {}", e)))?;
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;

        let booking_repo = Arc::new(PostgresBookingRepo::new(pool.clone()));
        Adapters {
            booking_repo: booking_repo.clone(),
            payments: booking_repo,
            calendar_repo: Arc::new(PostgresCalendarRepo::new(pool.clone())),
            deliverables: Arc::new(PostgresDeliverableRepo::new(pool.clone())),
            notification_repo: Arc::new(PostgresNotificationRepo::new(pool)),
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Validation(format!("Invalid SQLite connection string: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        run_sqlite_migrations(&pool).await?;

        let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
        Adapters {
            booking_repo: booking_repo.clone(),
            payments: booking_repo,
            calendar_repo: Arc::new(SqliteCalendarRepo::new(pool.clone())),
            deliverables: Arc::new(SqliteDeliverableRepo::new(pool.clone())),
            notification_repo: Arc::new(SqliteNotificationRepo::new(pool)),
        }
    };

    let dispatchers = build_dispatchers(config, adapters.notification_repo.clone())?;
    Ok(assemble(config, adapters, dispatchers))
}

fn build_dispatchers(config: &Config, notification_repo: Arc<dyn NotificationRepository>) -> Result<Vec<Arc<dyn NotificationDispatcher>>, AppError> {
    let mut dispatchers: Vec<Arc<dyn NotificationDispatcher>> = vec![Arc::new(InAppDispatcher::new(notification_repo))];

    match &config.mail_service_url {
        Some(url) => {
            let templates = Arc::new(load_templates()?);
            dispatchers.push(Arc::new(HttpEmailDispatcher::new(
                url.clone(),
                config.mail_service_token.clone(),
                templates,
            )));
        }
        None => warn!("MAIL_SERVICE_URL not set, email notifications are off"),
    }
    Ok(dispatchers)
}

/// Wires services over already-built adapters.
pub fn assemble(config: &Config, adapters: Adapters, dispatchers: Vec<Arc<dyn NotificationDispatcher>>) -> (AppState, Option<EffectReceiver>) {
    let (effects, receiver) = if config.notifications_enabled {
        let (tx, rx) = effects_channel();
        (tx, Some(rx))
    } else {
        info!("Notifications disabled");
        (EffectSender::disabled(), None)
    };

    let availability = Arc::new(AvailabilityService::new(
        adapters.calendar_repo.clone(),
        adapters.booking_repo.clone(),
        config.default_timezone,
    ));
    let bookings = Arc::new(BookingService::new(
        adapters.booking_repo.clone(),
        adapters.deliverables.clone(),
        adapters.payments.clone(),
        availability.clone(),
        effects,
    ));

    let state = AppState {
        config: config.clone(),
        booking_repo: adapters.booking_repo,
        calendar_repo: adapters.calendar_repo,
        deliverables: adapters.deliverables,
        payments: adapters.payments,
        notification_repo: adapters.notification_repo,
        dispatchers,
        availability,
        bookings,
    };
    (state, receiver)
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run Postgres migrations: {}", e)))
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run SQLite migrations: {}", e)))
}
