pub mod background;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod state;

use crate::background::start_notification_worker;
use crate::config::Config;
use crate::error::AppError;
use crate::infra::factory::bootstrap_engine;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init_logging() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("./logs", "booking-engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("info,marketplace_booking=debug"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized. Writing JSON logs to ./logs/");
    guard
}

/// Bootstraps the engine and spawns the notification worker. Must be called
/// inside a tokio runtime.
pub async fn start(config: &Config) -> Result<Arc<AppState>, AppError> {
    let (state, effects) = bootstrap_engine(config).await?;
    let state = Arc::new(state);

    if let Some(rx) = effects {
        let dispatchers = state.dispatchers.clone();
        tokio::spawn(async move {
            start_notification_worker(rx, dispatchers).await;
        });
    }

    info!("Booking engine ready");
    Ok(state)
}
