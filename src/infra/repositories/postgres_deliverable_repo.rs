use crate::domain::ports::DeliverableProvider;
use crate::error::{db_error, AppError};
use async_trait::async_trait;
use sqlx::{Row, PgPool};

pub struct PostgresDeliverableRepo {
    pool: PgPool,
}

impl PostgresDeliverableRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliverableProvider for PostgresDeliverableRepo {
    async fn has_deliverables(&self, booking_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM deliverables WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_one(&self.pool).await.map_err(db_error)?;
        Ok(result.get::<i64, _>("count") > 0)
    }
}
