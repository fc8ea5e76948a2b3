use crate::domain::models::notification::Notification;
use crate::domain::ports::NotificationRepository;
use crate::error::{db_error, AppError};
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteNotificationRepo {
    pool: SqlitePool,
}

impl SqliteNotificationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepo {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, booking_id, recipient_user_id, actor_user_id, kind, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&notification.id).bind(&notification.booking_id).bind(&notification.recipient_user_id)
            .bind(&notification.actor_user_id).bind(&notification.kind).bind(notification.created_at)
            .fetch_one(&self.pool).await.map_err(db_error)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE recipient_user_id = ? ORDER BY created_at ASC")
            .bind(user_id)
            .fetch_all(&self.pool).await.map_err(db_error)
    }
}
