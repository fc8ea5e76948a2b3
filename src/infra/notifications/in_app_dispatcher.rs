use crate::domain::models::booking::Booking;
use crate::domain::models::notification::{Actor, Notification, NotificationKind};
use crate::domain::ports::{NotificationDispatcher, NotificationRepository};
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Stores every effect as an in-app notification for its recipient.
pub struct InAppDispatcher {
    repo: Arc<dyn NotificationRepository>,
}

impl InAppDispatcher {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl NotificationDispatcher for InAppDispatcher {
    async fn notify(&self, kind: NotificationKind, booking: &Booking, actor: &Actor) -> Result<(), AppError> {
        let saved = self.repo.create(&Notification::new(kind, booking, actor)).await?;
        debug!(notification_id = %saved.id, recipient = %saved.recipient_user_id, "In-app notification stored");
        Ok(())
    }
}
