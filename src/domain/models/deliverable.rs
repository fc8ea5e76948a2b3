use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque reference to an uploaded file; the bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverableRef(pub String);

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Deliverable {
    pub id: String,
    pub booking_id: String,
    pub file_ref: String,
    pub created_at: DateTime<Utc>,
}

impl Deliverable {
    pub fn new(booking_id: &str, file_ref: &DeliverableRef) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            file_ref: file_ref.0.clone(),
            created_at: Utc::now(),
        }
    }
}
