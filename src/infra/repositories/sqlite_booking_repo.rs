use crate::domain::models::booking::{Booking, BookingRow, PaymentSnapshot, StatusPair, StatusUpdate};
use crate::domain::models::deliverable::{Deliverable, DeliverableRef};
use crate::domain::ports::{BookingRepository, PaymentStatusProvider};
use crate::error::{db_error, AppError};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_active_for_service(&self, service_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings
             WHERE service_id = ? AND booking_date >= ? AND booking_date <= ?
               AND creative_status != 'rejected' AND client_status != 'cancelled'
             ORDER BY booking_date ASC, start_time ASC"
        )
            .bind(service_id).bind(start).bind(end)
            .fetch_all(&self.pool).await.map_err(db_error)?
            .into_iter()
            .map(Booking::try_from)
            .collect()
    }

    async fn insert(&self, booking: &Booking) -> Result<Booking, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO bookings (id, service_id, client_user_id, creative_user_id, price, payment_option, split_deposit_amount, booking_date, start_time, end_time, creative_status, client_status, payment_status, amount_paid, order_date, approved_at, canceled_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.service_id).bind(&booking.client_user_id).bind(&booking.creative_user_id)
            .bind(booking.price).bind(booking.payment_option.as_str()).bind(booking.split_deposit_amount)
            .bind(booking.booking_date).bind(booking.start_time.map(|t| t.to_string())).bind(booking.end_time.map(|t| t.to_string()))
            .bind(booking.creative_status.as_str()).bind(booking.client_status.as_str()).bind(booking.payment_status.as_str())
            .bind(booking.amount_paid).bind(booking.order_date).bind(booking.approved_at).bind(booking.canceled_date)
            .fetch_one(&self.pool).await
            .map_err(AppError::Database)
            .map_err(|e| if e.is_unique_violation() { AppError::Conflict("Booking already exists".into()) } else { e })?;
        Booking::try_from(row)
    }

    async fn update_status(&self, id: &str, expected: StatusPair, update: &StatusUpdate, files: &[DeliverableRef]) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let result = sqlx::query(
            "UPDATE bookings
             SET creative_status = ?, client_status = ?,
                 approved_at = COALESCE(?, approved_at), canceled_date = COALESCE(?, canceled_date),
                 updated_at = ?
             WHERE id = ? AND creative_status = ? AND client_status = ?"
        )
            .bind(update.status.creative.as_str()).bind(update.status.client.as_str())
            .bind(update.approved_at).bind(update.canceled_date).bind(Utc::now())
            .bind(id).bind(expected.creative.as_str()).bind(expected.client.as_str())
            .execute(&mut *tx).await.map_err(db_error)?;

        // Dropping the transaction rolls it back.
        if result.rows_affected() != 1 {
            return Ok(false);
        }

        for file in files {
            let deliverable = Deliverable::new(id, file);
            sqlx::query("INSERT INTO deliverables (id, booking_id, file_ref, created_at) VALUES (?, ?, ?, ?)")
                .bind(&deliverable.id).bind(&deliverable.booking_id).bind(&deliverable.file_ref).bind(deliverable.created_at)
                .execute(&mut *tx).await.map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(true)
    }
}

#[async_trait]
impl PaymentStatusProvider for SqliteBookingRepo {
    async fn payment_snapshot(&self, booking_id: &str) -> Result<Option<PaymentSnapshot>, AppError> {
        let row = sqlx::query("SELECT payment_status, amount_paid FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(PaymentSnapshot {
                payment_status: row.get::<String, _>("payment_status").parse()?,
                amount_paid: row.get::<i64, _>("amount_paid"),
            })),
            None => Ok(None),
        }
    }
}
