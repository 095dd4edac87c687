use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;
use wayfare_core::PageParams;

use crate::PgTx;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PAYMENT_COLUMNS: &str = "id, booking_id, amount_cents, method, status, transaction_id, \
     gateway_response, created_at, updated_at";

pub struct PaymentRepository;

impl PaymentRepository {
    pub async fn insert(tx: &mut PgTx<'_>, payment: &PaymentRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, amount_cents, method, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount_cents)
        .bind(&payment.method)
        .bind(&payment.status)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<PaymentRow>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_update(
        tx: &mut PgTx<'_>,
        id: Uuid,
    ) -> Result<Option<PaymentRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn set_status(
        tx: &mut PgTx<'_>,
        id: Uuid,
        status: &str,
        transaction_id: Option<&str>,
        gateway_response: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE payments SET status = $2, \
             transaction_id = COALESCE($3, transaction_id), \
             gateway_response = COALESCE($4, gateway_response), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(transaction_id)
        .bind(gateway_response)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<PaymentRow>, i64), sqlx::Error> {
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM payments p \
             JOIN bookings b ON b.id = p.booking_id \
             WHERE b.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?
        .get("total");

        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT p.{} FROM payments p \
             JOIN bookings b ON b.id = p.booking_id \
             WHERE b.user_id = $1 \
             ORDER BY p.created_at DESC LIMIT $2 OFFSET $3",
            PAYMENT_COLUMNS.replace(", ", ", p.")
        ))
        .bind(user_id)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok((rows, total))
    }
}
