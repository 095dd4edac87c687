use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;
use wayfare_core::PageParams;

use crate::PgTx;

/// Raw booking row. Status fields stay as text here; the lifecycle crate owns
/// the enum decoding and every legality rule.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub reference: String,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub tour_date: NaiveDate,
    pub participants: i32,
    pub total_price_cents: i64,
    pub status: String,
    pub payment_status: String,
    pub special_requests: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const BOOKING_COLUMNS: &str = "id, reference, tour_id, user_id, tour_date, participants, \
     total_price_cents, status, payment_status, special_requests, \
     cancellation_reason, cancelled_at, created_at, updated_at";

/// Per-user filters for the booking history listing.
#[derive(Debug, Default, Clone)]
pub struct BookingFilter {
    pub status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total_spent_cents: i64,
    pub upcoming: i64,
}

pub struct BookingRepository;

impl BookingRepository {
    pub async fn insert(tx: &mut PgTx<'_>, booking: &BookingRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, reference, tour_id, user_id, tour_date, participants,
                total_price_cents, status, payment_status, special_requests)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.tour_id)
        .bind(booking.user_id)
        .bind(booking.tour_date)
        .bind(booking.participants)
        .bind(booking.total_price_cents)
        .bind(&booking.status)
        .bind(&booking.payment_status)
        .bind(&booking.special_requests)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<BookingRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Locks the booking row so concurrent transitions serialize.
    pub async fn find_for_update(
        tx: &mut PgTx<'_>,
        id: Uuid,
    ) -> Result<Option<BookingRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn set_status(tx: &mut PgTx<'_>, id: Uuid, status: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_payment_state(
        tx: &mut PgTx<'_>,
        id: Uuid,
        status: &str,
        payment_status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bookings SET status = $2, payment_status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn mark_cancelled(
        tx: &mut PgTx<'_>,
        id: Uuid,
        reason: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bookings SET status = 'cancelled', cancellation_reason = $2, \
             cancelled_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &BookingFilter,
        page: &PageParams,
    ) -> Result<(Vec<BookingRow>, i64), sqlx::Error> {
        fn push_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, user_id: Uuid, filter: &BookingFilter) {
            builder
                .push(" WHERE deleted_at IS NULL AND user_id = ")
                .push_bind(user_id);
            if let Some(status) = &filter.status {
                builder.push(" AND status = ").push_bind(status.clone());
            }
            if let Some(from) = filter.from_date {
                builder.push(" AND tour_date >= ").push_bind(from);
            }
            if let Some(to) = filter.to_date {
                builder.push(" AND tour_date <= ").push_bind(to);
            }
        }

        let mut count = QueryBuilder::new("SELECT COUNT(*) AS total FROM bookings");
        push_filters(&mut count, user_id, filter);
        let total: i64 = count.build().fetch_one(pool).await?.get("total");

        let mut builder = QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings"));
        push_filters(&mut builder, user_id, filter);
        builder.push(" ORDER BY created_at DESC");
        builder.push(" LIMIT ").push_bind(page.per_page());
        builder.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<BookingRow> = builder.build_query_as().fetch_all(pool).await?;
        Ok((rows, total))
    }

    pub async fn statistics(pool: &PgPool, user_id: Uuid) -> Result<BookingStats, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                COALESCE(SUM(total_price_cents)
                    FILTER (WHERE status IN ('confirmed', 'completed')), 0)::BIGINT AS total_spent_cents,
                COUNT(*) FILTER (WHERE status IN ('pending', 'confirmed')
                    AND tour_date >= CURRENT_DATE) AS upcoming
            FROM bookings
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(BookingStats {
            total: row.get("total"),
            pending: row.get("pending"),
            confirmed: row.get("confirmed"),
            completed: row.get("completed"),
            cancelled: row.get("cancelled"),
            total_spent_cents: row.get("total_spent_cents"),
            upcoming: row.get("upcoming"),
        })
    }

    /// Bookings taken against any of a guide's tours.
    pub async fn list_for_guide(
        pool: &PgPool,
        guide_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<BookingRow>, i64), sqlx::Error> {
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM bookings b \
             JOIN tours t ON t.id = b.tour_id \
             WHERE t.guide_id = $1 AND b.deleted_at IS NULL",
        )
        .bind(guide_id)
        .fetch_one(pool)
        .await?
        .get("total");

        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT b.{} FROM bookings b \
             JOIN tours t ON t.id = b.tour_id \
             WHERE t.guide_id = $1 AND b.deleted_at IS NULL \
             ORDER BY b.created_at DESC LIMIT $2 OFFSET $3",
            BOOKING_COLUMNS.replace(", ", ", b.")
        ))
        .bind(guide_id)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok((rows, total))
    }
}
