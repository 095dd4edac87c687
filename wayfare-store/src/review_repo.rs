use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;
use wayfare_core::PageParams;

use crate::PgTx;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const REVIEW_COLUMNS: &str = "id, booking_id, tour_id, user_id, rating, comment, is_approved, \
     approved_at, created_at, updated_at";

/// Aggregate over approved reviews only.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RatingSummary {
    pub avg_rating: Option<f64>,
    pub total_reviews: i64,
    /// Count per star, index 0 = one star.
    pub distribution: [i64; 5],
}

pub struct ReviewRepository;

impl ReviewRepository {
    pub async fn insert(tx: &mut PgTx<'_>, review: &ReviewRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, booking_id, tour_id, user_id, rating, comment, is_approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.booking_id)
        .bind(review.tour_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.is_approved)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<ReviewRow>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_booking(
        pool: &PgPool,
        booking_id: Uuid,
    ) -> Result<Option<ReviewRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(pool)
        .await
    }

    /// Duplicate check inside the submit transaction; the unique column on
    /// `booking_id` backs this up under races.
    pub async fn find_by_booking_tx(
        tx: &mut PgTx<'_>,
        booking_id: Uuid,
    ) -> Result<Option<ReviewRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE reviews SET rating = $2, comment = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn approve(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE reviews SET is_approved = TRUE, approved_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_approved_for_tour(
        pool: &PgPool,
        tour_id: Uuid,
        rating: Option<i32>,
        page: &PageParams,
    ) -> Result<(Vec<ReviewRow>, i64), sqlx::Error> {
        fn push_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, tour_id: Uuid, rating: Option<i32>) {
            builder
                .push(" WHERE tour_id = ")
                .push_bind(tour_id)
                .push(" AND is_approved = TRUE");
            if let Some(rating) = rating {
                builder.push(" AND rating = ").push_bind(rating);
            }
        }

        let mut count = QueryBuilder::new("SELECT COUNT(*) AS total FROM reviews");
        push_filters(&mut count, tour_id, rating);
        let total: i64 = count.build().fetch_one(pool).await?.get("total");

        let mut builder = QueryBuilder::new(format!("SELECT {REVIEW_COLUMNS} FROM reviews"));
        push_filters(&mut builder, tour_id, rating);
        builder.push(" ORDER BY created_at DESC");
        builder.push(" LIMIT ").push_bind(page.per_page());
        builder.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<ReviewRow> = builder.build_query_as().fetch_all(pool).await?;
        Ok((rows, total))
    }

    pub async fn rating_summary(pool: &PgPool, tour_id: Uuid) -> Result<RatingSummary, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                AVG(rating)::DOUBLE PRECISION AS avg_rating,
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE rating = 1) AS r1,
                COUNT(*) FILTER (WHERE rating = 2) AS r2,
                COUNT(*) FILTER (WHERE rating = 3) AS r3,
                COUNT(*) FILTER (WHERE rating = 4) AS r4,
                COUNT(*) FILTER (WHERE rating = 5) AS r5
            FROM reviews
            WHERE tour_id = $1 AND is_approved = TRUE
            "#,
        )
        .bind(tour_id)
        .fetch_one(pool)
        .await?;

        Ok(RatingSummary {
            avg_rating: row.get("avg_rating"),
            total_reviews: row.get("total"),
            distribution: [
                row.get("r1"),
                row.get("r2"),
                row.get("r3"),
                row.get("r4"),
                row.get("r5"),
            ],
        })
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<ReviewRow>, i64), sqlx::Error> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?
            .get("total");

        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok((rows, total))
    }

    pub async fn list_pending(
        pool: &PgPool,
        page: &PageParams,
    ) -> Result<(Vec<ReviewRow>, i64), sqlx::Error> {
        let total: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM reviews WHERE is_approved = FALSE")
                .fetch_one(pool)
                .await?
                .get("total");

        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE is_approved = FALSE \
             ORDER BY created_at ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok((rows, total))
    }

    /// Recent approved reviews across all of a guide's tours.
    pub async fn recent_for_guide(
        pool: &PgPool,
        guide_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ReviewRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT r.{} FROM reviews r \
             JOIN tours t ON t.id = r.tour_id \
             WHERE t.guide_id = $1 AND r.is_approved = TRUE \
             ORDER BY r.created_at DESC LIMIT $2",
            REVIEW_COLUMNS.replace(", ", ", r.")
        ))
        .bind(guide_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
