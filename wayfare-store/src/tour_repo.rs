use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;
use wayfare_catalog::tour::{Difficulty, Tour, TourStatus};
use wayfare_core::PageParams;

use crate::PgTx;

#[derive(Debug, sqlx::FromRow)]
struct TourRow {
    id: Uuid,
    guide_id: Uuid,
    category_id: Uuid,
    title: String,
    slug: String,
    description: String,
    short_description: Option<String>,
    location: Option<String>,
    meeting_point: Option<String>,
    duration_hours: i32,
    max_participants: i32,
    price_cents: i64,
    difficulty: String,
    status: String,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn decode(row: TourRow) -> Result<Tour, sqlx::Error> {
    let difficulty: Difficulty = row
        .difficulty
        .parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
    let status: TourStatus = row
        .status
        .parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
    Ok(Tour {
        id: row.id,
        guide_id: row.guide_id,
        category_id: row.category_id,
        title: row.title,
        slug: row.slug,
        description: row.description,
        short_description: row.short_description,
        location: row.location,
        meeting_point: row.meeting_point,
        duration_hours: row.duration_hours,
        max_participants: row.max_participants,
        price_cents: row.price_cents,
        difficulty,
        status,
        featured: row.featured,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const TOUR_COLUMNS: &str = "id, guide_id, category_id, title, slug, description, short_description, \
     location, meeting_point, duration_hours, max_participants, price_cents, \
     difficulty, status, featured, created_at, updated_at";

/// Public list filters. `status` is forced to `active` by the public handlers;
/// guide-scoped listings leave it open.
#[derive(Debug, Default, Clone)]
pub struct TourFilter {
    pub status: Option<TourStatus>,
    pub category_id: Option<Uuid>,
    pub guide_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub featured: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
}

fn push_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &TourFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(guide_id) = filter.guide_id {
        builder.push(" AND guide_id = ").push_bind(guide_id);
    }
    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty.as_str());
    }
    if let Some(min) = filter.min_price_cents {
        builder.push(" AND price_cents >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price_cents {
        builder.push(" AND price_cents <= ").push_bind(max);
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND title ILIKE ")
            .push_bind(format!("%{}%", search));
    }
    if let Some(location) = &filter.location {
        builder
            .push(" AND location ILIKE ")
            .push_bind(format!("%{}%", location));
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND featured = ").push_bind(featured);
    }
}

pub struct TourRepository {
    pool: PgPool,
}

impl TourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, tour: &Tour) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tours (id, guide_id, category_id, title, slug, description,
                short_description, location, meeting_point, duration_hours,
                max_participants, price_cents, difficulty, status, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(tour.id)
        .bind(tour.guide_id)
        .bind(tour.category_id)
        .bind(&tour.title)
        .bind(&tour.slug)
        .bind(&tour.description)
        .bind(&tour.short_description)
        .bind(&tour.location)
        .bind(&tour.meeting_point)
        .bind(tour.duration_hours)
        .bind(tour.max_participants)
        .bind(tour.price_cents)
        .bind(tour.difficulty.as_str())
        .bind(tour.status.as_str())
        .bind(tour.featured)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update(&self, tour: &Tour) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE tours SET category_id = $2, title = $3, slug = $4, description = $5,
                short_description = $6, location = $7, meeting_point = $8,
                duration_hours = $9, max_participants = $10, price_cents = $11,
                difficulty = $12, status = $13, featured = $14, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(tour.id)
        .bind(tour.category_id)
        .bind(&tour.title)
        .bind(&tour.slug)
        .bind(&tour.description)
        .bind(&tour.short_description)
        .bind(&tour.location)
        .bind(&tour.meeting_point)
        .bind(tour.duration_hours)
        .bind(tour.max_participants)
        .bind(tour.price_cents)
        .bind(tour.difficulty.as_str())
        .bind(tour.status.as_str())
        .bind(tour.featured)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tours SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Tour>, sqlx::Error> {
        let row: Option<TourRow> = sqlx::query_as(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode).transpose()
    }

    pub async fn find_active_by_slug(&self, slug: &str) -> Result<Option<Tour>, sqlx::Error> {
        let row: Option<TourRow> = sqlx::query_as(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE slug = $1 AND status = 'active' AND deleted_at IS NULL"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode).transpose()
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 AS one FROM tours WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn list(
        &self,
        filter: &TourFilter,
        page: &PageParams,
    ) -> Result<(Vec<Tour>, i64), sqlx::Error> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) AS total FROM tours");
        push_filters(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.get("total");

        let mut builder = QueryBuilder::new(format!("SELECT {TOUR_COLUMNS} FROM tours"));
        push_filters(&mut builder, filter);

        // Sort column is whitelisted, never interpolated from raw input.
        let sort = match filter.sort_by.as_deref() {
            Some("price") => "price_cents",
            Some("title") => "title",
            _ => "created_at",
        };
        builder.push(format!(
            " ORDER BY {} {}",
            sort,
            if filter.sort_desc { "DESC" } else { "ASC" }
        ));
        builder.push(" LIMIT ").push_bind(page.per_page());
        builder.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<TourRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let tours = rows.into_iter().map(decode).collect::<Result<_, _>>()?;
        Ok((tours, total))
    }

    pub async fn featured(&self, limit: i64) -> Result<Vec<Tour>, sqlx::Error> {
        let rows: Vec<TourRow> = sqlx::query_as(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours \
             WHERE status = 'active' AND featured = TRUE AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Active tours ranked by how often they have actually been booked.
    pub async fn popular(&self, limit: i64) -> Result<Vec<Tour>, sqlx::Error> {
        let rows: Vec<TourRow> = sqlx::query_as(&format!(
            "SELECT t.{} FROM tours t \
             LEFT JOIN bookings b ON b.tour_id = t.id \
               AND b.status IN ('confirmed', 'completed') AND b.deleted_at IS NULL \
             WHERE t.status = 'active' AND t.deleted_at IS NULL \
             GROUP BY t.id \
             ORDER BY COUNT(b.id) DESC, t.created_at DESC LIMIT $1",
            TOUR_COLUMNS.replace(", ", ", t.")
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Row-locked read used while a booking transaction is deciding whether
    /// the tour is still bookable.
    pub async fn find_for_booking(
        tx: &mut PgTx<'_>,
        id: Uuid,
    ) -> Result<Option<Tour>, sqlx::Error> {
        let row: Option<TourRow> = sqlx::query_as(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND deleted_at IS NULL FOR SHARE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(decode).transpose()
    }
}
