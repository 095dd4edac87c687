use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;
use wayfare_catalog::favorite::Favorite;
use wayfare_core::PageParams;

#[derive(Debug, sqlx::FromRow)]
struct FavoriteRow {
    id: Uuid,
    user_id: Uuid,
    tour_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Favorite {
            id: row.id,
            user_id: row.user_id,
            tour_id: row.tour_id,
            created_at: row.created_at,
        }
    }
}

pub struct FavoriteRepository {
    pool: PgPool,
}

impl FavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, user_id: Uuid, tour_id: Uuid) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 AS one FROM favorites WHERE user_id = $1 AND tour_id = $2")
            .bind(user_id)
            .bind(tour_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Flips the favorite on or off. Returns whether the tour is a favorite
    /// after the call. `ON CONFLICT DO NOTHING` keeps concurrent toggles from
    /// violating the unique pair.
    pub async fn toggle(&self, user_id: Uuid, tour_id: Uuid) -> Result<bool, sqlx::Error> {
        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND tour_id = $2")
            .bind(user_id)
            .bind(tour_id)
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO favorites (id, user_id, tour_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, tour_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tour_id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    pub async fn remove(&self, user_id: Uuid, tour_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND tour_id = $2")
            .bind(user_id)
            .bind(tour_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<Favorite>, i64), sqlx::Error> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        let rows: Vec<FavoriteRow> = sqlx::query_as(
            "SELECT id, user_id, tour_id, created_at FROM favorites WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}
