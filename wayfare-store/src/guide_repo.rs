use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;
use wayfare_catalog::guide::GuideProfile;
use wayfare_core::PageParams;

#[derive(Debug, sqlx::FromRow)]
struct GuideRow {
    id: Uuid,
    user_id: Uuid,
    bio: String,
    languages: serde_json::Value,
    specialties: serde_json::Value,
    certifications: serde_json::Value,
    experience_years: i32,
    is_verified: bool,
    is_available: bool,
    rating: Option<f64>,
    created_at: DateTime<Utc>,
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

impl From<GuideRow> for GuideProfile {
    fn from(row: GuideRow) -> Self {
        GuideProfile {
            id: row.id,
            user_id: row.user_id,
            bio: row.bio,
            languages: string_list(row.languages),
            specialties: string_list(row.specialties),
            certifications: string_list(row.certifications),
            experience_years: row.experience_years,
            is_verified: row.is_verified,
            is_available: row.is_available,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

const GUIDE_COLUMNS: &str = "id, user_id, bio, languages, specialties, certifications, \
     experience_years, is_verified, is_available, rating, created_at";

#[derive(Debug, Default, Clone)]
pub struct GuideFilter {
    pub language: Option<String>,
    pub specialty: Option<String>,
    pub min_rating: Option<f64>,
}

pub struct GuideRepository {
    pool: PgPool,
}

impl GuideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, guide: &GuideProfile) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO guides (id, user_id, bio, languages, specialties, certifications,
                experience_years, is_verified, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(guide.id)
        .bind(guide.user_id)
        .bind(&guide.bio)
        .bind(serde_json::json!(guide.languages))
        .bind(serde_json::json!(guide.specialties))
        .bind(serde_json::json!(guide.certifications))
        .bind(guide.experience_years)
        .bind(guide.is_verified)
        .bind(guide.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update(&self, guide: &GuideProfile) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE guides SET bio = $2, languages = $3, specialties = $4, certifications = $5,
                experience_years = $6, is_available = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(guide.id)
        .bind(&guide.bio)
        .bind(serde_json::json!(guide.languages))
        .bind(serde_json::json!(guide.specialties))
        .bind(serde_json::json!(guide.certifications))
        .bind(guide.experience_years)
        .bind(guide.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<GuideProfile>, sqlx::Error> {
        let row: Option<GuideRow> = sqlx::query_as(&format!(
            "SELECT {GUIDE_COLUMNS} FROM guides WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_verified(&self, id: Uuid) -> Result<Option<GuideProfile>, sqlx::Error> {
        let row: Option<GuideRow> = sqlx::query_as(&format!(
            "SELECT {GUIDE_COLUMNS} FROM guides WHERE id = $1 AND is_verified = TRUE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_verified(
        &self,
        filter: &GuideFilter,
        page: &PageParams,
    ) -> Result<(Vec<GuideProfile>, i64), sqlx::Error> {
        fn push_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &GuideFilter) {
            builder.push(" WHERE is_verified = TRUE AND is_available = TRUE");
            if let Some(language) = &filter.language {
                builder
                    .push(" AND languages @> ")
                    .push_bind(serde_json::json!([language]));
            }
            if let Some(specialty) = &filter.specialty {
                builder
                    .push(" AND specialties @> ")
                    .push_bind(serde_json::json!([specialty]));
            }
            if let Some(min_rating) = filter.min_rating {
                builder.push(" AND rating >= ").push_bind(min_rating);
            }
        }

        let mut count = QueryBuilder::new("SELECT COUNT(*) AS total FROM guides");
        push_filters(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.get("total");

        let mut builder = QueryBuilder::new(format!("SELECT {GUIDE_COLUMNS} FROM guides"));
        push_filters(&mut builder, filter);
        builder.push(" ORDER BY rating DESC NULLS LAST, created_at ASC");
        builder.push(" LIMIT ").push_bind(page.per_page());
        builder.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<GuideRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn list_pending(&self, page: &PageParams) -> Result<(Vec<GuideProfile>, i64), sqlx::Error> {
        let total: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM guides WHERE is_verified = FALSE")
                .fetch_one(&self.pool)
                .await?
                .get("total");

        let rows: Vec<GuideRow> = sqlx::query_as(&format!(
            "SELECT {GUIDE_COLUMNS} FROM guides WHERE is_verified = FALSE \
             ORDER BY created_at ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn verify(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE guides SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refreshes the denormalized guide rating from approved reviews.
    /// Keyed by the guide's user id, which is what tours reference.
    pub async fn refresh_rating(&self, guide_user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE guides g SET rating = (
                SELECT AVG(r.rating)::DOUBLE PRECISION FROM reviews r
                JOIN tours t ON t.id = r.tour_id
                WHERE t.guide_id = g.user_id AND r.is_approved = TRUE
            ), updated_at = NOW()
            WHERE g.user_id = $1
            "#,
        )
        .bind(guide_user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
