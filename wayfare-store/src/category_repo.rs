use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use wayfare_catalog::category::Category;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    icon: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            icon: row.icon,
            created_at: row.created_at,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, icon, created_at";

pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, category: &Category) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO categories (id, name, slug, description, icon) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update(&self, category: &Category) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE categories SET name = $2, slug = $3, description = $4, icon = $5, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Categories ranked by how many active tours they hold.
    pub async fn popular(&self, limit: i64) -> Result<Vec<Category>, sqlx::Error> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT c.{} FROM categories c \
             LEFT JOIN tours t ON t.category_id = c.id \
               AND t.status = 'active' AND t.deleted_at IS NULL \
             GROUP BY c.id \
             ORDER BY COUNT(t.id) DESC, c.name ASC LIMIT $1",
            CATEGORY_COLUMNS.replace(", ", ", c.")
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
