use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use wayfare_catalog::category::{Category, CreateCategory, UpdateCategory};
use wayfare_catalog::tour::slugify;
use wayfare_store::category_repo::CategoryRepository;

use crate::error::ApiError;
use crate::middleware::auth::AdminAuth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/categories", get(list_categories))
        .route("/v1/categories/popular", get(popular_categories))
        .route("/v1/categories/{slug}", get(category_detail))
        .route("/v1/admin/categories", post(create_category))
        .route(
            "/v1/admin/categories/{id}",
            put(update_category).delete(delete_category),
        )
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let repo = CategoryRepository::new(state.db.pool.clone());
    Ok(Json(repo.list().await?))
}

async fn popular_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let repo = CategoryRepository::new(state.db.pool.clone());
    Ok(Json(repo.popular(8).await?))
}

async fn category_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let repo = CategoryRepository::new(state.db.pool.clone());
    let category = repo
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;
    Ok(Json(category))
}

async fn create_category(
    State(state): State<AppState>,
    AdminAuth(_ctx): AdminAuth,
    Json(input): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    input.validate()?;
    let repo = CategoryRepository::new(state.db.pool.clone());
    let category = Category {
        id: Uuid::new_v4(),
        slug: available_slug(&repo, &input.name, None).await?,
        name: input.name,
        description: input.description,
        icon: input.icon,
        created_at: chrono::Utc::now(),
    };
    repo.insert(&category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    AdminAuth(_ctx): AdminAuth,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategory>,
) -> Result<Json<Category>, ApiError> {
    let repo = CategoryRepository::new(state.db.pool.clone());
    let mut category = repo
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    if let Some(name) = input.name {
        category.slug = available_slug(&repo, &name, Some(&category.slug)).await?;
        category.name = name;
    }
    if input.description.is_some() {
        category.description = input.description;
    }
    if input.icon.is_some() {
        category.icon = input.icon;
    }
    repo.update(&category).await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    AdminAuth(_ctx): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = CategoryRepository::new(state.db.pool.clone());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// As with tours, a rename that still resolves to the category's own slug is
/// not a collision.
async fn available_slug(
    repo: &CategoryRepository,
    name: &str,
    current: Option<&str>,
) -> Result<String, ApiError> {
    let slug = slugify(name);
    if current == Some(slug.as_str()) {
        return Ok(slug);
    }
    if repo.find_by_slug(&slug).await?.is_some() {
        return Ok(format!("{}-{}", slug, &Uuid::new_v4().simple().to_string()[..8]));
    }
    Ok(slug)
}
