use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use wayfare_catalog::favorite::Favorite;
use wayfare_core::{Page, PageParams};
use wayfare_store::favorite_repo::FavoriteRepository;
use wayfare_store::tour_repo::TourRepository;

use crate::error::ApiError;
use crate::middleware::auth::Auth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct FavoriteState {
    favorited: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/favorites", get(list_favorites))
        .route(
            "/v1/favorites/{tour_id}",
            post(toggle_favorite).delete(remove_favorite),
        )
        .route("/v1/favorites/{tour_id}/check", get(check_favorite))
}

async fn list_favorites(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Favorite>>, ApiError> {
    let repo = FavoriteRepository::new(state.db.pool.clone());
    let (favorites, total) = repo.list_for_user(ctx.user_id, &page).await?;
    Ok(Json(Page::new(favorites, &page, total)))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<FavoriteState>, ApiError> {
    let tours = TourRepository::new(state.db.pool.clone());
    if tours.find(id).await?.is_none() {
        return Err(ApiError::NotFound("Tour not found".to_string()));
    }
    let repo = FavoriteRepository::new(state.db.pool.clone());
    let favorited = repo.toggle(ctx.user_id, id).await?;
    Ok(Json(FavoriteState { favorited }))
}

async fn check_favorite(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<FavoriteState>, ApiError> {
    let repo = FavoriteRepository::new(state.db.pool.clone());
    let favorited = repo.exists(ctx.user_id, id).await?;
    Ok(Json(FavoriteState { favorited }))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = FavoriteRepository::new(state.db.pool.clone());
    if !repo.remove(ctx.user_id, id).await? {
        return Err(ApiError::NotFound("Favorite not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
