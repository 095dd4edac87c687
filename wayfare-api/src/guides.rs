use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_booking::Review;
use wayfare_catalog::guide::{GuideProfile, RegisterGuide, UpdateGuide};
use wayfare_catalog::tour::{Tour, TourStatus};
use wayfare_core::{Page, PageParams};
use wayfare_store::guide_repo::{GuideFilter, GuideRepository};
use wayfare_store::review_repo::ReviewRepository;
use wayfare_store::tour_repo::{TourFilter, TourRepository};

use crate::error::ApiError;
use crate::middleware::auth::{AdminAuth, Auth};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GuideListQuery {
    pub language: Option<String>,
    pub specialty: Option<String>,
    pub min_rating: Option<f64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GuideDetail {
    #[serde(flatten)]
    pub guide: GuideProfile,
    pub tours: Vec<Tour>,
    pub recent_reviews: Vec<Review>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/guides", get(list_guides).post(register_guide))
        .route("/v1/guides/me", get(my_profile).put(update_profile))
        .route("/v1/guides/{id}", get(guide_detail))
        .route("/v1/admin/guides/pending", get(pending_guides))
        .route("/v1/admin/guides/{id}/verify", put(verify_guide))
}

async fn list_guides(
    State(state): State<AppState>,
    Query(query): Query<GuideListQuery>,
) -> Result<Json<Page<GuideProfile>>, ApiError> {
    let repo = GuideRepository::new(state.db.pool.clone());
    let filter = GuideFilter {
        language: query.language,
        specialty: query.specialty,
        min_rating: query.min_rating,
    };
    let page = PageParams { page: query.page, per_page: query.per_page };
    let (guides, total) = repo.list_verified(&filter, &page).await?;
    Ok(Json(Page::new(guides, &page, total)))
}

async fn guide_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GuideDetail>, ApiError> {
    let repo = GuideRepository::new(state.db.pool.clone());
    let guide = repo
        .find_verified(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Guide not found".to_string()))?;

    let tours_repo = TourRepository::new(state.db.pool.clone());
    let filter = TourFilter {
        status: Some(TourStatus::Active),
        guide_id: Some(guide.user_id),
        sort_desc: true,
        ..Default::default()
    };
    let (tours, _) = tours_repo.list(&filter, &PageParams::default()).await?;
    let recent_reviews = ReviewRepository::recent_for_guide(&state.db.pool, guide.user_id, 5)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(Json(GuideDetail { guide, tours, recent_reviews }))
}

async fn register_guide(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Json(input): Json<RegisterGuide>,
) -> Result<(StatusCode, Json<GuideProfile>), ApiError> {
    input.validate()?;
    let repo = GuideRepository::new(state.db.pool.clone());
    if repo.find_by_user(ctx.user_id).await?.is_some() {
        return Err(ApiError::BadRequest(
            "A guide profile already exists for this user".to_string(),
        ));
    }

    let guide = GuideProfile {
        id: Uuid::new_v4(),
        user_id: ctx.user_id,
        bio: input.bio,
        languages: input.languages,
        specialties: input.specialties,
        certifications: input.certifications,
        experience_years: input.experience_years,
        is_verified: false,
        is_available: true,
        rating: None,
        created_at: chrono::Utc::now(),
    };
    repo.insert(&guide).await?;
    Ok((StatusCode::CREATED, Json(guide)))
}

async fn my_profile(
    State(state): State<AppState>,
    Auth(ctx): Auth,
) -> Result<Json<GuideProfile>, ApiError> {
    let repo = GuideRepository::new(state.db.pool.clone());
    let guide = repo
        .find_by_user(ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Guide profile not found".to_string()))?;
    Ok(Json(guide))
}

async fn update_profile(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Json(input): Json<UpdateGuide>,
) -> Result<Json<GuideProfile>, ApiError> {
    let repo = GuideRepository::new(state.db.pool.clone());
    let mut guide = repo
        .find_by_user(ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Guide profile not found".to_string()))?;

    if let Some(bio) = input.bio {
        guide.bio = bio;
    }
    if let Some(languages) = input.languages {
        guide.languages = languages;
    }
    if let Some(specialties) = input.specialties {
        guide.specialties = specialties;
    }
    if let Some(certifications) = input.certifications {
        guide.certifications = certifications;
    }
    if let Some(experience_years) = input.experience_years {
        guide.experience_years = experience_years;
    }
    if let Some(is_available) = input.is_available {
        guide.is_available = is_available;
    }
    repo.update(&guide).await?;
    Ok(Json(guide))
}

async fn pending_guides(
    State(state): State<AppState>,
    AdminAuth(_ctx): AdminAuth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<GuideProfile>>, ApiError> {
    let repo = GuideRepository::new(state.db.pool.clone());
    let (guides, total) = repo.list_pending(&page).await?;
    Ok(Json(Page::new(guides, &page, total)))
}

async fn verify_guide(
    State(state): State<AppState>,
    AdminAuth(_ctx): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = GuideRepository::new(state.db.pool.clone());
    if !repo.verify(id).await? {
        return Err(ApiError::NotFound("Guide not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
