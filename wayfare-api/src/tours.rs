use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_catalog::schedule::{ScheduleSlot, SlotStatus};
use wayfare_catalog::tour::{slugify, CreateTour, Difficulty, Tour, TourStatus, UpdateTour};
use wayfare_core::{FieldErrors, Page, PageParams, Role};
use wayfare_store::review_repo::{RatingSummary, ReviewRepository};
use wayfare_store::schedule_repo::ScheduleRepository;
use wayfare_store::tour_repo::{TourFilter, TourRepository};

use crate::error::ApiError;
use crate::middleware::auth::Auth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TourListQuery {
    pub category_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub featured: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    // serde_urlencoded cannot deserialize flattened numeric fields, so the
    // paging params are spelled out here.
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl TourListQuery {
    fn page(&self) -> PageParams {
        PageParams { page: self.page, per_page: self.per_page }
    }

    fn filter(&self) -> TourFilter {
        TourFilter {
            status: Some(TourStatus::Active),
            category_id: self.category_id,
            guide_id: None,
            difficulty: self.difficulty,
            min_price_cents: self.min_price_cents,
            max_price_cents: self.max_price_cents,
            search: self.search.clone(),
            location: self.location.clone(),
            featured: self.featured,
            sort_by: self.sort_by.clone(),
            sort_desc: self.sort_order.as_deref() != Some("asc"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TourDetail {
    #[serde(flatten)]
    pub tour: Tour,
    pub schedules: Vec<ScheduleSlot>,
    pub rating: RatingSummary,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub date: chrono::NaiveDate,
    pub start_time: Option<chrono::NaiveTime>,
    pub end_time: Option<chrono::NaiveTime>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours", get(list_tours))
        .route("/v1/tours/featured", get(featured_tours))
        .route("/v1/tours/popular", get(popular_tours))
        .route("/v1/tours/{slug}", get(tour_detail))
        .route("/v1/guide/tours", get(my_tours).post(create_tour))
        .route("/v1/guide/tours/{id}", put(update_tour).delete(delete_tour))
        .route("/v1/guide/tours/{id}/schedules", post(create_schedule))
}

async fn list_tours(
    State(state): State<AppState>,
    Query(query): Query<TourListQuery>,
) -> Result<Json<Page<Tour>>, ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    let page = query.page();
    let (tours, total) = repo.list(&query.filter(), &page).await?;
    Ok(Json(Page::new(tours, &page, total)))
}

async fn featured_tours(State(state): State<AppState>) -> Result<Json<Vec<Tour>>, ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    Ok(Json(repo.featured(8).await?))
}

async fn popular_tours(State(state): State<AppState>) -> Result<Json<Vec<Tour>>, ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    Ok(Json(repo.popular(8).await?))
}

async fn tour_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TourDetail>, ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    let tour = repo
        .find_active_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tour not found".to_string()))?;

    let today = chrono::Utc::now().date_naive();
    let schedules =
        ScheduleRepository::upcoming_available(&state.db.pool, tour.id, today).await?;
    let rating = ReviewRepository::rating_summary(&state.db.pool, tour.id).await?;

    Ok(Json(TourDetail { tour, schedules, rating }))
}

async fn my_tours(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Tour>>, ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    let filter = TourFilter {
        guide_id: Some(ctx.user_id),
        sort_desc: true,
        ..Default::default()
    };
    let (tours, total) = repo.list(&filter, &page).await?;
    Ok(Json(Page::new(tours, &page, total)))
}

async fn create_tour(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Json(input): Json<CreateTour>,
) -> Result<(StatusCode, Json<Tour>), ApiError> {
    if ctx.role != Role::Guide && !ctx.is_admin() {
        return Err(ApiError::Forbidden("Guide role required".to_string()));
    }
    input.validate()?;

    let repo = TourRepository::new(state.db.pool.clone());
    let slug = available_slug(&repo, &input.title, None).await?;

    let now = chrono::Utc::now();
    let tour = Tour {
        id: Uuid::new_v4(),
        guide_id: ctx.user_id,
        category_id: input.category_id,
        title: input.title,
        slug,
        description: input.description,
        short_description: input.short_description,
        location: input.location,
        meeting_point: input.meeting_point,
        duration_hours: input.duration_hours,
        max_participants: input.max_participants,
        price_cents: input.price_cents,
        difficulty: input.difficulty,
        status: TourStatus::Draft,
        featured: false,
        created_at: now,
        updated_at: now,
    };
    repo.insert(&tour).await?;
    Ok((StatusCode::CREATED, Json(tour)))
}

async fn update_tour(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTour>,
) -> Result<Json<Tour>, ApiError> {
    input.validate()?;
    let repo = TourRepository::new(state.db.pool.clone());
    let mut tour = repo
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tour not found".to_string()))?;
    if !ctx.owns_or_admin(tour.guide_id) {
        return Err(ApiError::Forbidden("Not your tour".to_string()));
    }

    if let Some(title) = input.title {
        tour.slug = available_slug(&repo, &title, Some(&tour.slug)).await?;
        tour.title = title;
    }
    if let Some(category_id) = input.category_id {
        tour.category_id = category_id;
    }
    if let Some(description) = input.description {
        tour.description = description;
    }
    if input.short_description.is_some() {
        tour.short_description = input.short_description;
    }
    if input.location.is_some() {
        tour.location = input.location;
    }
    if input.meeting_point.is_some() {
        tour.meeting_point = input.meeting_point;
    }
    if let Some(duration_hours) = input.duration_hours {
        tour.duration_hours = duration_hours;
    }
    if let Some(max_participants) = input.max_participants {
        tour.max_participants = max_participants;
    }
    if let Some(price_cents) = input.price_cents {
        tour.price_cents = price_cents;
    }
    if let Some(difficulty) = input.difficulty {
        tour.difficulty = difficulty;
    }
    if let Some(status) = input.status {
        tour.status = status;
    }
    // Only admins may feature a tour.
    if let Some(featured) = input.featured {
        if ctx.is_admin() {
            tour.featured = featured;
        }
    }

    repo.update(&tour).await?;
    Ok(Json(tour))
}

async fn delete_tour(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    let tour = repo
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tour not found".to_string()))?;
    if !ctx.owns_or_admin(tour.guide_id) {
        return Err(ApiError::Forbidden("Not your tour".to_string()));
    }
    repo.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_schedule(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleSlot>), ApiError> {
    let repo = TourRepository::new(state.db.pool.clone());
    let tour = repo
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tour not found".to_string()))?;
    if !ctx.owns_or_admin(tour.guide_id) {
        return Err(ApiError::Forbidden("Not your tour".to_string()));
    }

    let today = chrono::Utc::now().date_naive();
    if input.date < today {
        let mut errors = FieldErrors::new();
        errors.push("date", "must not be in the past");
        return Err(errors.into());
    }

    let slot = ScheduleSlot {
        id: Uuid::new_v4(),
        tour_id: tour.id,
        date: input.date,
        start_time: input.start_time,
        end_time: input.end_time,
        available_spots: tour.max_participants,
        status: SlotStatus::Available,
        created_at: chrono::Utc::now(),
    };
    ScheduleRepository::insert(&state.db.pool, &slot).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Slug for `title`, de-duplicated against the store. A tour being renamed
/// keeps its own slug when the new title still resolves to it.
async fn available_slug(
    repo: &TourRepository,
    title: &str,
    current: Option<&str>,
) -> Result<String, ApiError> {
    let slug = slugify(title);
    if current == Some(slug.as_str()) {
        return Ok(slug);
    }
    if repo.slug_exists(&slug).await? {
        return Ok(collision_suffix(&slug));
    }
    Ok(slug)
}

fn collision_suffix(slug: &str) -> String {
    format!("{}-{}", slug, &Uuid::new_v4().simple().to_string()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixed_slug_keeps_base_and_stays_unique() {
        let a = collision_suffix("harbor-walk");
        let b = collision_suffix("harbor-walk");
        assert!(a.starts_with("harbor-walk-"));
        assert_eq!(a.len(), "harbor-walk-".len() + 8);
        assert_ne!(a, b);
    }
}
