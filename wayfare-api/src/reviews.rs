use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use wayfare_booking::review::SubmitReview;
use wayfare_booking::Review;
use wayfare_core::{FieldErrors, Page, PageParams};
use wayfare_store::guide_repo::GuideRepository;
use wayfare_store::review_repo::ReviewRepository;
use wayfare_store::tour_repo::TourRepository;

use crate::error::ApiError;
use crate::middleware::auth::{AdminAuth, Auth};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TourReviewQuery {
    pub rating: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReview {
    pub rating: i32,
    pub comment: Option<String>,
}

impl UpdateReview {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if !(1..=5).contains(&self.rating) {
            errors.push("rating", "must be between 1 and 5");
        }
        if matches!(&self.comment, Some(c) if c.len() > 1000) {
            errors.push("comment", "must be at most 1000 characters");
        }
        errors.into_result()
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours/{slug}/reviews", get(tour_reviews))
        .route("/v1/reviews", get(my_reviews).post(submit_review))
        .route("/v1/reviews/{id}", put(update_review).delete(delete_review))
        .route("/v1/admin/reviews/pending", get(pending_reviews))
        .route("/v1/admin/reviews/{id}/approve", post(approve_review))
}

async fn tour_reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<TourReviewQuery>,
) -> Result<Json<Page<Review>>, ApiError> {
    let tour = TourRepository::new(state.db.pool.clone())
        .find_active_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tour not found".to_string()))?;

    let page = PageParams { page: query.page, per_page: query.per_page };
    let (rows, total) =
        ReviewRepository::list_approved_for_tour(&state.db.pool, tour.id, query.rating, &page)
            .await?;
    let reviews = rows.into_iter().map(Review::from).collect();
    Ok(Json(Page::new(reviews, &page, total)))
}

async fn my_reviews(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Review>>, ApiError> {
    let (rows, total) =
        ReviewRepository::list_for_user(&state.db.pool, ctx.user_id, &page).await?;
    let reviews = rows.into_iter().map(Review::from).collect();
    Ok(Json(Page::new(reviews, &page, total)))
}

async fn submit_review(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Json(input): Json<SubmitReview>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    input.validate()?;
    let review = state.reviews.submit(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReview>,
) -> Result<Json<Review>, ApiError> {
    input.validate()?;
    let review = state
        .reviews
        .update(&ctx, id, input.rating, input.comment.as_deref())
        .await?;
    Ok(Json(review))
}

async fn delete_review(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.reviews.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn pending_reviews(
    State(state): State<AppState>,
    AdminAuth(_ctx): AdminAuth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Review>>, ApiError> {
    let (rows, total) = ReviewRepository::list_pending(&state.db.pool, &page).await?;
    let reviews = rows.into_iter().map(Review::from).collect();
    Ok(Json(Page::new(reviews, &page, total)))
}

async fn approve_review(
    State(state): State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Review>, ApiError> {
    let review = state.reviews.approve(&ctx, id).await?;

    // The guide's denormalized rating follows its approved reviews.
    let tours = TourRepository::new(state.db.pool.clone());
    if let Some(tour) = tours.find(review.tour_id).await? {
        GuideRepository::new(state.db.pool.clone())
            .refresh_rating(tour.guide_id)
            .await?;
    }
    Ok(Json(review))
}
