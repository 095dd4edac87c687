use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use wayfare_booking::{Booking, CreateBooking};
use wayfare_core::{Page, PageParams};
use wayfare_store::booking_repo::{BookingFilter, BookingRepository, BookingStats};

use crate::error::ApiError;
use crate::middleware::auth::Auth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBooking {
    pub reason: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings).post(create_booking))
        .route("/v1/bookings/statistics", get(booking_statistics))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/complete", post(complete_booking))
        .route("/v1/guide/bookings", get(guide_bookings))
}

async fn create_booking(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Json(input): Json<CreateBooking>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    if input.participants < 1 {
        let mut errors = wayfare_core::FieldErrors::new();
        errors.push("participants", "must be at least 1");
        return Err(errors.into());
    }
    let booking = state.bookings.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Page<Booking>>, ApiError> {
    let filter = BookingFilter {
        status: query.status,
        from_date: query.from_date,
        to_date: query.to_date,
    };
    let page = PageParams { page: query.page, per_page: query.per_page };
    let (rows, total) =
        BookingRepository::list_for_user(&state.db.pool, ctx.user_id, &filter, &page).await?;
    let bookings = rows
        .into_iter()
        .map(Booking::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(Page::new(bookings, &page, total)))
}

async fn booking_statistics(
    State(state): State<AppState>,
    Auth(ctx): Auth,
) -> Result<Json<BookingStats>, ApiError> {
    let stats = BookingRepository::statistics(&state.db.pool, ctx.user_id).await?;
    Ok(Json(stats))
}

async fn get_booking(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.bookings.get(&ctx, id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
    Json(input): Json<CancelBooking>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.bookings.cancel(&ctx, id, &input.reason).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.bookings.confirm(&ctx, id).await?))
}

async fn complete_booking(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.bookings.complete(&ctx, id).await?))
}

async fn guide_bookings(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Booking>>, ApiError> {
    let (rows, total) =
        BookingRepository::list_for_guide(&state.db.pool, ctx.user_id, &page).await?;
    let bookings = rows
        .into_iter()
        .map(Booking::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(Page::new(bookings, &page, total)))
}
