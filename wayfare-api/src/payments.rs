use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_booking::payment::{WebhookOutcome, WebhookPayload};
use wayfare_booking::{Payment, PaymentMethod};
use wayfare_core::{Page, PageParams};
use wayfare_store::payment_repo::PaymentRepository;

use crate::error::ApiError;
use crate::middleware::auth::{AdminAuth, Auth};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitiatePayment {
    pub booking_id: Uuid,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPayment {
    pub transaction_id: String,
    #[serde(default)]
    pub gateway_response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct FailPayment {
    #[serde(default)]
    pub gateway_response: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    received: bool,
    replayed: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments", get(list_payments).post(initiate_payment))
        .route("/v1/payments/webhook", post(payment_webhook))
        .route("/v1/payments/{id}", get(get_payment))
        .route("/v1/payments/{id}/confirm", post(confirm_payment))
        .route("/v1/payments/{id}/fail", post(fail_payment))
        .route("/v1/admin/payments/{id}/refund", post(refund_payment))
}

async fn initiate_payment(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Json(input): Json<InitiatePayment>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let payment = state
        .payments
        .initiate(&ctx, input.booking_id, input.payment_method)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn list_payments(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Payment>>, ApiError> {
    let (rows, total) =
        PaymentRepository::list_for_user(&state.db.pool, ctx.user_id, &page).await?;
    let payments = rows
        .into_iter()
        .map(Payment::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(Page::new(payments, &page, total)))
}

async fn get_payment(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.payments.get(&ctx, id).await?))
}

async fn confirm_payment(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
    Json(input): Json<ConfirmPayment>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .confirm(&ctx, id, &input.transaction_id, input.gateway_response)
        .await?;
    Ok(Json(payment))
}

async fn fail_payment(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(id): Path<Uuid>,
    Json(input): Json<FailPayment>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state.payments.fail(&ctx, id, input.gateway_response).await?;
    Ok(Json(payment))
}

async fn refund_payment(
    State(state): State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.payments.refund(&ctx, id).await?))
}

/// Unauthenticated gateway callback. Replays of an already-applied status are
/// acknowledged without re-applying anything.
async fn payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookAck>, ApiError> {
    let outcome = state.payments.apply_webhook(&payload).await?;
    Ok(Json(WebhookAck {
        received: true,
        replayed: outcome == WebhookOutcome::Replayed,
    }))
}
