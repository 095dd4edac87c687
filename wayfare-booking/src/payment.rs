use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use wayfare_core::RequestContext;
use wayfare_store::booking_repo::{BookingRepository, BookingRow};
use wayfare_store::payment_repo::{PaymentRepository, PaymentRow};
use wayfare_store::PgTx;

use crate::booking::{Booking, BookingStatus, PaymentState};
use crate::lifecycle::BookingLifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = sqlx::Error;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row
            .status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            amount_cents: row.amount_cents,
            method: row.method,
            status,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Gateway-originated status report. `status` only carries terminal values.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub payment_id: Uuid,
    pub status: String,
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The transition was applied.
    Applied,
    /// The payment was already in the reported state; nothing changed.
    Replayed,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment not found")]
    NotFound,

    #[error("booking not found")]
    BookingNotFound,

    #[error("not allowed to act on this payment")]
    Forbidden,

    #[error("booking is already paid")]
    AlreadyPaid,

    #[error("booking is not in a payable state")]
    InvalidBookingState,

    #[error("invalid payment transition from {from} to {to}")]
    InvalidTransition { from: PaymentStatus, to: PaymentStatus },

    #[error("unknown webhook status: {0}")]
    UnknownWebhookStatus(String),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// One payment row per attempt; its transitions drive the booking's
/// `payment_status` in the same transaction.
#[derive(Clone)]
pub struct PaymentLedger {
    pool: PgPool,
}

impl PaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a pending payment snapshotting the booking's total price.
    pub async fn initiate(
        &self,
        ctx: &RequestContext,
        booking_id: Uuid,
        method: PaymentMethod,
    ) -> Result<Payment, PaymentError> {
        let mut tx = self.pool.begin().await?;

        let row = BookingRepository::find_for_update(&mut tx, booking_id)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;
        if !ctx.owns_or_admin(row.user_id) {
            return Err(PaymentError::Forbidden);
        }
        let booking: Booking = row.try_into()?;
        if booking.payment_status == PaymentState::Paid {
            return Err(PaymentError::AlreadyPaid);
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(PaymentError::InvalidBookingState);
        }

        let payment = PaymentRow {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            amount_cents: booking.total_price_cents,
            method: method.as_str().to_string(),
            status: PaymentStatus::Pending.as_str().to_string(),
            transaction_id: None,
            gateway_response: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        PaymentRepository::insert(&mut tx, &payment).await?;
        tx.commit().await?;

        info!(payment = %payment.id, booking = %booking.reference, "payment initiated");
        let stored = PaymentRepository::find(&self.pool, payment.id)
            .await?
            .ok_or(PaymentError::NotFound)?;
        stored.try_into().map_err(PaymentError::Storage)
    }

    pub async fn confirm(
        &self,
        ctx: &RequestContext,
        payment_id: Uuid,
        transaction_id: &str,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Payment, PaymentError> {
        let mut tx = self.pool.begin().await?;
        let (payment, booking) = Self::load_pair(&mut tx, payment_id).await?;
        if !ctx.owns_or_admin(booking.user_id) {
            return Err(PaymentError::Forbidden);
        }

        Self::apply_completed(&mut tx, &payment, &booking, Some(transaction_id), gateway_response.as_ref()).await?;
        tx.commit().await?;

        info!(payment = %payment.id, booking = %booking.reference, "payment confirmed");
        self.reload(payment.id).await
    }

    pub async fn fail(
        &self,
        ctx: &RequestContext,
        payment_id: Uuid,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Payment, PaymentError> {
        let mut tx = self.pool.begin().await?;
        let (payment, booking) = Self::load_pair(&mut tx, payment_id).await?;
        if !ctx.owns_or_admin(booking.user_id) {
            return Err(PaymentError::Forbidden);
        }
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Failed,
            });
        }

        // A failed attempt leaves the booking untouched.
        PaymentRepository::set_status(
            &mut tx,
            payment.id,
            PaymentStatus::Failed.as_str(),
            None,
            gateway_response.as_ref(),
        )
        .await?;
        tx.commit().await?;

        info!(payment = %payment.id, "payment failed");
        self.reload(payment.id).await
    }

    /// Admin-only. Refunds the payment, cancels the booking, and releases the
    /// reserved slot capacity — all in one transaction.
    pub async fn refund(&self, ctx: &RequestContext, payment_id: Uuid) -> Result<Payment, PaymentError> {
        if !ctx.is_admin() {
            return Err(PaymentError::Forbidden);
        }
        let mut tx = self.pool.begin().await?;
        let (payment, booking) = Self::load_pair(&mut tx, payment_id).await?;
        if payment.status != PaymentStatus::Completed {
            return Err(PaymentError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            });
        }

        PaymentRepository::set_status(&mut tx, payment.id, PaymentStatus::Refunded.as_str(), None, None).await?;
        if refund_cancels_booking(booking.status) {
            // A booking cancelled by the refund gets a cancellation record of
            // its own; one the user already cancelled keeps the original.
            BookingRepository::mark_cancelled(&mut tx, booking.id, REFUND_CANCELLATION_REASON)
                .await?;
            BookingLifecycle::release_slot(&mut tx, &booking)
                .await
                .map_err(|e| match e {
                    crate::booking::BookingError::Storage(e) => PaymentError::Storage(e),
                    _ => PaymentError::InvalidBookingState,
                })?;
        }
        BookingRepository::set_payment_state(
            &mut tx,
            booking.id,
            BookingStatus::Cancelled.as_str(),
            PaymentState::Refunded.as_str(),
        )
        .await?;
        tx.commit().await?;

        info!(payment = %payment.id, booking = %booking.reference, "payment refunded");
        self.reload(payment.id).await
    }

    /// Applies a gateway-reported terminal status. Idempotent: replaying a
    /// status the payment already carries acknowledges without re-applying
    /// the booking transition.
    pub async fn apply_webhook(&self, payload: &WebhookPayload) -> Result<WebhookOutcome, PaymentError> {
        let reported: PaymentStatus = payload
            .status
            .parse()
            .map_err(|_| PaymentError::UnknownWebhookStatus(payload.status.clone()))?;
        if !reported.is_terminal() || reported == PaymentStatus::Refunded {
            return Err(PaymentError::UnknownWebhookStatus(payload.status.clone()));
        }

        let mut tx = self.pool.begin().await?;
        let (payment, booking) = Self::load_pair(&mut tx, payload.payment_id).await?;

        if payment.status == reported {
            info!(payment = %payment.id, status = %reported, "webhook replay ignored");
            return Ok(WebhookOutcome::Replayed);
        }

        match reported {
            PaymentStatus::Completed => {
                Self::apply_completed(
                    &mut tx,
                    &payment,
                    &booking,
                    payload.transaction_id.as_deref(),
                    payload.gateway_response.as_ref(),
                )
                .await?;
            }
            PaymentStatus::Failed => {
                if payment.status != PaymentStatus::Pending {
                    return Err(PaymentError::InvalidTransition {
                        from: payment.status,
                        to: reported,
                    });
                }
                PaymentRepository::set_status(
                    &mut tx,
                    payment.id,
                    PaymentStatus::Failed.as_str(),
                    payload.transaction_id.as_deref(),
                    payload.gateway_response.as_ref(),
                )
                .await?;
            }
            _ => unreachable!("terminal statuses are filtered above"),
        }

        tx.commit().await?;
        info!(payment = %payment.id, status = %reported, "webhook applied");
        Ok(WebhookOutcome::Applied)
    }

    /// Owner-or-admin read.
    pub async fn get(&self, ctx: &RequestContext, payment_id: Uuid) -> Result<Payment, PaymentError> {
        let payment = PaymentRepository::find(&self.pool, payment_id)
            .await?
            .ok_or(PaymentError::NotFound)?;
        let booking = BookingRepository::find(&self.pool, payment.booking_id)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;
        if !ctx.owns_or_admin(booking.user_id) {
            return Err(PaymentError::Forbidden);
        }
        payment.try_into().map_err(PaymentError::Storage)
    }

    /// The shared completed-transition: payment `pending -> completed`, and
    /// in the same transaction the booking becomes paid (confirming it only
    /// when it is still pending; completed bookings keep their status).
    async fn apply_completed(
        tx: &mut PgTx<'_>,
        payment: &Payment,
        booking: &Booking,
        transaction_id: Option<&str>,
        gateway_response: Option<&serde_json::Value>,
    ) -> Result<(), PaymentError> {
        if booking.status == BookingStatus::Cancelled {
            return Err(PaymentError::InvalidBookingState);
        }
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Completed,
            });
        }

        PaymentRepository::set_status(
            tx,
            payment.id,
            PaymentStatus::Completed.as_str(),
            transaction_id,
            gateway_response,
        )
        .await?;

        let next_status = status_after_paid(booking.status);
        BookingRepository::set_payment_state(
            tx,
            booking.id,
            next_status.as_str(),
            PaymentState::Paid.as_str(),
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn load_pair(
        tx: &mut PgTx<'_>,
        payment_id: Uuid,
    ) -> Result<(Payment, Booking), PaymentError> {
        let payment_row = PaymentRepository::find_for_update(tx, payment_id)
            .await?
            .ok_or(PaymentError::NotFound)?;
        let booking_row: BookingRow = BookingRepository::find_for_update(tx, payment_row.booking_id)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;
        let payment: Payment = payment_row.try_into()?;
        let booking: Booking = booking_row.try_into()?;
        Ok((payment, booking))
    }

    async fn reload(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        let stored = PaymentRepository::find(&self.pool, payment_id)
            .await?
            .ok_or(PaymentError::NotFound)?;
        stored.try_into().map_err(PaymentError::Storage)
    }
}

/// Booking status after its payment completes. Pending bookings are
/// confirmed; anything further along keeps its status (transitions stay
/// monotonic, a completed booking is never pulled back to confirmed).
fn status_after_paid(status: BookingStatus) -> BookingStatus {
    match status {
        BookingStatus::Pending => BookingStatus::Confirmed,
        other => other,
    }
}

/// Reason stamped on bookings that a refund cancels.
const REFUND_CANCELLATION_REASON: &str = "refunded";

/// Whether the refund itself cancels the booking, stamping a cancellation
/// record and releasing the reserved spots. Already-cancelled bookings keep
/// their original record and had their spots returned when they were
/// cancelled.
fn refund_cancels_booking(status: BookingStatus) -> bool {
    status != BookingStatus::Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_confirms_pending_but_never_regresses() {
        assert_eq!(status_after_paid(BookingStatus::Pending), BookingStatus::Confirmed);
        assert_eq!(status_after_paid(BookingStatus::Confirmed), BookingStatus::Confirmed);
        assert_eq!(status_after_paid(BookingStatus::Completed), BookingStatus::Completed);
    }

    #[test]
    fn webhook_statuses_parse_to_terminal_states() {
        assert_eq!("completed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Completed);
        assert_eq!("failed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Failed);
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!("settled".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn refund_cancels_active_bookings_but_not_twice() {
        assert!(refund_cancels_booking(BookingStatus::Pending));
        assert!(refund_cancels_booking(BookingStatus::Confirmed));
        assert!(refund_cancels_booking(BookingStatus::Completed));
        assert!(!refund_cancels_booking(BookingStatus::Cancelled));
    }

    #[test]
    fn method_maps_to_storage_strings() {
        assert_eq!(PaymentMethod::BankTransfer.as_str(), "bank_transfer");
        assert_eq!(PaymentMethod::Card.as_str(), "card");
        assert_eq!(PaymentMethod::Cash.as_str(), "cash");
    }
}
