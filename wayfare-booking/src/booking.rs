use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_store::booking_repo::BookingRow;

/// Booking lifecycle: `pending -> confirmed -> completed` forward only,
/// `pending|confirmed -> cancelled`. Completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The booking's view of its payment, driven by the Payment Ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
    Paid,
    Refunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Paid => "paid",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for PaymentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentState::Pending),
            "paid" => Ok(PaymentState::Paid),
            "refunded" => Ok(PaymentState::Refunded),
            other => Err(format!("unknown payment state: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub tour_date: NaiveDate,
    pub participants: i32,
    pub total_price_cents: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentState,
    pub special_requests: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = sqlx::Error;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row
            .status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let payment_status: PaymentState = row
            .payment_status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        Ok(Booking {
            id: row.id,
            reference: row.reference,
            tour_id: row.tour_id,
            user_id: row.user_id,
            tour_date: row.tour_date,
            participants: row.participants,
            total_price_cents: row.total_price_cents,
            status,
            payment_status,
            special_requests: row.special_requests,
            cancellation_reason: row.cancellation_reason,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Booking {
    /// Legality of a forward transition. Cancellation goes through
    /// [`check_cancel`] instead, which reports the terminal state it hit.
    pub fn check_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
        let legal = matches!(
            (from, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        );
        if legal {
            Ok(())
        } else {
            Err(BookingError::InvalidTransition { from, to })
        }
    }

    pub fn check_cancel(from: BookingStatus) -> Result<(), BookingError> {
        match from {
            BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
            BookingStatus::Cancelled => Err(BookingError::AlreadyCancelled),
            BookingStatus::Completed => Err(BookingError::AlreadyCompleted),
        }
    }
}

/// Externally visible booking reference: literal prefix plus an opaque
/// UUID-derived suffix. Uniqueness is backed by the store's unique column.
pub fn new_reference(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple().to_string().to_uppercase())
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking not found")]
    NotFound,

    #[error("not allowed to act on this booking")]
    Forbidden,

    #[error("this tour is not available for booking")]
    TourUnavailable,

    #[error("maximum {max} participants allowed")]
    CapacityExceeded { max: i32 },

    #[error("no available schedule for this date")]
    NoAvailableSlot,

    #[error("only {available} spots available")]
    InsufficientSpots { available: i32 },

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    #[error("cannot cancel a completed booking")]
    AlreadyCompleted,

    #[error("invalid booking transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_pending_confirmed_completed_only() {
        use BookingStatus::*;
        assert!(Booking::check_transition(Pending, Confirmed).is_ok());
        assert!(Booking::check_transition(Confirmed, Completed).is_ok());

        for (from, to) in [
            (Pending, Completed),
            (Confirmed, Confirmed),
            (Completed, Confirmed),
            (Cancelled, Confirmed),
            (Completed, Completed),
        ] {
            assert!(
                matches!(
                    Booking::check_transition(from, to),
                    Err(BookingError::InvalidTransition { .. })
                ),
                "{from} -> {to} should be rejected"
            );
        }
    }

    #[test]
    fn cancel_is_rejected_from_terminal_states() {
        assert!(Booking::check_cancel(BookingStatus::Pending).is_ok());
        assert!(Booking::check_cancel(BookingStatus::Confirmed).is_ok());
        assert!(matches!(
            Booking::check_cancel(BookingStatus::Cancelled),
            Err(BookingError::AlreadyCancelled)
        ));
        assert!(matches!(
            Booking::check_cancel(BookingStatus::Completed),
            Err(BookingError::AlreadyCompleted)
        ));
    }

    #[test]
    fn references_carry_the_prefix_and_do_not_collide() {
        let a = new_reference("BK");
        let b = new_reference("BK");
        assert!(a.starts_with("BK-"));
        assert_eq!(a.len(), 3 + 32);
        assert_ne!(a, b);
        assert!(a[3..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
