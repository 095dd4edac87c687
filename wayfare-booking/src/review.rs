use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use wayfare_core::{FieldErrors, RequestContext};
use wayfare_store::booking_repo::BookingRepository;
use wayfare_store::review_repo::{ReviewRepository, ReviewRow};

use crate::booking::{Booking, BookingStatus};

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            booking_id: row.booking_id,
            tour_id: row.tour_id,
            user_id: row.user_id,
            rating: row.rating,
            comment: row.comment,
            is_approved: row.is_approved,
            approved_at: row.approved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReview {
    pub booking_id: Uuid,
    pub tour_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

impl SubmitReview {
    pub fn validate(&self) -> Result<(), FieldErrors> {
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

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("review not found")]
    NotFound,

    #[error("not allowed to act on this review")]
    Forbidden,

    #[error("booking does not match the caller or the tour")]
    InvalidBooking,

    #[error("only completed bookings can be reviewed")]
    BookingNotCompleted,

    #[error("a review already exists for this booking")]
    DuplicateReview,

    #[error("approved reviews can no longer be changed")]
    AlreadyApproved,

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Gatekeeps review creation and moderation: one review per completed
/// booking, mutable only until an admin approves it.
#[derive(Clone)]
pub struct ReviewGate {
    pool: PgPool,
}

impl ReviewGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn submit(&self, ctx: &RequestContext, input: SubmitReview) -> Result<Review, ReviewError> {
        let mut tx = self.pool.begin().await?;

        let booking: Booking = BookingRepository::find_for_update(&mut tx, input.booking_id)
            .await?
            .ok_or(ReviewError::InvalidBooking)?
            .try_into()?;
        if booking.user_id != ctx.user_id || booking.tour_id != input.tour_id {
            return Err(ReviewError::InvalidBooking);
        }
        if booking.status != BookingStatus::Completed {
            return Err(ReviewError::BookingNotCompleted);
        }
        if ReviewRepository::find_by_booking_tx(&mut tx, booking.id).await?.is_some() {
            return Err(ReviewError::DuplicateReview);
        }

        let row = ReviewRow {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            tour_id: booking.tour_id,
            user_id: ctx.user_id,
            rating: input.rating,
            comment: input.comment,
            is_approved: false,
            approved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        ReviewRepository::insert(&mut tx, &row).await.map_err(|e| {
            if is_unique_violation(&e) {
                ReviewError::DuplicateReview
            } else {
                ReviewError::Storage(e)
            }
        })?;
        tx.commit().await?;

        info!(review = %row.id, booking = %booking.reference, "review submitted");
        self.reload(row.id).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        review_id: Uuid,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, ReviewError> {
        let review = self.owned(ctx, review_id).await?;
        if review.is_approved {
            return Err(ReviewError::AlreadyApproved);
        }
        ReviewRepository::update_content(&self.pool, review.id, rating, comment).await?;
        self.reload(review.id).await
    }

    pub async fn delete(&self, ctx: &RequestContext, review_id: Uuid) -> Result<(), ReviewError> {
        let review = self.owned(ctx, review_id).await?;
        if review.is_approved {
            return Err(ReviewError::AlreadyApproved);
        }
        ReviewRepository::delete(&self.pool, review.id).await?;
        Ok(())
    }

    /// Admin-only, one-way. Approving an already-approved review is a no-op.
    pub async fn approve(&self, ctx: &RequestContext, review_id: Uuid) -> Result<Review, ReviewError> {
        if !ctx.is_admin() {
            return Err(ReviewError::Forbidden);
        }
        let review: Review = ReviewRepository::find(&self.pool, review_id)
            .await?
            .ok_or(ReviewError::NotFound)?
            .into();
        if !review.is_approved {
            ReviewRepository::approve(&self.pool, review.id).await?;
            info!(review = %review.id, "review approved");
        }
        self.reload(review.id).await
    }

    async fn owned(&self, ctx: &RequestContext, review_id: Uuid) -> Result<Review, ReviewError> {
        let review: Review = ReviewRepository::find(&self.pool, review_id)
            .await?
            .ok_or(ReviewError::NotFound)?
            .into();
        if review.user_id != ctx.user_id {
            return Err(ReviewError::Forbidden);
        }
        Ok(review)
    }

    async fn reload(&self, review_id: Uuid) -> Result<Review, ReviewError> {
        Ok(ReviewRepository::find(&self.pool, review_id)
            .await?
            .ok_or(ReviewError::NotFound)?
            .into())
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_one_to_five() {
        for rating in [0, 6, -1] {
            let input = SubmitReview {
                booking_id: Uuid::new_v4(),
                tour_id: Uuid::new_v4(),
                rating,
                comment: None,
            };
            assert!(input.validate().is_err(), "rating {rating} should be rejected");
        }
        let input = SubmitReview {
            booking_id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            rating: 5,
            comment: Some("great".into()),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn overlong_comments_are_rejected() {
        let input = SubmitReview {
            booking_id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            rating: 4,
            comment: Some("x".repeat(1001)),
        };
        assert!(input.validate().is_err());
    }
}
