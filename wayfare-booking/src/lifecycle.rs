use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use wayfare_catalog::schedule::SlotError;
use wayfare_catalog::tour::Tour;
use wayfare_core::RequestContext;
use wayfare_store::booking_repo::{BookingRepository, BookingRow};
use wayfare_store::schedule_repo::ScheduleRepository;
use wayfare_store::tour_repo::TourRepository;
use wayfare_store::PgTx;

use crate::booking::{new_reference, Booking, BookingError, BookingStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub tour_id: Uuid,
    pub tour_date: NaiveDate,
    pub participants: i32,
    pub special_requests: Option<String>,
}

/// Owns the transaction scope of every booking state change. The slot row is
/// locked before the availability check, so concurrent requests for the same
/// (tour, date) serialize and the last seat cannot be sold twice.
#[derive(Clone)]
pub struct BookingLifecycle {
    pool: PgPool,
    reference_prefix: String,
}

impl BookingLifecycle {
    pub fn new(pool: PgPool, reference_prefix: String) -> Self {
        Self { pool, reference_prefix }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateBooking,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let tour = TourRepository::find_for_booking(&mut tx, input.tour_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !tour.is_bookable() {
            return Err(BookingError::TourUnavailable);
        }
        if input.participants > tour.max_participants {
            return Err(BookingError::CapacityExceeded { max: tour.max_participants });
        }

        let slot = ScheduleRepository::find_for_update(&mut tx, tour.id, input.tour_date)
            .await?
            .ok_or(BookingError::NoAvailableSlot)?;
        let reserved = slot.reserve(input.participants).map_err(|e| match e {
            SlotError::SlotClosed => BookingError::NoAvailableSlot,
            SlotError::InsufficientSpots { available, .. } => {
                BookingError::InsufficientSpots { available }
            }
        })?;

        let row = BookingRow {
            id: Uuid::new_v4(),
            reference: new_reference(&self.reference_prefix),
            tour_id: tour.id,
            user_id: ctx.user_id,
            tour_date: input.tour_date,
            participants: input.participants,
            total_price_cents: tour.price_cents * input.participants as i64,
            status: BookingStatus::Pending.as_str().to_string(),
            payment_status: crate::booking::PaymentState::Pending.as_str().to_string(),
            special_requests: input.special_requests,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        BookingRepository::insert(&mut tx, &row).await?;
        ScheduleRepository::apply(&mut tx, &reserved).await?;

        tx.commit().await?;
        info!(booking = %row.reference, tour = %tour.id, "booking created");

        // Timestamps in `row` are client-side; re-read for the stored ones.
        let stored = BookingRepository::find(&self.pool, row.id)
            .await?
            .ok_or(BookingError::NotFound)?;
        stored.try_into().map_err(BookingError::Storage)
    }

    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        booking_id: Uuid,
        reason: &str,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let row = BookingRepository::find_for_update(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !ctx.owns_or_admin(row.user_id) {
            return Err(BookingError::Forbidden);
        }
        let booking: Booking = row.try_into().map_err(BookingError::Storage)?;
        Booking::check_cancel(booking.status)?;

        BookingRepository::mark_cancelled(&mut tx, booking.id, reason).await?;
        Self::release_slot(&mut tx, &booking).await?;

        tx.commit().await?;
        info!(booking = %booking.reference, "booking cancelled");

        let stored = BookingRepository::find(&self.pool, booking.id)
            .await?
            .ok_or(BookingError::NotFound)?;
        stored.try_into().map_err(BookingError::Storage)
    }

    pub async fn confirm(&self, ctx: &RequestContext, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(ctx, booking_id, BookingStatus::Confirmed).await
    }

    pub async fn complete(&self, ctx: &RequestContext, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(ctx, booking_id, BookingStatus::Completed).await
    }

    /// Guide-or-admin forward transition.
    async fn transition(
        &self,
        ctx: &RequestContext,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let row = BookingRepository::find_for_update(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        let tour = TourRepository::find_for_booking(&mut tx, row.tour_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !ctx.is_admin() && ctx.user_id != tour.guide_id {
            return Err(BookingError::Forbidden);
        }

        let booking: Booking = row.try_into().map_err(BookingError::Storage)?;
        Booking::check_transition(booking.status, to)?;
        BookingRepository::set_status(&mut tx, booking.id, to.as_str()).await?;

        tx.commit().await?;
        info!(booking = %booking.reference, from = %booking.status, to = %to, "booking transition");

        let stored = BookingRepository::find(&self.pool, booking.id)
            .await?
            .ok_or(BookingError::NotFound)?;
        stored.try_into().map_err(BookingError::Storage)
    }

    /// Owner-or-admin read; the tour's guide may also see bookings on their
    /// own tours.
    pub async fn get(&self, ctx: &RequestContext, booking_id: Uuid) -> Result<Booking, BookingError> {
        let row = BookingRepository::find(&self.pool, booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !ctx.owns_or_admin(row.user_id) {
            let tours = TourRepository::new(self.pool.clone());
            let is_guide = match tours.find(row.tour_id).await? {
                Some(tour) => tour.guide_id == ctx.user_id,
                None => false,
            };
            if !is_guide {
                return Err(BookingError::Forbidden);
            }
        }
        row.try_into().map_err(BookingError::Storage)
    }

    /// Gives the booking's reserved spots back to its slot, within the
    /// caller's transaction. Shared by cancel and refund.
    pub(crate) async fn release_slot(tx: &mut PgTx<'_>, booking: &Booking) -> Result<(), BookingError> {
        let tour: Option<Tour> = TourRepository::find_for_booking(tx, booking.tour_id).await?;
        let capacity = tour.map(|t| t.max_participants).unwrap_or(i32::MAX);
        if let Some(slot) =
            ScheduleRepository::find_for_update(tx, booking.tour_id, booking.tour_date).await?
        {
            let released = slot.release(booking.participants, capacity);
            ScheduleRepository::apply(tx, &released).await?;
        }
        Ok(())
    }
}
