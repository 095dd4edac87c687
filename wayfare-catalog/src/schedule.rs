use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Full,
    Cancelled,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Full => "full",
            SlotStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SlotStatus::Available),
            "full" => Ok(SlotStatus::Full),
            "cancelled" => Ok(SlotStatus::Cancelled),
            other => Err(format!("unknown slot status: {other}")),
        }
    }
}

/// A bookable date instance of a tour with finite capacity.
///
/// Invariants: `0 <= available_spots <= capacity`, and `status == Full` exactly
/// when `available_spots == 0` (unless the slot was cancelled outright).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub available_spots: i32,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
}

impl ScheduleSlot {
    /// Claims `count` spots. Returns the updated slot without touching `self`;
    /// the caller persists it in the same transaction as the booking row.
    pub fn reserve(&self, count: i32) -> Result<ScheduleSlot, SlotError> {
        if self.status != SlotStatus::Available {
            return Err(SlotError::SlotClosed);
        }
        if self.available_spots < count {
            return Err(SlotError::InsufficientSpots {
                requested: count,
                available: self.available_spots,
            });
        }

        let mut updated = self.clone();
        updated.available_spots -= count;
        if updated.available_spots == 0 {
            updated.status = SlotStatus::Full;
        }
        Ok(updated)
    }

    /// Gives `count` spots back, clamped to `capacity`. A full slot with
    /// spots again becomes available; cancelled slots stay cancelled.
    pub fn release(&self, count: i32, capacity: i32) -> ScheduleSlot {
        let mut updated = self.clone();
        updated.available_spots = (updated.available_spots + count).min(capacity);
        if updated.status == SlotStatus::Full && updated.available_spots > 0 {
            updated.status = SlotStatus::Available;
        }
        updated
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("schedule slot is not open for booking")]
    SlotClosed,

    #[error("only {available} spots available, {requested} requested")]
    InsufficientSpots { requested: i32, available: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(spots: i32, status: SlotStatus) -> ScheduleSlot {
        ScheduleSlot {
            id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            start_time: None,
            end_time: None,
            available_spots: spots,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reserve_decrements_by_exactly_the_participant_count() {
        let updated = slot(5, SlotStatus::Available).reserve(3).unwrap();
        assert_eq!(updated.available_spots, 2);
        assert_eq!(updated.status, SlotStatus::Available);
    }

    #[test]
    fn reserving_the_last_spots_flips_to_full() {
        let updated = slot(2, SlotStatus::Available).reserve(2).unwrap();
        assert_eq!(updated.available_spots, 0);
        assert_eq!(updated.status, SlotStatus::Full);
    }

    #[test]
    fn reserve_rejects_more_than_available_and_leaves_slot_unchanged() {
        let original = slot(2, SlotStatus::Available);
        let err = original.reserve(3).unwrap_err();
        assert_eq!(err, SlotError::InsufficientSpots { requested: 3, available: 2 });
        assert_eq!(original.available_spots, 2);
        assert_eq!(original.status, SlotStatus::Available);
    }

    #[test]
    fn reserve_rejects_full_and_cancelled_slots() {
        assert_eq!(slot(0, SlotStatus::Full).reserve(1).unwrap_err(), SlotError::SlotClosed);
        assert_eq!(slot(5, SlotStatus::Cancelled).reserve(1).unwrap_err(), SlotError::SlotClosed);
    }

    #[test]
    fn release_restores_spots_and_reopens_a_full_slot() {
        let full = slot(2, SlotStatus::Available).reserve(2).unwrap();
        let restored = full.release(2, 10);
        assert_eq!(restored.available_spots, 2);
        assert_eq!(restored.status, SlotStatus::Available);
    }

    #[test]
    fn release_never_exceeds_capacity() {
        let updated = slot(9, SlotStatus::Available).release(5, 10);
        assert_eq!(updated.available_spots, 10);
    }

    #[test]
    fn release_keeps_cancelled_slots_cancelled() {
        let updated = slot(0, SlotStatus::Cancelled).release(2, 10);
        assert_eq!(updated.status, SlotStatus::Cancelled);
        assert_eq!(updated.available_spots, 2);
    }
}
