pub mod category;
pub mod favorite;
pub mod guide;
pub mod schedule;
pub mod tour;

pub use schedule::{ScheduleSlot, SlotError, SlotStatus};
pub use tour::{Tour, TourStatus};
