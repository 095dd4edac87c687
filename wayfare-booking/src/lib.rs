pub mod booking;
pub mod lifecycle;
pub mod payment;
pub mod review;

pub use booking::{Booking, BookingError, BookingStatus, PaymentState};
pub use lifecycle::{BookingLifecycle, CreateBooking};
pub use payment::{Payment, PaymentError, PaymentLedger, PaymentMethod, PaymentStatus};
pub use review::{Review, ReviewError, ReviewGate};
