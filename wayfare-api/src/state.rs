use wayfare_booking::{BookingLifecycle, PaymentLedger, ReviewGate};
use wayfare_store::DbClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub auth: AuthConfig,
    pub bookings: BookingLifecycle,
    pub payments: PaymentLedger,
    pub reviews: ReviewGate,
}

impl AppState {
    pub fn new(db: DbClient, jwt_secret: String, reference_prefix: String) -> Self {
        let pool = db.pool.clone();
        Self {
            db,
            auth: AuthConfig { secret: jwt_secret },
            bookings: BookingLifecycle::new(pool.clone(), reference_prefix),
            payments: PaymentLedger::new(pool.clone()),
            reviews: ReviewGate::new(pool),
        }
    }
}
