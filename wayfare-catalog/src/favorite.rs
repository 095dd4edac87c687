use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A user's saved tour. The (user, tour) pair is unique.
#[derive(Debug, Clone, Serialize)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tour_id: Uuid,
    pub created_at: DateTime<Utc>,
}
