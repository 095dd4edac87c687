pub mod app_config;
pub mod booking_repo;
pub mod category_repo;
pub mod database;
pub mod favorite_repo;
pub mod guide_repo;
pub mod payment_repo;
pub mod review_repo;
pub mod schedule_repo;
pub mod tour_repo;

pub use database::DbClient;

/// Postgres transaction alias used by every multi-row writer.
pub type PgTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
