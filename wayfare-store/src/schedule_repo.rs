use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use wayfare_catalog::schedule::{ScheduleSlot, SlotStatus};

use crate::PgTx;

#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    tour_id: Uuid,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    available_spots: i32,
    status: String,
    created_at: DateTime<Utc>,
}

fn decode(row: SlotRow) -> Result<ScheduleSlot, sqlx::Error> {
    let status: SlotStatus = row
        .status
        .parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
    Ok(ScheduleSlot {
        id: row.id,
        tour_id: row.tour_id,
        date: row.date,
        start_time: row.start_time,
        end_time: row.end_time,
        available_spots: row.available_spots,
        status,
        created_at: row.created_at,
    })
}

const SLOT_COLUMNS: &str =
    "id, tour_id, date, start_time, end_time, available_spots, status, created_at";

pub struct ScheduleRepository;

impl ScheduleRepository {
    /// Locks the slot row for the remainder of the transaction. Concurrent
    /// reservations for the same (tour, date) serialize here.
    pub async fn find_for_update(
        tx: &mut PgTx<'_>,
        tour_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduleSlot>, sqlx::Error> {
        let row: Option<SlotRow> = sqlx::query_as(&format!(
            "SELECT {SLOT_COLUMNS} FROM tour_schedules \
             WHERE tour_id = $1 AND date = $2 FOR UPDATE"
        ))
        .bind(tour_id)
        .bind(date)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(decode).transpose()
    }

    /// Persists the outcome of a reserve/release computed on the locked row.
    pub async fn apply(tx: &mut PgTx<'_>, slot: &ScheduleSlot) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tour_schedules SET available_spots = $2, status = $3 WHERE id = $1")
            .bind(slot.id)
            .bind(slot.available_spots)
            .bind(slot.status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn insert(pool: &PgPool, slot: &ScheduleSlot) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tour_schedules (id, tour_id, date, start_time, end_time, available_spots, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(slot.id)
        .bind(slot.tour_id)
        .bind(slot.date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.available_spots)
        .bind(slot.status.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Upcoming bookable dates shown on the tour detail page.
    pub async fn upcoming_available(
        pool: &PgPool,
        tour_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<ScheduleSlot>, sqlx::Error> {
        let rows: Vec<SlotRow> = sqlx::query_as(&format!(
            "SELECT {SLOT_COLUMNS} FROM tour_schedules \
             WHERE tour_id = $1 AND date >= $2 AND status = 'available' \
             ORDER BY date ASC"
        ))
        .bind(tour_id)
        .bind(from)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(decode).collect()
    }
}
