use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::CommandError;
use crate::models::appointment::slot_end;

/// Whether an active appointment of `doctor_id` intersects `[start, end)`.
/// Cancelled and completed appointments never block; `exclude` skips the
/// appointment being moved.
pub fn has_conflict(
    conn: &Connection,
    doctor_id: i64,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    exclude: Option<i64>,
) -> anyhow::Result<bool> {
    queries::has_overlapping_appointment(conn, doctor_id, start, end, exclude)
}

/// Admission check for a fixed-length slot starting at `start`. Returns the
/// slot's end when the doctor is free.
pub fn validate_slot(
    conn: &Connection,
    doctor_id: i64,
    doctor_name: &str,
    start: &NaiveDateTime,
    exclude: Option<i64>,
) -> Result<NaiveDateTime, CommandError> {
    let end = slot_end(*start);
    if has_conflict(conn, doctor_id, start, &end, exclude)? {
        tracing::info!(doctor_id, start = %start, "slot rejected, doctor busy");
        return Err(CommandError::NotAvailable(doctor_name.to_string()));
    }
    Ok(end)
}
