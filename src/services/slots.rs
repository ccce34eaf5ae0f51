use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;

/// A bookable appointment window: a calendar date plus a time label such as
/// `"08:00 AM"`. Only pending/confirmed bookings occupy a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: String,
}

/// Canonicalize caller-supplied date and time strings into a slot key.
/// The time label is whitespace-collapsed and uppercased so `" 8:00 am"`
/// and `"8:00 AM"` land on the same key.
pub fn normalize(date: &str, time: &str) -> Result<Slot, AppError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(vec!["date".to_string()]))?;

    let time = time
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    if time.is_empty() {
        return Err(AppError::Validation(vec!["time".to_string()]));
    }

    Ok(Slot { date, time })
}

/// Synchronous occupancy check against the booking store. This gives the
/// friendly answer on the common path; the partial unique index on
/// (slot_date, slot_time) decides races between concurrent inserts.
pub fn ensure_free(
    conn: &Connection,
    slot: &Slot,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let taken = queries::slot_taken(conn, &slot.date, &slot.time, exclude_id)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    if taken {
        return Err(AppError::SlotConflict);
    }
    Ok(())
}

/// Translate a storage failure from a booking write into the typed error,
/// recognizing the slot uniqueness constraint as a conflict.
pub fn storage_error(e: anyhow::Error) -> AppError {
    if let Some(sql_err) = e.downcast_ref::<rusqlite::Error>() {
        if is_unique_violation(sql_err) {
            return AppError::SlotConflict;
        }
    }
    AppError::Storage(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
