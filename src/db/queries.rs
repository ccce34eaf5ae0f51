use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, Notification, NotificationKind};

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, service_id, service_name, price, slot_date, slot_time,
                               vehicle_type, vehicle_number, customer_name, customer_email, customer_phone,
                               status, notes, created_at, updated_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            booking.id,
            booking.user_id,
            booking.service_id,
            booking.service_name,
            booking.price,
            booking.slot_date.format(DATE_FMT).to_string(),
            booking.slot_time,
            booking.vehicle_type,
            booking.vehicle_number,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(TS_FMT).to_string(),
            booking.updated_at.format(TS_FMT).to_string(),
            booking.completed_at.map(|t| t.format(TS_FMT).to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLS} FROM bookings WHERE user_id = ?1
         ORDER BY slot_date DESC, slot_time DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Does any pending/confirmed booking already hold this slot? `exclude_id`
/// lets a reschedule skip the booking being moved.
pub fn slot_taken(
    conn: &Connection,
    slot_date: &NaiveDate,
    slot_time: &str,
    exclude_id: Option<&str>,
) -> anyhow::Result<bool> {
    let date_str = slot_date.format(DATE_FMT).to_string();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE slot_date = ?1 AND slot_time = ?2
           AND status IN ('pending', 'confirmed')
           AND (?3 IS NULL OR id != ?3)",
        params![date_str, slot_time, exclude_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Column changes for a booking update. `updated_at` is always stamped;
/// everything else is applied only when present.
#[derive(Debug, Default)]
pub struct BookingChanges {
    pub slot_date: Option<NaiveDate>,
    pub slot_time: Option<String>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.slot_date.is_none()
            && self.slot_time.is_none()
            && self.status.is_none()
            && self.notes.is_none()
            && self.vehicle_type.is_none()
            && self.vehicle_number.is_none()
    }
}

pub fn update_booking(
    conn: &Connection,
    id: &str,
    user_id: &str,
    changes: &BookingChanges,
) -> anyhow::Result<bool> {
    let mut sets: Vec<&str> = vec!["updated_at = ?"];
    let now = Utc::now().naive_utc().format(TS_FMT).to_string();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

    if let Some(date) = &changes.slot_date {
        sets.push("slot_date = ?");
        values.push(Box::new(date.format(DATE_FMT).to_string()));
    }
    if let Some(time) = &changes.slot_time {
        sets.push("slot_time = ?");
        values.push(Box::new(time.clone()));
    }
    if let Some(status) = &changes.status {
        sets.push("status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(notes) = &changes.notes {
        sets.push("notes = ?");
        values.push(Box::new(notes.clone()));
    }
    if let Some(vt) = &changes.vehicle_type {
        sets.push("vehicle_type = ?");
        values.push(Box::new(vt.clone()));
    }
    if let Some(vn) = &changes.vehicle_number {
        sets.push("vehicle_number = ?");
        values.push(Box::new(vn.clone()));
    }
    if let Some(completed) = &changes.completed_at {
        sets.push("completed_at = ?");
        values.push(Box::new(completed.format(TS_FMT).to_string()));
    }

    let sql = format!(
        "UPDATE bookings SET {} WHERE id = ? AND user_id = ?",
        sets.join(", ")
    );
    values.push(Box::new(id.to_string()));
    values.push(Box::new(user_id.to_string()));

    let value_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let count = conn.execute(&sql, value_refs.as_slice())?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str, user_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM bookings WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

const BOOKING_COLS: &str = "id, user_id, service_id, service_name, price, slot_date, slot_time, \
                            vehicle_type, vehicle_number, customer_name, customer_email, customer_phone, \
                            status, notes, created_at, updated_at, completed_at";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let slot_date_str: String = row.get(5)?;
    let status_str: String = row.get(12)?;
    let created_at_str: String = row.get(14)?;
    let updated_at_str: String = row.get(15)?;
    let completed_at_str: Option<String> = row.get(16)?;

    let slot_date = NaiveDate::parse_from_str(&slot_date_str, DATE_FMT)
        .unwrap_or_else(|_| Utc::now().date_naive());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TS_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TS_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let completed_at =
        completed_at_str.and_then(|s| NaiveDateTime::parse_from_str(&s, TS_FMT).ok());

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        service_name: row.get(3)?,
        price: row.get(4)?,
        slot_date,
        slot_time: row.get(6)?,
        vehicle_type: row.get(7)?,
        vehicle_number: row.get(8)?,
        customer_name: row.get(9)?,
        customer_email: row.get(10)?,
        customer_phone: row.get(11)?,
        status: BookingStatus::parse(&status_str),
        notes: row.get(13)?,
        created_at,
        updated_at,
        completed_at,
    })
}

// ── Notifications ──

pub fn create_notification(conn: &Connection, notification: &Notification) -> anyhow::Result<()> {
    let metadata_json = notification
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO notifications (id, user_id, title, message, kind, link, booking_id, metadata, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            notification.id,
            notification.user_id,
            notification.title,
            notification.message,
            notification.kind.as_str(),
            notification.link,
            notification.booking_id,
            metadata_json,
            notification.read as i32,
            notification.created_at.format(TS_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_notification(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> anyhow::Result<Option<Notification>> {
    let result = conn.query_row(
        &format!("SELECT {NOTIFICATION_COLS} FROM notifications WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        |row| Ok(parse_notification_row(row)),
    );

    match result {
        Ok(notification) => Ok(Some(notification?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    skip: i64,
    unread_only: bool,
) -> anyhow::Result<Vec<Notification>> {
    let filter = if unread_only { "AND is_read = 0" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLS} FROM notifications
         WHERE user_id = ?1 {filter}
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2 OFFSET ?3"
    ))?;

    let rows = stmt.query_map(params![user_id, limit, skip], |row| {
        Ok(parse_notification_row(row))
    })?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row??);
    }
    Ok(notifications)
}

pub fn count_notifications(
    conn: &Connection,
    user_id: &str,
    unread_only: bool,
) -> anyhow::Result<i64> {
    let filter = if unread_only { "AND is_read = 0" } else { "" };
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM notifications WHERE user_id = ?1 {filter}"),
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn mark_notification_read(conn: &Connection, id: &str, user_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

pub fn mark_all_notifications_read(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )?;
    Ok(count)
}

pub fn delete_notification(conn: &Connection, id: &str, user_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

pub fn delete_all_notifications(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM notifications WHERE user_id = ?1",
        params![user_id],
    )?;
    Ok(count)
}

const NOTIFICATION_COLS: &str =
    "id, user_id, title, message, kind, link, booking_id, metadata, is_read, created_at";

fn parse_notification_row(row: &rusqlite::Row) -> anyhow::Result<Notification> {
    let kind_str: String = row.get(4)?;
    let metadata_json: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(9)?;

    let metadata = metadata_json.and_then(|s| serde_json::from_str(&s).ok());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TS_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: NotificationKind::parse(&kind_str),
        link: row.get(5)?,
        booking_id: row.get(6)?,
        metadata,
        read: row.get::<_, i32>(8)? != 0,
        created_at,
    })
}
