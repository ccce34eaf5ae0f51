use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingStatus, Notification, NotificationKind};
use crate::state::AppState;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub booking_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Shallow display projection of a referenced booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRef {
    pub service: String,
    pub date: String,
    pub time: String,
    pub status: BookingStatus,
}

#[derive(Debug, Serialize)]
pub struct NotificationItem {
    #[serde(flatten)]
    pub notification: Notification,
    pub booking: Option<BookingRef>,
}

#[derive(Debug, Serialize)]
pub struct NotificationPage {
    pub items: Vec<NotificationItem>,
    pub unread_count: i64,
    pub total_count: i64,
    pub has_more: bool,
}

pub fn list_notifications(
    state: &AppState,
    owner_id: &str,
    limit: Option<i64>,
    skip: Option<i64>,
    unread_only: bool,
) -> Result<NotificationPage, AppError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(0);
    let skip = skip.unwrap_or(0).max(0);

    let db = state.db.lock().unwrap();

    let notifications = queries::list_notifications(&db, owner_id, limit, skip, unread_only)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let total_count = queries::count_notifications(&db, owner_id, unread_only)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let unread_count = queries::count_notifications(&db, owner_id, true)
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let items = notifications
        .into_iter()
        .map(|notification| {
            // Resolve the referenced booking for display. A missing or
            // unreadable booking degrades to the bare id, never an error.
            let booking = notification.booking_id.as_deref().and_then(|id| {
                queries::get_booking_by_id(&db, id)
                    .ok()
                    .flatten()
                    .map(|b| BookingRef {
                        service: b.service_name,
                        date: b.slot_date.to_string(),
                        time: b.slot_time,
                        status: b.status,
                    })
            });
            NotificationItem {
                notification,
                booking,
            }
        })
        .collect();

    Ok(NotificationPage {
        items,
        unread_count,
        total_count,
        has_more: total_count > skip + limit,
    })
}

pub fn create_notification(
    state: &AppState,
    owner_id: &str,
    req: CreateNotificationRequest,
) -> Result<Notification, AppError> {
    let mut missing = vec![];
    if req.title.trim().is_empty() {
        missing.push("title".to_string());
    }
    if req.message.trim().is_empty() {
        missing.push("message".to_string());
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let notification = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: owner_id.to_string(),
        title: req.title.trim().to_string(),
        message: req.message.trim().to_string(),
        kind: req.kind,
        link: req.link,
        booking_id: req.booking_id,
        metadata: req.metadata,
        read: false,
        created_at: Utc::now().naive_utc(),
    };

    let db = state.db.lock().unwrap();
    queries::create_notification(&db, &notification)
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(notification)
}

/// Mark one notification read. Scoped by (id, owner): an id that exists but
/// belongs to someone else reports not-found, same as an unknown id.
pub fn mark_read(
    state: &AppState,
    notification_id: &str,
    owner_id: &str,
) -> Result<Notification, AppError> {
    let db = state.db.lock().unwrap();

    let updated = queries::mark_notification_read(&db, notification_id, owner_id)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "notification {notification_id}"
        )));
    }

    queries::get_notification(&db, notification_id, owner_id)
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("notification {notification_id}")))
}

pub fn mark_all_read(state: &AppState, owner_id: &str) -> Result<usize, AppError> {
    let db = state.db.lock().unwrap();
    queries::mark_all_notifications_read(&db, owner_id)
        .map_err(|e| AppError::Storage(e.to_string()))
}

pub fn delete_notification(
    state: &AppState,
    notification_id: &str,
    owner_id: &str,
) -> Result<(), AppError> {
    let db = state.db.lock().unwrap();

    let deleted = queries::delete_notification(&db, notification_id, owner_id)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    if !deleted {
        return Err(AppError::NotFound(format!(
            "notification {notification_id}"
        )));
    }
    Ok(())
}

pub fn delete_all(state: &AppState, owner_id: &str) -> Result<usize, AppError> {
    let db = state.db.lock().unwrap();
    queries::delete_all_notifications(&db, owner_id).map_err(|e| AppError::Storage(e.to_string()))
}
