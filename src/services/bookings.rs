use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::db::queries::BookingChanges;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Notification, NotificationKind};
use crate::services::slots;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub vehicle_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingSummary {
    pub id: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub status: BookingStatus,
}

/// Partial update. Identity, owner, and timestamps are not part of this
/// struct, so a client cannot patch them no matter what it sends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
}

impl BookingPatch {
    fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.status.is_none()
            && self.notes.is_none()
            && self.vehicle_type.is_none()
            && self.vehicle_number.is_none()
    }
}

pub async fn create_booking(
    state: &AppState,
    owner_id: &str,
    req: CreateBookingRequest,
) -> Result<BookingSummary, AppError> {
    let mut missing = vec![];
    for (name, value) in [
        ("service", &req.service),
        ("service_id", &req.service_id),
        ("date", &req.date),
        ("time", &req.time),
        ("vehicle_type", &req.vehicle_type),
        ("vehicle_number", &req.vehicle_number),
        ("customer_name", &req.customer_name),
        ("customer_email", &req.customer_email),
        ("customer_phone", &req.customer_phone),
    ] {
        if value.trim().is_empty() {
            missing.push(name.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let slot = slots::normalize(&req.date, &req.time)?;

    if slot.date < Utc::now().date_naive() {
        return Err(AppError::PastDate);
    }

    // Snapshot name and price from the catalog; they are never looked up
    // again for this booking.
    let service = state
        .catalog
        .lookup(req.service_id.trim())
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("service {}", req.service_id.trim())))?;

    let status = if state.config.auto_confirm {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Pending
    };

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: owner_id.to_string(),
        service_id: service.id.clone(),
        service_name: service.name.clone(),
        price: Some(service.price),
        slot_date: slot.date,
        slot_time: slot.time.clone(),
        vehicle_type: req.vehicle_type.trim().to_string(),
        vehicle_number: req.vehicle_number.trim().to_string(),
        customer_name: req.customer_name.trim().to_string(),
        customer_email: req.customer_email.trim().to_string(),
        customer_phone: req.customer_phone.trim().to_string(),
        status,
        notes: req.notes.filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
        completed_at: None,
    };

    {
        let db = state.db.lock().unwrap();
        slots::ensure_free(&db, &slot, None)?;
        queries::create_booking(&db, &booking).map_err(slots::storage_error)?;

        if state.config.notify_on_create {
            record_status_notification(&db, &booking);
        }
    }

    tracing::info!(booking_id = %booking.id, user_id = %owner_id, date = %slot.date, time = %slot.time, "booking created");

    Ok(BookingSummary {
        id: booking.id,
        service: booking.service_name,
        date: booking.slot_date.to_string(),
        time: booking.slot_time,
        status: booking.status,
    })
}

pub fn update_booking(
    state: &AppState,
    booking_id: &str,
    caller_id: &str,
    patch: BookingPatch,
) -> Result<Booking, AppError> {
    let db = state.db.lock().unwrap();

    let existing = queries::get_booking_by_id(&db, booking_id)
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if existing.user_id != caller_id {
        return Err(AppError::Forbidden);
    }

    if patch.is_empty() {
        return Err(AppError::NoFields);
    }

    let mut changes = BookingChanges::default();

    if patch.date.is_some() || patch.time.is_some() {
        let date = patch
            .date
            .clone()
            .unwrap_or_else(|| existing.slot_date.to_string());
        let time = patch.time.clone().unwrap_or_else(|| existing.slot_time.clone());
        let slot = slots::normalize(&date, &time)?;

        let effective_status = patch.status.unwrap_or(existing.status);
        if effective_status.occupies_slot() {
            slots::ensure_free(&db, &slot, Some(booking_id))?;
        }

        changes.slot_date = Some(slot.date);
        changes.slot_time = Some(slot.time);
    }

    let status_changed = match patch.status {
        Some(next) => {
            if !existing.status.can_transition_to(next) {
                return Err(AppError::InvalidTransition {
                    from: existing.status.as_str(),
                    to: next.as_str(),
                });
            }
            changes.status = Some(next);
            // completed_at is written exactly once, with the first transition
            // into completed.
            if next == BookingStatus::Completed && existing.completed_at.is_none() {
                changes.completed_at = Some(Utc::now().naive_utc());
            }
            next != existing.status
        }
        None => false,
    };

    changes.notes = patch.notes;
    changes.vehicle_type = patch.vehicle_type;
    changes.vehicle_number = patch.vehicle_number;

    let updated = queries::update_booking(&db, booking_id, caller_id, &changes)
        .map_err(slots::storage_error)?;
    if !updated {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }

    let booking = queries::get_booking_by_id(&db, booking_id)
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if status_changed {
        record_status_notification(&db, &booking);
        tracing::info!(booking_id = %booking.id, status = booking.status.as_str(), "booking status changed");
    }

    Ok(booking)
}

pub fn cancel_booking(
    state: &AppState,
    booking_id: &str,
    caller_id: &str,
) -> Result<Booking, AppError> {
    update_booking(
        state,
        booking_id,
        caller_id,
        BookingPatch {
            status: Some(BookingStatus::Cancelled),
            ..BookingPatch::default()
        },
    )
}

pub async fn list_bookings(state: &AppState, owner_id: &str) -> Result<Vec<Booking>, AppError> {
    let mut bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_user(&db, owner_id)
            .map_err(|e| AppError::Storage(e.to_string()))?
    };

    // Legacy rows created before price snapshotting get their price resolved
    // from the current catalog at read time. No write-back.
    for booking in bookings.iter_mut().filter(|b| b.price.is_none()) {
        match state.catalog.lookup(&booking.service_id).await {
            Ok(Some(service)) => booking.price = Some(service.price),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, booking_id = %booking.id, "price backfill lookup failed");
            }
        }
    }

    Ok(bookings)
}

pub fn delete_booking(state: &AppState, booking_id: &str, caller_id: &str) -> Result<(), AppError> {
    let db = state.db.lock().unwrap();

    let existing = queries::get_booking_by_id(&db, booking_id)
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if existing.user_id != caller_id {
        return Err(AppError::Forbidden);
    }

    queries::delete_booking(&db, booking_id, caller_id)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(())
}

/// Write the in-app notification for the booking's current status. Failures
/// are logged and never bubble into the booking response.
fn record_status_notification(conn: &Connection, booking: &Booking) {
    let when = format!("{} at {}", booking.slot_date, booking.slot_time);
    let (title, message, kind) = match booking.status {
        BookingStatus::Pending => (
            "Booking received",
            format!(
                "Your {} on {} is awaiting confirmation.",
                booking.service_name, when
            ),
            NotificationKind::Info,
        ),
        BookingStatus::Confirmed => (
            "Booking confirmed",
            format!("Your {} on {} has been confirmed.", booking.service_name, when),
            NotificationKind::Success,
        ),
        BookingStatus::Completed => (
            "Booking completed",
            format!(
                "Your {} on {} is complete. Thank you!",
                booking.service_name, when
            ),
            NotificationKind::Success,
        ),
        BookingStatus::Cancelled => (
            "Booking cancelled",
            format!("Your {} on {} has been cancelled.", booking.service_name, when),
            NotificationKind::Warning,
        ),
    };

    let notification = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: booking.user_id.clone(),
        title: title.to_string(),
        message,
        kind,
        link: Some("/bookings".to_string()),
        booking_id: Some(booking.id.clone()),
        metadata: None,
        read: false,
        created_at: Utc::now().naive_utc(),
    };

    if let Err(e) = queries::create_notification(conn, &notification) {
        tracing::error!(error = %e, booking_id = %booking.id, "failed to record booking notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db;
    use crate::services::catalog::StaticCatalog;
    use std::sync::{Arc, Mutex};

    fn test_state(auto_confirm: bool, notify_on_create: bool) -> AppState {
        AppState {
            db: Arc::new(Mutex::new(db::init_db(":memory:").unwrap())),
            config: AppConfig {
                port: 3000,
                database_url: ":memory:".to_string(),
                catalog_url: String::new(),
                auto_confirm,
                notify_on_create,
            },
            catalog: Box::new(StaticCatalog::with_defaults()),
        }
    }

    fn request(date: &str, time: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            service: "Basic Wash".to_string(),
            service_id: "basic-wash".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            vehicle_type: "Sedan".to_string(),
            vehicle_number: "ABC-123".to_string(),
            customer_name: "Alice".to_string(),
            customer_email: "alice@example.com".to_string(),
            customer_phone: "+15551110000".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_pending() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();
        assert_eq!(summary.status, BookingStatus::Pending);
        assert_eq!(summary.service, "Basic Wash");

        let db = state.db.lock().unwrap();
        let booking = queries::get_booking_by_id(&db, &summary.id).unwrap().unwrap();
        assert_eq!(booking.price, Some(15.0));
        assert_eq!(booking.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_create_auto_confirm_policy() {
        let state = test_state(true, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();
        assert_eq!(summary.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_create_lists_missing_fields() {
        let state = test_state(false, false);
        let mut req = request("2030-03-10", "10:00 AM");
        req.customer_email = String::new();
        req.vehicle_number = "  ".to_string();

        let err = create_booking(&state, "user-1", req).await.unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields, vec!["vehicle_number", "customer_email"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_past_date() {
        let state = test_state(false, false);
        let err = create_booking(&state, "user-1", request("2020-01-01", "10:00 AM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PastDate));
    }

    #[tokio::test]
    async fn test_create_unknown_service() {
        let state = test_state(false, false);
        let mut req = request("2030-03-10", "10:00 AM");
        req.service_id = "no-such-service".to_string();

        let err = create_booking(&state, "user-1", req).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_conflict_on_taken_slot() {
        let state = test_state(false, false);
        create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let err = create_booking(&state, "user-2", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));
    }

    #[tokio::test]
    async fn test_cancel_frees_slot_for_rebooking() {
        let state = test_state(false, false);
        let first = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let err = create_booking(&state, "user-2", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));

        cancel_booking(&state, &first.id, "user-1").unwrap();

        let third = create_booking(&state, "user-2", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();
        assert_eq!(third.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let patch = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            ..BookingPatch::default()
        };
        let err = update_booking(&state, &summary.id, "user-2", patch).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        // Untouched by the rejected update
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking_by_id(&db, &summary.id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_unknown_booking() {
        let state = test_state(false, false);
        let patch = BookingPatch {
            notes: Some("hi".to_string()),
            ..BookingPatch::default()
        };
        let err = update_booking(&state, "no-such-id", "user-1", patch).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_empty_patch() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let err =
            update_booking(&state, &summary.id, "user-1", BookingPatch::default()).unwrap_err();
        assert!(matches!(err, AppError::NoFields));
    }

    #[tokio::test]
    async fn test_status_change_emits_notification() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let patch = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            ..BookingPatch::default()
        };
        update_booking(&state, &summary.id, "user-1", patch).unwrap();

        let db = state.db.lock().unwrap();
        let notifications = queries::list_notifications(&db, "user-1", 50, 0, false).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Booking confirmed");
        assert_eq!(notifications[0].booking_id.as_deref(), Some(summary.id.as_str()));
        assert!(!notifications[0].read);
    }

    #[tokio::test]
    async fn test_invalid_transition_rejected() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();
        cancel_booking(&state, &summary.id, "user-1").unwrap();

        let patch = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            ..BookingPatch::default()
        };
        let err = update_booking(&state, &summary.id, "user-1", patch).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_completed_at_stamped_once() {
        let state = test_state(true, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let patch = BookingPatch {
            status: Some(BookingStatus::Completed),
            ..BookingPatch::default()
        };
        let first = update_booking(&state, &summary.id, "user-1", patch.clone()).unwrap();
        let stamped = first.completed_at.expect("completed_at set");

        // Re-sending completed is a legal no-op and must not restamp.
        let second = update_booking(&state, &summary.id, "user-1", patch).unwrap();
        assert_eq!(second.completed_at, Some(stamped));
    }

    #[tokio::test]
    async fn test_reschedule_conflict() {
        let state = test_state(false, false);
        create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();
        let second = create_booking(&state, "user-2", request("2030-03-10", "11:00 AM"))
            .await
            .unwrap();

        let patch = BookingPatch {
            time: Some("10:00 AM".to_string()),
            ..BookingPatch::default()
        };
        let err = update_booking(&state, &second.id, "user-2", patch).unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));
    }

    #[tokio::test]
    async fn test_reschedule_same_slot_allowed() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let patch = BookingPatch {
            time: Some("10:00 am".to_string()),
            notes: Some("gate code 4321".to_string()),
            ..BookingPatch::default()
        };
        let booking = update_booking(&state, &summary.id, "user-1", patch).unwrap();
        assert_eq!(booking.slot_time, "10:00 AM");
        assert_eq!(booking.notes.as_deref(), Some("gate code 4321"));
    }

    #[tokio::test]
    async fn test_list_orders_and_backfills() {
        let state = test_state(false, false);
        create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();
        create_booking(&state, "user-1", request("2030-03-12", "09:00 AM"))
            .await
            .unwrap();

        // Legacy row without a price snapshot
        {
            let db = state.db.lock().unwrap();
            let now = Utc::now().naive_utc();
            let legacy = Booking {
                id: "legacy-1".to_string(),
                user_id: "user-1".to_string(),
                service_id: "deluxe-wash".to_string(),
                service_name: "Deluxe Wash".to_string(),
                price: None,
                slot_date: chrono::NaiveDate::parse_from_str("2030-03-01", "%Y-%m-%d").unwrap(),
                slot_time: "08:00 AM".to_string(),
                vehicle_type: "SUV".to_string(),
                vehicle_number: "XYZ-789".to_string(),
                customer_name: "Alice".to_string(),
                customer_email: "alice@example.com".to_string(),
                customer_phone: "+15551110000".to_string(),
                status: BookingStatus::Completed,
                notes: None,
                created_at: now,
                updated_at: now,
                completed_at: Some(now),
            };
            queries::create_booking(&db, &legacy).unwrap();
        }

        let bookings = list_bookings(&state, "user-1").await.unwrap();
        assert_eq!(bookings.len(), 3);
        assert_eq!(bookings[0].slot_date.to_string(), "2030-03-12");
        assert_eq!(bookings[2].id, "legacy-1");
        assert_eq!(bookings[2].price, Some(25.0));
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let state = test_state(false, false);
        let summary = create_booking(&state, "user-1", request("2030-03-10", "10:00 AM"))
            .await
            .unwrap();

        let err = delete_booking(&state, &summary.id, "user-2").unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        delete_booking(&state, &summary.id, "user-1").unwrap();
        let err = delete_booking(&state, &summary.id, "user-1").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
