use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::handlers::auth::require_user;
use crate::models::Booking;
use crate::services::bookings;
use crate::services::bookings::{BookingPatch, BookingSummary, CreateBookingRequest};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    service_id: String,
    service: String,
    price: Option<f64>,
    date: String,
    time: String,
    vehicle_type: String,
    vehicle_number: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        BookingResponse {
            id: b.id,
            service_id: b.service_id,
            service: b.service_name,
            price: b.price,
            date: b.slot_date.to_string(),
            time: b.slot_time,
            vehicle_type: b.vehicle_type,
            vehicle_number: b.vehicle_number,
            customer_name: b.customer_name,
            customer_email: b.customer_email,
            customer_phone: b.customer_phone,
            status: b.status.as_str().to_string(),
            notes: b.notes,
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            completed_at: b
                .completed_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingSummary>), AppError> {
    let user_id = require_user(&headers)?;
    let summary = bookings::create_booking(&state, &user_id, body).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

// GET /api/bookings
pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let user_id = require_user(&headers)?;
    let bookings = bookings::list_bookings(&state, &user_id).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// PATCH /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = require_user(&headers)?;
    let booking = bookings::update_booking(&state, &id, &user_id, patch)?;
    Ok(Json(booking.into()))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = require_user(&headers)?;
    let booking = bookings::cancel_booking(&state, &id, &user_id)?;
    Ok(Json(booking.into()))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    bookings::delete_booking(&state, &id, &user_id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
