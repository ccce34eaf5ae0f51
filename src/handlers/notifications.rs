use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth::require_user;
use crate::models::Notification;
use crate::services::notifications;
use crate::services::notifications::{CreateNotificationRequest, NotificationPage};
use crate::state::AppState;

// GET /api/notifications
#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub unread_only: Option<bool>,
}

pub async fn get_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationPage>, AppError> {
    let user_id = require_user(&headers)?;
    let page = notifications::list_notifications(
        &state,
        &user_id,
        query.limit,
        query.skip,
        query.unread_only.unwrap_or(false),
    )?;
    Ok(Json(page))
}

// POST /api/notifications
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let user_id = require_user(&headers)?;
    let notification = notifications::create_notification(&state, &user_id, body)?;
    Ok((StatusCode::CREATED, Json(notification)))
}

// POST /api/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    let user_id = require_user(&headers)?;
    let notification = notifications::mark_read(&state, &id, &user_id)?;
    Ok(Json(notification))
}

// POST /api/notifications/read-all
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    let modified = notifications::mark_all_read(&state, &user_id)?;
    Ok(Json(serde_json::json!({"modified_count": modified})))
}

// DELETE /api/notifications/:id
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    notifications::delete_notification(&state, &id, &user_id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// DELETE /api/notifications
pub async fn delete_all_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    let deleted = notifications::delete_all(&state, &user_id)?;
    Ok(Json(serde_json::json!({"deleted_count": deleted})))
}
