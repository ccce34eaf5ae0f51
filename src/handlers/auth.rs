use axum::http::HeaderMap;

use crate::errors::AppError;

/// Header carrying the authenticated principal. The upstream gateway
/// verifies credentials and forwards the user id here; the core trusts it
/// and never re-implements login.
pub const USER_HEADER: &str = "x-user-id";

pub fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or(AppError::Unauthorized)
}
