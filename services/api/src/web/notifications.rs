//! services/api/src/web/notifications.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{
    ErrorBody, NotificationQuery, NotificationResponse, PreferencesRequest, PreferencesResponse,
    ReadAllResponse,
};
use crate::web::error::HttpError;
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    params(NotificationQuery),
    responses((status = 200, description = "Notifications, newest first", body = [NotificationResponse]))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationResponse>>, HttpError> {
    let notifications = state
        .db
        .list_notifications(user_id, query.unread_only)
        .await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "No such notification", body = ErrorBody)
    )
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.db.mark_notification_read(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "notifications",
    responses((status = 200, description = "How many notifications changed", body = ReadAllResponse))
)]
pub async fn mark_all_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ReadAllResponse>, HttpError> {
    let updated = state.db.mark_all_notifications_read(user_id).await?;
    Ok(Json(ReadAllResponse { updated }))
}

/// Switches notification emails (and digests) on or off.
#[utoipa::path(
    put,
    path = "/notifications/preferences",
    tag = "notifications",
    request_body = PreferencesRequest,
    responses(
        (status = 200, description = "The stored preference", body = PreferencesResponse),
        (status = 400, description = "Missing emailNotifications", body = ErrorBody)
    )
)]
pub async fn preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<PreferencesRequest>,
) -> Result<Json<PreferencesResponse>, HttpError> {
    let enabled = req
        .email_notifications
        .ok_or_else(|| HttpError::invalid("emailNotifications is required"))?;
    let user = state.db.set_email_notifications(user_id, enabled).await?;
    Ok(Json(PreferencesResponse {
        email_notifications: user.email_notifications,
    }))
}
