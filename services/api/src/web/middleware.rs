//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::web::auth::session_from_headers;
use crate::web::error::HttpError;
use crate::web::state::AppState;

/// Middleware that validates the auth session cookie and extracts the user_id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Parse session ID from the cookie header
    let Some(auth_session_id) = session_from_headers(req.headers()).map(str::to_owned) else {
        return HttpError::Unauthorized.into_response();
    };

    // 2. Validate auth session in database, get user_id
    let user_id = match state.db.validate_auth_session(&auth_session_id).await {
        Ok(user_id) => user_id,
        Err(e) => {
            debug!("Rejected auth session: {}", e);
            return HttpError::Unauthorized.into_response();
        }
    };

    // 3. Insert user_id into request extensions and continue to the handler
    req.extensions_mut().insert(user_id);
    next.run(req).await
}
