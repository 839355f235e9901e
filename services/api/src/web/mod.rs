//! services/api/src/web/mod.rs
//!
//! The HTTP surface: handlers grouped by resource and the router tying them
//! together behind the session middleware.

pub mod academic;
pub mod attendance;
pub mod auth;
pub mod auto_attendance;
pub mod chatbot;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod rest;
pub mod schedules;
pub mod state;
pub mod subjects;
pub mod todos;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

/// Headroom for the multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
            cors
        }
    }
}

/// Builds the complete application: public routes, session-protected routes
/// and the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/subjects",
            post(subjects::create_subject_handler).get(subjects::list_subjects_handler),
        )
        .route(
            "/subjects/{id}",
            get(subjects::get_subject_handler)
                .put(subjects::update_subject_handler)
                .delete(subjects::delete_subject_handler),
        )
        .route(
            "/academic-periods",
            post(academic::create_period_handler).get(academic::list_periods_handler),
        )
        .route(
            "/academic-periods/current",
            get(academic::current_period_handler),
        )
        .route(
            "/academic-periods/{id}",
            delete(academic::delete_period_handler),
        )
        .route(
            "/holidays",
            post(academic::create_holiday_handler).get(academic::list_holidays_handler),
        )
        .route(
            "/holidays/{id}",
            delete(academic::delete_holiday_handler),
        )
        .route(
            "/schedules",
            post(schedules::create_schedule_handler).get(schedules::current_schedule_handler),
        )
        .route(
            "/attendance",
            post(attendance::mark_attendance_handler).get(attendance::list_attendance_handler),
        )
        .route(
            "/auto-attendance/toggle",
            put(auto_attendance::toggle_handler),
        )
        .route(
            "/auto-attendance/status",
            get(auto_attendance::status_handler),
        )
        .route(
            "/auto-attendance/mark-past",
            post(auto_attendance::mark_past_handler),
        )
        .route(
            "/auto-attendance/bulk-upload",
            post(auto_attendance::bulk_upload_handler),
        )
        .route(
            "/uploads/schedule",
            post(uploads::upload_schedule_handler).layer(DefaultBodyLimit::max(
                state.config.max_upload_bytes + MULTIPART_OVERHEAD,
            )),
        )
        .route(
            "/notifications",
            get(notifications::list_notifications_handler),
        )
        .route(
            "/notifications/read-all",
            put(notifications::mark_all_read_handler),
        )
        .route(
            "/notifications/preferences",
            put(notifications::preferences_handler),
        )
        .route(
            "/notifications/{id}/read",
            put(notifications::mark_read_handler),
        )
        .route(
            "/todos",
            post(todos::create_todo_handler).get(todos::list_todos_handler),
        )
        .route(
            "/todos/{id}",
            put(todos::update_todo_handler).delete(todos::delete_todo_handler),
        )
        .route("/chatbot", post(chatbot::chatbot_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config.cors_origin))
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
