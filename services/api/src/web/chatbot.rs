//! services/api/src/web/chatbot.rs
//!
//! The attendance chat assistant. The model sees a one-line summary per subject.

use attendance_core::domain::Subject;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{ChatRequest, ChatResponse, ErrorBody, Problems};
use crate::web::error::HttpError;
use crate::web::state::AppState;

/// One line per subject, e.g. `Physics: 3/4 attended (75.0%)`.
pub fn attendance_context(subjects: &[Subject]) -> String {
    if subjects.is_empty() {
        return "The student has not added any subjects yet.".to_string();
    }
    subjects
        .iter()
        .map(|s| match s.attendance_percentage() {
            Some(pct) => format!(
                "{}: {}/{} attended ({:.1}%)",
                s.name, s.attended_classes, s.total_classes, pct
            ),
            None => format!("{}: no classes recorded", s.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[utoipa::path(
    post,
    path = "/chatbot",
    tag = "chatbot",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 503, description = "The assistant is not configured", body = ErrorBody)
    )
)]
pub async fn chatbot_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HttpError> {
    let mut problems = Problems::default();
    let message = problems.required("message", req.message.as_deref());
    problems.finish()?;
    let message = message.unwrap_or_default();

    let subjects = state.db.list_subjects(user_id).await?;
    let reply = state
        .chat
        .reply(&message, &attendance_context(&subjects))
        .await?;
    Ok(Json(ChatResponse { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn subject(name: &str, attended: u32, total: u32) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_string(),
            code: None,
            total_classes: total,
            attended_classes: attended,
            class_type_stats: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn context_lists_each_subject() {
        let context = attendance_context(&[subject("Physics", 3, 4), subject("Art", 0, 0)]);
        assert_eq!(
            context,
            "Physics: 3/4 attended (75.0%)\nArt: no classes recorded"
        );
    }
}
