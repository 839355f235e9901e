//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the attendance chat assistant.
//! It implements the `ChatAssistantService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use attendance_core::ports::{ChatAssistantService, PortError, PortResult};

const SYSTEM_PROMPT: &str = "You are a study assistant inside a student attendance tracker. \
Answer the student's question using the attendance summary below when it is relevant. \
Be brief and concrete. When asked how many classes can be missed, assume a 75% minimum \
attendance requirement unless the student states another one.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatAssistantService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ChatAssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatAssistantService for OpenAiChatAdapter {
    async fn reply(&self, message: &str, attendance_context: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(format!(
                    "{}\n\nATTENDANCE SUMMARY:\n{}",
                    SYSTEM_PROMPT, attendance_context
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(message)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Chat LLM response contained no text content.".to_string())
            })
    }
}

/// Stands in for the assistant when no API key is configured.
#[derive(Clone, Default)]
pub struct DisabledChatAdapter;

#[async_trait]
impl ChatAssistantService for DisabledChatAdapter {
    async fn reply(&self, _message: &str, _attendance_context: &str) -> PortResult<String> {
        Err(PortError::Unavailable(
            "The chat assistant is not configured".to_string(),
        ))
    }
}
