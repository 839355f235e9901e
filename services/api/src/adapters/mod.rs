pub mod chat_llm;
pub mod db;
pub mod mailer;
pub mod pdf;

pub use chat_llm::{DisabledChatAdapter, OpenAiChatAdapter};
pub use db::DbAdapter;
pub use mailer::LogMailer;
