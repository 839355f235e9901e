//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, DisabledChatAdapter, LogMailer, OpenAiChatAdapter},
    config::Config,
    error::ApiError,
    jobs::spawn_jobs,
    web::{router, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use attendance_core::ports::ChatAssistantService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let chat: Arc<dyn ChatAssistantService> = match config.openai_api_key.as_deref() {
        Some(key) => {
            let client = Client::with_config(OpenAIConfig::new().with_api_key(key));
            Arc::new(OpenAiChatAdapter::new(client, config.chat_model.clone()))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; the chat assistant is disabled");
            Arc::new(DisabledChatAdapter)
        }
    };
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        db_adapter,
        Arc::new(LogMailer),
        chat,
        config.clone(),
    ));

    // --- 5. Start the Scheduled Jobs ---
    let shutdown = CancellationToken::new();
    let jobs = spawn_jobs(app_state.clone(), shutdown.clone());

    // --- 6. Start the Server ---
    let app = router(app_state);
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for the shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    // --- 7. Stop the Jobs ---
    shutdown.cancel();
    for job in jobs {
        if let Err(e) = job.await {
            warn!("A scheduled job ended abnormally: {}", e);
        }
    }
    info!("Server stopped");

    Ok(())
}
