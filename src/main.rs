use std::sync::{Arc, Mutex};

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use medibook::config::AppConfig;
use medibook::db;
use medibook::handlers;
use medibook::services::ai::groq::GroqProvider;
use medibook::services::ai::ollama::OllamaProvider;
use medibook::services::ai::LlmProvider;
use medibook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(!config.groq_api_key.is_empty(), "GROQ_API_KEY must be set when LLM_PROVIDER=groq");
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Box::new(GroqProvider::new(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
                config.fallback_max_tokens,
            ))
        }
        _ => {
            tracing::info!("using Ollama LLM provider (url: {}, model: {})", config.ollama_url, config.ollama_model);
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
                config.fallback_max_tokens,
            ))
        }
    };

    let cors = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            tracing::warn!("invalid CORS_ORIGIN {:?}, allowing any origin", config.cors_origin);
            CorsLayer::new().allow_origin(Any)
        }
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        llm,
    });

    let app = handlers::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
