use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::agent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
}

// POST /agent/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let response = agent::process_message(&state, message, body.user_id).await;
    Ok(Json(ChatResponse { response }))
}
