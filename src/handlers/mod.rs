pub mod admin;
pub mod agent;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/agent/chat", post(agent::chat))
        .route("/api/appointments", get(admin::list_appointments))
        .route("/api/appointments/:id", get(admin::get_appointment))
        .route("/api/appointments/:id/cancel", post(admin::cancel_appointment))
        .route("/api/users", get(admin::list_users))
        .route("/api/doctors", get(admin::list_doctors))
        .with_state(state)
}
