use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::queries::{self, AppointmentFilter};
use crate::errors::AppError;
use crate::models::{AppointmentDetails, AppointmentStatus, DoctorListing, User};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, AppError> {
    match raw.trim().to_lowercase().as_str() {
        s @ ("pending" | "confirmed" | "cancelled" | "canceled" | "completed") => {
            Ok(AppointmentStatus::parse(s))
        }
        other => Err(AppError::BadRequest(format!("unknown status: {other}"))),
    }
}

// GET /api/appointments
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub user_id: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentDetails>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let statuses = match query.status.as_deref() {
        Some(raw) => vec![parse_status(raw)?],
        None => vec![],
    };
    let filter = AppointmentFilter {
        user_id: query.user_id,
        statuses,
        ..Default::default()
    };

    let appointments = {
        let db = state.conn()?;
        queries::list_appointments(&db, &filter)?
    };
    Ok(Json(appointments))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<AppointmentDetails>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appointment = {
        let db = state.conn()?;
        queries::get_appointment(&db, id)?
    };
    appointment
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))
}

// POST /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<AppointmentDetails>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.conn()?;
    let appointment = queries::get_appointment(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;
    if !appointment.appointment.status.is_active() {
        return Err(AppError::BadRequest(format!(
            "appointment {id} is already {}",
            appointment.appointment.status.as_str()
        )));
    }

    queries::update_appointment_status(&db, id, &AppointmentStatus::Cancelled)?;
    tracing::info!(appointment_id = id, "appointment cancelled by admin");

    queries::get_appointment(&db, id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))
}

// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let users = {
        let db = state.conn()?;
        queries::list_users(&db)?
    };
    Ok(Json(users))
}

// GET /api/doctors
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DoctorListing>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let doctors = {
        let db = state.conn()?;
        queries::list_doctors(&db)?
    };
    Ok(Json(doctors))
}
