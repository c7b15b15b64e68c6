use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Outcome of a command that did not go through. The `Display` text is the
/// reply sent back to the user.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Please tell me which doctor you'd like to see, for example 'with Dr. Smith'.")]
    MissingDoctor,

    #[error("Sorry, I could not find the specified doctor. Please check the doctor's name.")]
    DoctorNotFound,

    #[error("More than one doctor matches that name ({}). Please include the doctor's first and last name.", .0.join(", "))]
    AmbiguousDoctor(Vec<String>),

    #[error("Sorry, the doctor profile for {0} was not found.")]
    DoctorProfileNotFound(String),

    #[error("Sorry, I could not understand the date or time. Please specify in a clear format.")]
    UnparseableDateTime,

    #[error("{0} not found.")]
    NotFound(String),

    #[error("I couldn't find a matching active appointment. Say 'show my appointments' to see what you have booked.")]
    NoMatchingAppointment,

    #[error("Sorry, {0} is not available at that time. Please choose another slot.")]
    NotAvailable(String),

    #[error("Appointment {id} is {status} and can no longer be changed.")]
    NotReschedulable { id: i64, status: &'static str },

    #[error("A user with email {0} already exists.")]
    EmailTaken(String),

    #[error("User {0} does not have the DOCTOR role.")]
    NotADoctor(i64),

    #[error("User {0} already has a doctor profile.")]
    DoctorProfileExists(i64),

    #[error("License number {0} is already registered.")]
    LicenseTaken(String),

    #[error("I apologize, but I'm having trouble processing your request right now. Error: {0:#}")]
    Internal(#[from] anyhow::Error),
}
