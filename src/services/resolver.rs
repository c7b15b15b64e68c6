use rusqlite::Connection;

use crate::db::queries;
use crate::errors::CommandError;
use crate::models::{Doctor, User};
use crate::services::extractor::DoctorRef;

/// A doctor reference bound to its user account and profile.
#[derive(Debug, Clone)]
pub struct ResolvedDoctor {
    pub user: User,
    pub doctor: Doctor,
}

impl ResolvedDoctor {
    pub fn display_name(&self) -> String {
        format!("Dr. {}", self.user.full_name())
    }
}

/// Binds `Dr. <First> <Last>` by exact first+last, and a lone token by last
/// name only. No fuzzy matching; more than one hit is reported back.
pub fn resolve_doctor(conn: &Connection, reference: &DoctorRef) -> Result<ResolvedDoctor, CommandError> {
    let users = match &reference.last {
        Some(last) => queries::find_doctor_users(conn, Some(&reference.first), last)?,
        None => queries::find_doctor_users(conn, None, &reference.first)?,
    };

    let user = match users.len() {
        0 => return Err(CommandError::DoctorNotFound),
        1 => users.into_iter().next().ok_or(CommandError::DoctorNotFound)?,
        _ => {
            let names = users
                .iter()
                .map(|u| format!("Dr. {}", u.full_name()))
                .collect();
            return Err(CommandError::AmbiguousDoctor(names));
        }
    };

    let doctor = queries::find_doctor_by_user(conn, user.id)?
        .ok_or_else(|| CommandError::DoctorProfileNotFound(format!("Dr. {}", user.full_name())))?;

    tracing::debug!(reference = %reference.display(), doctor_id = doctor.id, "resolved doctor reference");
    Ok(ResolvedDoctor { user, doctor })
}
