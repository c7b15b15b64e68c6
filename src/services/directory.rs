use rusqlite::Connection;

use crate::db::queries;
use crate::errors::CommandError;
use crate::models::{NewDoctor, NewUser, UserRole};

pub fn create_user(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    email: &str,
    role: UserRole,
) -> Result<String, CommandError> {
    if queries::find_user_by_email(conn, email)?.is_some() {
        return Err(CommandError::EmailTaken(email.to_string()));
    }

    let id = queries::create_user(
        conn,
        &NewUser {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: None,
            role,
        },
    )?;
    tracing::info!(user_id = id, role = role.as_str(), "user created");

    Ok(format!(
        "User {first_name} {last_name} created with email {email} and role {}.",
        role.label()
    ))
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<String, CommandError> {
    if !queries::delete_user(conn, id)? {
        return Err(CommandError::NotFound(format!("User {id}")));
    }
    tracing::info!(user_id = id, "user deleted");
    Ok(format!("User {id} deleted."))
}

pub fn list_users(conn: &Connection) -> Result<String, CommandError> {
    let users = queries::list_users(conn)?;
    if users.is_empty() {
        return Ok("No users found.".to_string());
    }

    let lines: Vec<String> = users
        .iter()
        .map(|u| format!("{}: {} ({})", u.id, u.full_name(), u.role.label()))
        .collect();
    Ok(format!("Users:\n{}", lines.join("\n")))
}

/// Attaches a doctor profile to an existing user with the doctor role.
///
/// The names in the command are informational; the confirmation uses the
/// linked account's names.
pub fn create_doctor(
    conn: &Connection,
    specialization: &str,
    license_number: &str,
    user_id: i64,
) -> Result<String, CommandError> {
    let user = queries::get_user(conn, user_id)?
        .ok_or_else(|| CommandError::NotFound(format!("User {user_id}")))?;
    if user.role != UserRole::Doctor {
        return Err(CommandError::NotADoctor(user_id));
    }
    if queries::find_doctor_by_user(conn, user_id)?.is_some() {
        return Err(CommandError::DoctorProfileExists(user_id));
    }
    if queries::find_doctor_by_license(conn, license_number)?.is_some() {
        return Err(CommandError::LicenseTaken(license_number.to_string()));
    }

    let id = queries::create_doctor(
        conn,
        &NewDoctor {
            user_id,
            specialization: specialization.to_string(),
            license_number: license_number.to_string(),
        },
    )?;
    tracing::info!(doctor_id = id, user_id, "doctor profile created");

    Ok(format!(
        "Doctor {} created with specialization {specialization}.",
        user.full_name()
    ))
}

pub fn delete_doctor(conn: &Connection, id: i64) -> Result<String, CommandError> {
    if !queries::delete_doctor(conn, id)? {
        return Err(CommandError::NotFound(format!("Doctor {id}")));
    }
    tracing::info!(doctor_id = id, "doctor profile deleted");
    Ok(format!("Doctor {id} deleted."))
}

pub fn list_doctors(conn: &Connection) -> Result<String, CommandError> {
    let doctors = queries::list_doctors(conn)?;
    if doctors.is_empty() {
        return Ok("No doctors found.".to_string());
    }

    let lines: Vec<String> = doctors
        .iter()
        .map(|d| {
            format!(
                "{}: Dr. {} {}, {} (User {})",
                d.id, d.first_name, d.last_name, d.specialization, d.user_id
            )
        })
        .collect();
    Ok(format!("Doctors:\n{}", lines.join("\n")))
}
