use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentStatus, Doctor, DoctorListing, NewAppointment,
    NewDoctor, NewUser, User, UserRole,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("bad timestamp in store: {s}"))
}

fn now() -> String {
    fmt_ts(&Local::now().naive_local())
}

// ── Users ──

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, phone, role, is_active, created_at, updated_at";

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(5)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        role: UserRole::parse(&role_str).unwrap_or(UserRole::Patient),
        is_active: row.get::<_, i32>(6)? != 0,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

pub fn get_user(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = conn
        .query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?;
    user.transpose()
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)");
    let user = conn
        .query_row(&sql, params![email], |row| Ok(parse_user_row(row)))
        .optional()?;
    user.transpose()
}

/// Users with the doctor role whose last name (and first name, when given)
/// match case-insensitively.
pub fn find_doctor_users(
    conn: &Connection,
    first_name: Option<&str>,
    last_name: &str,
) -> anyhow::Result<Vec<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE role = 'doctor'
           AND lower(last_name) = lower(?1)
           AND (?2 IS NULL OR lower(first_name) = lower(?2))
         ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![last_name, first_name], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

pub fn create_user(conn: &Connection, user: &NewUser) -> anyhow::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO users (email, first_name, last_name, phone, role, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
        params![
            user.email,
            user.first_name,
            user.last_name,
            user.phone,
            user.role.as_str(),
            ts,
        ],
    )
    .context("failed to insert user")?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_user(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Doctors ──

const DOCTOR_COLUMNS: &str =
    "id, user_id, specialization, license_number, created_at, updated_at";

fn parse_doctor_row(row: &rusqlite::Row) -> anyhow::Result<Doctor> {
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;

    Ok(Doctor {
        id: row.get(0)?,
        user_id: row.get(1)?,
        specialization: row.get(2)?,
        license_number: row.get(3)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

pub fn get_doctor(conn: &Connection, id: i64) -> anyhow::Result<Option<Doctor>> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1");
    let doctor = conn
        .query_row(&sql, params![id], |row| Ok(parse_doctor_row(row)))
        .optional()?;
    doctor.transpose()
}

pub fn find_doctor_by_user(conn: &Connection, user_id: i64) -> anyhow::Result<Option<Doctor>> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1");
    let doctor = conn
        .query_row(&sql, params![user_id], |row| Ok(parse_doctor_row(row)))
        .optional()?;
    doctor.transpose()
}

pub fn find_doctor_by_license(
    conn: &Connection,
    license_number: &str,
) -> anyhow::Result<Option<Doctor>> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE lower(license_number) = lower(?1)");
    let doctor = conn
        .query_row(&sql, params![license_number], |row| Ok(parse_doctor_row(row)))
        .optional()?;
    doctor.transpose()
}

pub fn list_doctors(conn: &Connection) -> anyhow::Result<Vec<DoctorListing>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.user_id, u.first_name, u.last_name, d.specialization, d.license_number
         FROM doctors d JOIN users u ON u.id = d.user_id
         ORDER BY d.id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(DoctorListing {
            id: row.get(0)?,
            user_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            specialization: row.get(4)?,
            license_number: row.get(5)?,
        })
    })?;

    let mut doctors = vec![];
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}

pub fn create_doctor(conn: &Connection, doctor: &NewDoctor) -> anyhow::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO doctors (user_id, specialization, license_number, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![doctor.user_id, doctor.specialization, doctor.license_number, ts],
    )
    .context("failed to insert doctor")?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_doctor(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Appointments ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppointmentOrder {
    #[default]
    StartAsc,
    CreatedDesc,
}

/// Predicate for `list_appointments`; `None`/empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub appointment_id: Option<i64>,
    pub user_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub statuses: Vec<AppointmentStatus>,
    pub starts_after: Option<NaiveDateTime>,
    pub order: AppointmentOrder,
}

const APPOINTMENT_SELECT: &str =
    "SELECT a.id, a.user_id, a.doctor_id, a.start_time, a.end_time, a.reason, a.status, a.notes, \
     a.created_at, a.updated_at, u.first_name, u.last_name \
     FROM appointments a \
     JOIN doctors d ON d.id = a.doctor_id \
     JOIN users u ON u.id = d.user_id";

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<AppointmentDetails> {
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(AppointmentDetails {
        appointment: Appointment {
            id: row.get(0)?,
            user_id: row.get(1)?,
            doctor_id: row.get(2)?,
            start_time: parse_ts(&start_str)?,
            end_time: parse_ts(&end_str)?,
            reason: row.get(5)?,
            status: AppointmentStatus::parse(&status_str),
            notes: row.get(7)?,
            created_at: parse_ts(&created_at_str)?,
            updated_at: parse_ts(&updated_at_str)?,
        },
        doctor_first_name: row.get(10)?,
        doctor_last_name: row.get(11)?,
    })
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> anyhow::Result<Vec<AppointmentDetails>> {
    let mut clauses: Vec<String> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(id) = filter.appointment_id {
        params_vec.push(Box::new(id));
        clauses.push(format!("a.id = ?{}", params_vec.len()));
    }
    if let Some(user_id) = filter.user_id {
        params_vec.push(Box::new(user_id));
        clauses.push(format!("a.user_id = ?{}", params_vec.len()));
    }
    if let Some(doctor_id) = filter.doctor_id {
        params_vec.push(Box::new(doctor_id));
        clauses.push(format!("a.doctor_id = ?{}", params_vec.len()));
    }
    if let Some(date) = filter.date {
        let day_start = date.and_hms_opt(0, 0, 0).map(|d| fmt_ts(&d));
        let next_day = date
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| fmt_ts(&d));
        if let (Some(day_start), Some(next_day)) = (day_start, next_day) {
            params_vec.push(Box::new(day_start));
            clauses.push(format!("a.start_time >= ?{}", params_vec.len()));
            params_vec.push(Box::new(next_day));
            clauses.push(format!("a.start_time < ?{}", params_vec.len()));
        }
    }
    if !filter.statuses.is_empty() {
        let mut placeholders = vec![];
        for status in &filter.statuses {
            params_vec.push(Box::new(status.as_str()));
            placeholders.push(format!("?{}", params_vec.len()));
        }
        clauses.push(format!("a.status IN ({})", placeholders.join(", ")));
    }
    if let Some(after) = filter.starts_after {
        params_vec.push(Box::new(fmt_ts(&after)));
        clauses.push(format!("a.start_time >= ?{}", params_vec.len()));
    }

    let mut sql = APPOINTMENT_SELECT.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(match filter.order {
        AppointmentOrder::StartAsc => " ORDER BY a.start_time ASC, a.id ASC",
        AppointmentOrder::CreatedDesc => " ORDER BY a.created_at DESC, a.id DESC",
    });

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment(conn: &Connection, id: i64) -> anyhow::Result<Option<AppointmentDetails>> {
    let filter = AppointmentFilter {
        appointment_id: Some(id),
        ..Default::default()
    };
    Ok(list_appointments(conn, &filter)?.into_iter().next())
}

pub fn create_appointment(conn: &Connection, appointment: &NewAppointment) -> anyhow::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO appointments (user_id, doctor_id, start_time, end_time, reason, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            appointment.user_id,
            appointment.doctor_id,
            fmt_ts(&appointment.start_time),
            fmt_ts(&appointment.end_time()),
            appointment.reason,
            appointment.status.as_str(),
            ts,
        ],
    )
    .context("failed to insert appointment")?;
    Ok(conn.last_insert_rowid())
}

pub fn update_appointment_window(
    conn: &Connection,
    id: i64,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET start_time = ?1, end_time = ?2, updated_at = ?3 WHERE id = ?4",
        params![fmt_ts(start), fmt_ts(end), now(), id],
    )?;
    Ok(count > 0)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: &AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_appointment(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// True when an active appointment of `doctor_id` intersects `[start, end)`.
pub fn has_overlapping_appointment(
    conn: &Connection,
    doctor_id: i64,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    exclude_id: Option<i64>,
) -> anyhow::Result<bool> {
    let overlapping: bool = conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM appointments
            WHERE doctor_id = ?1
              AND status IN ('pending', 'confirmed')
              AND start_time < ?2
              AND end_time > ?3
              AND (?4 IS NULL OR id != ?4)
         )",
        params![doctor_id, fmt_ts(end), fmt_ts(start), exclude_id],
        |row| row.get(0),
    )?;
    Ok(overlapping)
}
