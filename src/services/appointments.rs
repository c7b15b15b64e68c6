//! Executes booking-class commands against the store.
//!
//! Natural-text requests build a candidate set first: none is a not-found
//! reply, several is a numbered list asking for an id, and only a single
//! candidate is mutated. Every check-then-write runs inside one IMMEDIATE
//! transaction.

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::queries::{self, AppointmentFilter, AppointmentOrder};
use crate::errors::CommandError;
use crate::models::appointment::display_time;
use crate::models::{AppointmentDetails, AppointmentStatus, NewAppointment, RemovalMode, StatusFilter};
use crate::services::datetime;
use crate::services::extractor::{self, Entities};
use crate::services::resolver;
use crate::services::scheduling;

static RESCHEDULE_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(reschedul\w*|move|change|shift|postpone)\b").unwrap());
static TO_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bto\b").unwrap());

fn begin(conn: &mut Connection) -> anyhow::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin transaction")
}

/// Books a new pending appointment for the caller.
pub fn book(
    conn: &mut Connection,
    caller_id: i64,
    text: &str,
    now: NaiveDateTime,
) -> Result<String, CommandError> {
    let entities = Entities::extract(text, now.date());
    let reference = entities.doctor.as_ref().ok_or(CommandError::MissingDoctor)?;

    let tx = begin(conn)?;
    let doctor = resolver::resolve_doctor(&tx, reference)?;
    if queries::get_user(&tx, caller_id)?.is_none() {
        return Err(CommandError::NotFound(format!("User {caller_id}")));
    }

    let (Some(date), Some(time)) = (entities.date, entities.time) else {
        return Err(CommandError::UnparseableDateTime);
    };
    let start = NaiveDateTime::new(date, time);
    let doctor_name = doctor.display_name();
    scheduling::validate_slot(&tx, doctor.doctor.id, &doctor_name, &start, None)?;

    let id = queries::create_appointment(
        &tx,
        &NewAppointment {
            user_id: caller_id,
            doctor_id: doctor.doctor.id,
            start_time: start,
            reason: entities.reason.clone(),
            status: AppointmentStatus::Pending,
        },
    )?;
    tx.commit().context("failed to commit booking")?;

    tracing::info!(appointment_id = id, doctor_id = doctor.doctor.id, caller_id, "appointment booked");
    Ok(format!(
        "Your appointment with {} is booked for {} for {}.",
        doctor_name,
        display_time(&start),
        entities.reason
    ))
}

/// Cancels (soft) or deletes (hard) the caller's appointment matching the
/// doctor, date, time or id named in `text`.
pub fn cancel_or_delete(
    conn: &mut Connection,
    caller_id: i64,
    text: &str,
    mode: RemovalMode,
    now: NaiveDateTime,
) -> Result<String, CommandError> {
    if datetime::has_invalid_time(text) {
        return Err(CommandError::UnparseableDateTime);
    }
    let entities = Entities::extract(text, now.date());

    let tx = begin(conn)?;
    let target = Target::from_entities(&entities);
    let candidates = find_candidates(&tx, caller_id, &target, AppointmentOrder::StartAsc)?;
    let verb = match mode {
        RemovalMode::Cancel => "cancel",
        RemovalMode::Delete => "delete",
    };
    let appointment = match select(candidates, &format!("{verb} appointment"))? {
        Selection::One(appointment) => appointment,
        Selection::Ambiguous(reply) => return Ok(reply),
    };
    let id = appointment.appointment.id;

    let done = match mode {
        RemovalMode::Cancel => {
            queries::update_appointment_status(&tx, id, &AppointmentStatus::Cancelled)?;
            "cancelled"
        }
        RemovalMode::Delete => {
            queries::delete_appointment(&tx, id)?;
            "deleted"
        }
    };
    tx.commit().context("failed to commit removal")?;

    tracing::info!(appointment_id = id, caller_id, action = done, "appointment removed");
    Ok(format!(
        "Your appointment with {} on {} has been {}.",
        appointment.doctor_name(),
        display_time(&appointment.appointment.start_time),
        done
    ))
}

/// Moves one of the caller's appointments. The part before "to" selects the
/// appointment, the part after names the new date and/or time. Without any
/// selector the most recently created active appointment is moved.
pub fn reschedule_natural(
    conn: &mut Connection,
    caller_id: i64,
    text: &str,
    now: NaiveDateTime,
) -> Result<String, CommandError> {
    if datetime::has_invalid_time(text) {
        return Err(CommandError::UnparseableDateTime);
    }
    let today = now.date();
    let whole = Entities::extract(text, today);
    let (target, new_part) = match split_reschedule(text) {
        Some((selector, new_part)) => {
            let selector = Entities::extract(selector, today);
            let target = Target {
                doctor: selector.doctor.or_else(|| whole.doctor.clone()),
                date: selector.date,
                time: selector.time,
                appointment_id: whole.appointment_id,
            };
            (target, new_part)
        }
        None => (
            Target {
                doctor: whole.doctor.clone(),
                appointment_id: whole.appointment_id,
                ..Target::default()
            },
            text,
        ),
    };

    if datetime::extract_date(new_part, today).is_none() && datetime::extract_time(new_part).is_none() {
        return Err(CommandError::UnparseableDateTime);
    }

    let tx = begin(conn)?;
    let appointment = if target.is_empty() {
        find_candidates(&tx, caller_id, &target, AppointmentOrder::CreatedDesc)?
            .into_iter()
            .next()
            .ok_or(CommandError::NoMatchingAppointment)?
    } else {
        let candidates = find_candidates(&tx, caller_id, &target, AppointmentOrder::StartAsc)?;
        match select(candidates, "reschedule appointment")? {
            Selection::One(appointment) => appointment,
            Selection::Ambiguous(reply) => return Ok(reply),
        }
    };

    let start = datetime::parse_flexible_datetime(new_part, today, appointment.appointment.start_time)
        .ok_or(CommandError::UnparseableDateTime)?;
    move_appointment(&tx, &appointment, start)?;
    tx.commit().context("failed to commit reschedule")?;

    Ok(format!(
        "Your appointment with {} has been rescheduled to {}.",
        appointment.doctor_name(),
        display_time(&start)
    ))
}

/// Administrative move of any appointment by id to an exact start.
pub fn reschedule_by_id(
    conn: &mut Connection,
    id: i64,
    start: NaiveDateTime,
) -> Result<String, CommandError> {
    let tx = begin(conn)?;
    let appointment = load_reschedulable(&tx, id)?;
    move_appointment(&tx, &appointment, start)?;
    tx.commit().context("failed to commit reschedule")?;
    Ok(format!("Appointment {id} rescheduled to {}.", display_time(&start)))
}

/// Like [`reschedule_by_id`], with the new start given as free text. A
/// missing date or time keeps the appointment's current one.
pub fn reschedule_by_id_natural(
    conn: &mut Connection,
    id: i64,
    when: &str,
    now: NaiveDateTime,
) -> Result<String, CommandError> {
    let tx = begin(conn)?;
    let appointment = load_reschedulable(&tx, id)?;
    let start = datetime::parse_flexible_datetime(when, now.date(), appointment.appointment.start_time)
        .ok_or(CommandError::UnparseableDateTime)?;
    move_appointment(&tx, &appointment, start)?;
    tx.commit().context("failed to commit reschedule")?;
    Ok(format!("Appointment {id} rescheduled to {}.", display_time(&start)))
}

pub fn delete_by_id(conn: &Connection, id: i64) -> Result<String, CommandError> {
    if queries::delete_appointment(conn, id)? {
        tracing::info!(appointment_id = id, "appointment deleted");
        Ok(format!("Appointment {id} deleted."))
    } else {
        Err(CommandError::NotFound(format!("Appointment {id}")))
    }
}

/// The caller's own appointments, optionally narrowed by status and by the
/// doctor or date named in `text`.
pub fn list_for_caller(
    conn: &Connection,
    caller_id: i64,
    text: &str,
    filter: Option<StatusFilter>,
    now: NaiveDateTime,
) -> Result<String, CommandError> {
    let entities = Entities::extract(text, now.date());
    let doctor_id = match &entities.doctor {
        Some(reference) => Some(resolver::resolve_doctor(conn, reference)?.doctor.id),
        None => None,
    };

    let (statuses, starts_after, label) = match filter {
        None => (vec![], None, String::new()),
        Some(StatusFilter::Upcoming) => (
            AppointmentStatus::ACTIVE.to_vec(),
            Some(now),
            "upcoming ".to_string(),
        ),
        Some(StatusFilter::Only(status)) => (vec![status], None, format!("{} ", status.as_str())),
    };
    let query = AppointmentFilter {
        user_id: Some(caller_id),
        doctor_id,
        date: entities.date,
        statuses,
        starts_after,
        ..Default::default()
    };

    let appointments = queries::list_appointments(conn, &query)?;
    if appointments.is_empty() {
        return Ok(format!("You have no {label}appointments."));
    }
    Ok(format!("Your {label}appointments:\n{}", render_lines(&appointments, true)))
}

/// Every appointment of `user_id`, for administrators.
pub fn list_for_user(conn: &Connection, user_id: i64) -> Result<String, CommandError> {
    if queries::get_user(conn, user_id)?.is_none() {
        return Err(CommandError::NotFound(format!("User {user_id}")));
    }
    let filter = AppointmentFilter {
        user_id: Some(user_id),
        ..Default::default()
    };
    let appointments = queries::list_appointments(conn, &filter)?;
    if appointments.is_empty() {
        return Ok(format!("No appointments found for user {user_id}."));
    }
    Ok(format!(
        "Appointments for user {user_id}:\n{}",
        render_lines(&appointments, true)
    ))
}

/// What a natural-text request says about the appointment it refers to.
#[derive(Debug, Clone, Default)]
struct Target {
    doctor: Option<extractor::DoctorRef>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    appointment_id: Option<i64>,
}

impl Target {
    fn from_entities(entities: &Entities) -> Self {
        Self {
            doctor: entities.doctor.clone(),
            date: entities.date,
            time: entities.time,
            appointment_id: entities.appointment_id,
        }
    }

    fn is_empty(&self) -> bool {
        self.doctor.is_none() && self.date.is_none() && self.time.is_none() && self.appointment_id.is_none()
    }
}

fn find_candidates(
    conn: &Connection,
    caller_id: i64,
    target: &Target,
    order: AppointmentOrder,
) -> Result<Vec<AppointmentDetails>, CommandError> {
    let doctor_id = match &target.doctor {
        Some(reference) => Some(resolver::resolve_doctor(conn, reference)?.doctor.id),
        None => None,
    };
    let filter = AppointmentFilter {
        appointment_id: target.appointment_id,
        user_id: Some(caller_id),
        doctor_id,
        date: target.date,
        statuses: AppointmentStatus::ACTIVE.to_vec(),
        order,
        ..Default::default()
    };

    let mut candidates = queries::list_appointments(conn, &filter)?;
    if let Some(time) = target.time {
        candidates.retain(|a| a.appointment.start_time.time() == time);
    }
    tracing::debug!(caller_id, count = candidates.len(), "candidate appointments");
    Ok(candidates)
}

/// Outcome of narrowing a candidate set for a mutation.
enum Selection {
    One(AppointmentDetails),
    /// Several candidates: the turn ends with this list, nothing is mutated.
    Ambiguous(String),
}

fn select(
    mut candidates: Vec<AppointmentDetails>,
    example_command: &str,
) -> Result<Selection, CommandError> {
    match candidates.len() {
        0 => Err(CommandError::NoMatchingAppointment),
        1 => candidates
            .pop()
            .map(Selection::One)
            .ok_or(CommandError::NoMatchingAppointment),
        _ => Ok(Selection::Ambiguous(disambiguation_reply(&candidates, example_command))),
    }
}

pub fn disambiguation_reply(candidates: &[AppointmentDetails], example_command: &str) -> String {
    let example_id = candidates.first().map(|a| a.appointment.id).unwrap_or_default();
    format!(
        "I found {} matching appointments:\n{}\nPlease reply with the appointment id, e.g. '{} {}'.",
        candidates.len(),
        render_lines(candidates, false),
        example_command,
        example_id
    )
}

fn render_lines(appointments: &[AppointmentDetails], with_doctor: bool) -> String {
    appointments
        .iter()
        .map(|a| {
            let when = display_time(&a.appointment.start_time);
            let status = a.appointment.status.as_str();
            if with_doctor {
                format!("{} | {} | {} | {}", a.appointment.id, when, a.doctor_name(), status)
            } else {
                format!("{} | {} | {}", a.appointment.id, when, status)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn load_reschedulable(conn: &Connection, id: i64) -> Result<AppointmentDetails, CommandError> {
    let appointment = queries::get_appointment(conn, id)?
        .ok_or_else(|| CommandError::NotFound(format!("Appointment {id}")))?;
    if !appointment.appointment.status.is_active() {
        return Err(CommandError::NotReschedulable {
            id,
            status: appointment.appointment.status.as_str(),
        });
    }
    Ok(appointment)
}

fn move_appointment(
    conn: &Connection,
    appointment: &AppointmentDetails,
    start: NaiveDateTime,
) -> Result<(), CommandError> {
    let id = appointment.appointment.id;
    let doctor_id = appointment.appointment.doctor_id;
    let end = scheduling::validate_slot(conn, doctor_id, &appointment.doctor_name(), &start, Some(id))?;
    queries::update_appointment_window(conn, id, &start, &end)?;
    tracing::info!(appointment_id = id, doctor_id, start = %start, "appointment rescheduled");
    Ok(())
}

/// Splits "reschedule <selector> to <new time>" at the first "to" after the
/// verb.
fn split_reschedule(text: &str) -> Option<(&str, &str)> {
    let verb = RESCHEDULE_VERB.find(text)?;
    let to = TO_WORD.find_at(text, verb.end())?;
    Some((&text[..to.start()], &text[to.end()..]))
}
