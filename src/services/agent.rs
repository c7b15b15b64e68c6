use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::CommandError;
use crate::models::Command;
use crate::services::ai::fallback;
use crate::services::{appointments, classifier, directory};
use crate::state::AppState;

/// Turns one message into one reply. Never fails: anything that goes wrong
/// is reported back as text.
pub async fn process_message(state: &AppState, message: &str, caller_id: i64) -> String {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("message", %request_id, caller_id);

    async move {
        let command = classifier::classify(message);
        tracing::info!(kind = command.kind().as_str(), "classified message");

        let strategy = strategy_for(command);
        match strategy.reply(state, message, caller_id).await {
            Ok(reply) => reply,
            Err(CommandError::Internal(e)) => {
                tracing::error!(error = %format!("{e:#}"), "failed to process message");
                CommandError::Internal(e).to_string()
            }
            Err(e) => {
                tracing::info!(outcome = %e, "command not carried out");
                e.to_string()
            }
        }
    }
    .instrument(span)
    .await
}

/// How a classified message gets its reply.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    async fn reply(&self, state: &AppState, message: &str, caller_id: i64) -> Result<String, CommandError>;
}

pub fn strategy_for(command: Command) -> Box<dyn ReplyStrategy> {
    match command {
        Command::Unclassified => Box::new(FallbackStrategy),
        command => Box::new(StructuredStrategy { command }),
    }
}

/// Executes a recognized command against the store.
pub struct StructuredStrategy {
    pub command: Command,
}

#[async_trait]
impl ReplyStrategy for StructuredStrategy {
    async fn reply(&self, state: &AppState, message: &str, caller_id: i64) -> Result<String, CommandError> {
        let mut conn = state.conn()?;
        execute(&mut conn, &self.command, message, caller_id, Local::now().naive_local())
    }
}

/// Hands the message and the caller's appointments to the LLM.
pub struct FallbackStrategy;

#[async_trait]
impl ReplyStrategy for FallbackStrategy {
    async fn reply(&self, state: &AppState, message: &str, caller_id: i64) -> Result<String, CommandError> {
        let context = load_context(state, caller_id)?;
        let prompt = fallback::build_prompt(message, &context);
        let reply = fallback::respond(state.llm.as_ref(), &prompt).await?;
        Ok(reply)
    }
}

// The connection lock is released before the LLM call.
fn load_context(state: &AppState, caller_id: i64) -> anyhow::Result<String> {
    let conn = state.conn()?;
    fallback::appointment_context(&conn, caller_id)
}

pub fn execute(
    conn: &mut Connection,
    command: &Command,
    message: &str,
    caller_id: i64,
    now: NaiveDateTime,
) -> Result<String, CommandError> {
    match command {
        Command::CreateUser {
            first_name,
            last_name,
            email,
            role,
        } => directory::create_user(conn, first_name, last_name, email, *role),
        Command::DeleteUser { id } => directory::delete_user(conn, *id),
        Command::ListUsers => directory::list_users(conn),
        Command::CreateDoctor {
            specialization,
            license_number,
            user_id,
            ..
        } => directory::create_doctor(conn, specialization, license_number, *user_id),
        Command::DeleteDoctor { id } => directory::delete_doctor(conn, *id),
        Command::ListDoctors => directory::list_doctors(conn),
        Command::DeleteAppointment { id } => appointments::delete_by_id(conn, *id),
        Command::ListAppointmentsById { user_id } => appointments::list_for_user(conn, *user_id),
        Command::RescheduleById { id, start } => appointments::reschedule_by_id(conn, *id, *start),
        Command::RescheduleByIdNaturalText { id, when } => {
            appointments::reschedule_by_id_natural(conn, *id, when, now)
        }
        Command::ListAppointmentsNaturalText { filter } => {
            appointments::list_for_caller(conn, caller_id, message, *filter, now)
        }
        Command::CancelOrDeleteByDoctorAndDate { mode } => {
            appointments::cancel_or_delete(conn, caller_id, message, *mode, now)
        }
        Command::RescheduleNaturalByDoctorOrLatest => {
            appointments::reschedule_natural(conn, caller_id, message, now)
        }
        Command::BookAppointment => appointments::book(conn, caller_id, message, now),
        Command::Unclassified => Err(CommandError::Internal(anyhow::anyhow!(
            "unclassified message has no command to execute"
        ))),
    }
}
