use rusqlite::Connection;

use crate::db::queries::{self, AppointmentFilter};
use crate::services::ai::LlmProvider;

const PROMPT_TEMPLATE: &str = r#"You are an intelligent appointment scheduling assistant. Your task is to help users schedule, modify, or cancel medical appointments.

User message: {message}

Please provide a helpful response that:
1. Understands the user's intent
2. Provides relevant information or next steps
3. Maintains a professional and friendly tone

Response:
"#;

const EMPTY_REPLY: &str = "I'm not sure how to help with that. You can ask me to book, reschedule, cancel or list your appointments.";

/// Renders the caller's appointments for the prompt, one
/// `- YYYY-MM-DD HH:MM with Dr. <last>: <status>` line each. Empty when the
/// caller has none.
pub fn appointment_context(conn: &Connection, caller_id: i64) -> anyhow::Result<String> {
    let filter = AppointmentFilter {
        user_id: Some(caller_id),
        ..Default::default()
    };
    let appointments = queries::list_appointments(conn, &filter)?;
    if appointments.is_empty() {
        return Ok(String::new());
    }

    let mut context = String::from("\nYour existing appointments:\n");
    for a in &appointments {
        context.push_str(&format!(
            "- {} with Dr. {}: {}\n",
            a.appointment.start_time.format("%Y-%m-%d %H:%M"),
            a.doctor_last_name,
            a.appointment.status.as_str()
        ));
    }
    Ok(context)
}

pub fn build_prompt(message: &str, context: &str) -> String {
    PROMPT_TEMPLATE.replace("{message}", &format!("{message}{context}"))
}

pub async fn respond(llm: &dyn LlmProvider, prompt: &str) -> anyhow::Result<String> {
    let reply = llm.generate(prompt).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        tracing::warn!("fallback responder returned an empty reply");
        return Ok(EMPTY_REPLY.to_string());
    }
    Ok(reply.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{AppointmentStatus, NewAppointment, NewDoctor, NewUser, UserRole};
    use chrono::NaiveDateTime;

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for Echo {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn seed(conn: &Connection) -> i64 {
        let patient = queries::create_user(
            conn,
            &NewUser {
                email: "jane@example.com".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                phone: None,
                role: UserRole::Patient,
            },
        )
        .unwrap();
        let doc_user = queries::create_user(
            conn,
            &NewUser {
                email: "smith@example.com".to_string(),
                first_name: "John".to_string(),
                last_name: "Smith".to_string(),
                phone: None,
                role: UserRole::Doctor,
            },
        )
        .unwrap();
        let doctor = queries::create_doctor(
            conn,
            &NewDoctor {
                user_id: doc_user,
                specialization: "General Medicine".to_string(),
                license_number: "MD123456".to_string(),
            },
        )
        .unwrap();
        queries::create_appointment(
            conn,
            &NewAppointment {
                user_id: patient,
                doctor_id: doctor,
                start_time: NaiveDateTime::parse_from_str("2025-06-01 14:00", "%Y-%m-%d %H:%M").unwrap(),
                reason: "checkup".to_string(),
                status: AppointmentStatus::Confirmed,
            },
        )
        .unwrap();
        patient
    }

    #[test]
    fn test_context_lists_caller_appointments() {
        let conn = db::init_db(":memory:").unwrap();
        let patient = seed(&conn);

        assert_eq!(
            appointment_context(&conn, patient).unwrap(),
            "\nYour existing appointments:\n- 2025-06-01 14:00 with Dr. Smith: confirmed\n"
        );
        assert_eq!(appointment_context(&conn, 999).unwrap(), "");
    }

    #[test]
    fn test_prompt_embeds_message_and_context() {
        let prompt = build_prompt("hello", "\nYour existing appointments:\n- x\n");
        assert!(prompt.starts_with("You are an intelligent appointment scheduling assistant."));
        assert!(prompt.contains("User message: hello\nYour existing appointments:\n- x\n"));
        assert!(prompt.ends_with("Response:\n"));
    }

    #[tokio::test]
    async fn test_blank_generation_gets_default_reply() {
        assert_eq!(respond(&Echo("  \n"), "p").await.unwrap(), EMPTY_REPLY);
        assert_eq!(respond(&Echo(" Hi there "), "p").await.unwrap(), "Hi there");
    }
}
