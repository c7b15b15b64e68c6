//! Ordered rule table mapping a message to a [`Command`].
//!
//! Each rule has a trigger, matched against the lower-cased message, and a
//! structural parser run on the original text. Rules are tried top to
//! bottom and the first one whose trigger hits *and* whose parser succeeds
//! wins. A trigger hit with a failed parse falls through to the next rule.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{AppointmentStatus, Command, CommandKind, RemovalMode, StatusFilter, UserRole};

struct Rule {
    kind: CommandKind,
    trigger: Regex,
    parse: fn(&str) -> Option<Command>,
}

impl Rule {
    fn new(kind: CommandKind, trigger: &str, parse: fn(&str) -> Option<Command>) -> Self {
        Self {
            kind,
            trigger: Regex::new(trigger).unwrap(),
            parse,
        }
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            CommandKind::CreateUser,
            r"\b(create|add|register)\s+(a\s+|new\s+)*user\b",
            parse_create_user,
        ),
        Rule::new(CommandKind::DeleteUser, r"\bdelete\s+user\b", parse_delete_user),
        Rule::new(
            CommandKind::ListUsers,
            r"\b(list|show|all)\s+(all\s+)?users\b",
            |_| Some(Command::ListUsers),
        ),
        Rule::new(
            CommandKind::CreateDoctor,
            r"\b(create|add|register)\s+(a\s+|new\s+)*doctor\b",
            parse_create_doctor,
        ),
        Rule::new(CommandKind::DeleteDoctor, r"\bdelete\s+doctor\b", parse_delete_doctor),
        Rule::new(
            CommandKind::ListDoctors,
            r"\b(list|show|all)\s+(all\s+)?doctors\b",
            |_| Some(Command::ListDoctors),
        ),
        Rule::new(
            CommandKind::DeleteAppointment,
            r"\bdelete\s+appointment\b",
            parse_delete_appointment,
        ),
        Rule::new(
            CommandKind::ListAppointmentsById,
            r"\b(list|show|all)\s+(all\s+)?appointments\b",
            parse_list_by_user,
        ),
        Rule::new(
            CommandKind::RescheduleById,
            r"\breschedule\s+appointment\b",
            parse_reschedule_by_id,
        ),
        Rule::new(
            CommandKind::RescheduleByIdNaturalText,
            r"\breschedule\s+appointment\b",
            parse_reschedule_by_id_natural,
        ),
        Rule::new(
            CommandKind::ListAppointmentsNaturalText,
            r"(\b(list|show|view|display|see|check)\b.*\b(appointments?|bookings?)\b|\bwhat\s+(are|is)\s+my\b.*\b(appointments?|bookings?)\b|\bdo\s+i\s+have\b.*\b(appointments?|bookings?)\b|\bmy\s+(upcoming|pending|confirmed|cancell?ed|canceled|completed)\s+(appointments?|bookings?)\b|\bupcoming\s+(appointments?|bookings?)\b)",
            parse_list_natural,
        ),
        Rule::new(
            CommandKind::CancelOrDeleteByDoctorAndDate,
            r"\b(cancel|delete|remove)\b.*\b(appointments?|bookings?|visit)\b",
            parse_cancel_or_delete,
        ),
        Rule::new(
            CommandKind::RescheduleNaturalByDoctorOrLatest,
            r"(\breschedul\w*|\b(move|change|shift)\b.*\b(appointments?|bookings?)\b|\bpostpone\b)",
            |_| Some(Command::RescheduleNaturalByDoctorOrLatest),
        ),
        Rule::new(
            CommandKind::BookAppointment,
            r"(\bbook|\bschedul|\bmake\s+an?\s+appointment)",
            |_| Some(Command::BookAppointment),
        ),
    ]
});

static CREATE_USER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\buser\s+([a-z][a-z'-]*)\s+([a-z][a-z'-]*)\s+with\s+email\s+(\S+@\S+?)\s+and\s+role\s+(patient|doctor|admin)\b").unwrap()
});
static DELETE_USER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bdelete\s+user\s+#?(\d+)\b").unwrap());
static CREATE_DOCTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdoctor\s+([a-z][a-z'-]*)\s+([a-z][a-z'-]*)\s+with\s+specialization\s+([^,]+?),\s*license\s+([^\s,]+),?\s+user\s+#?(\d+)\b").unwrap()
});
static DELETE_DOCTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdelete\s+doctor\s+#?(\d+)\b").unwrap());
static DELETE_APPOINTMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdelete\s+appointment\s+#?(\d+)\s*[.!]?\s*$").unwrap());
static LIST_BY_USER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bappointments\s+(?:for|of)\s+(?:user|patient)\s+#?(\d+)\b").unwrap()
});
static RESCHEDULE_BY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\breschedule\s+appointment\s+#?(\d+)\s+to\s+(\d{4}-\d{2}-\d{2})\s+(\d{1,2}):(\d{2})\b\s*(\S*)").unwrap()
});
static RESCHEDULE_NATURAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\breschedule\s+appointment\s+#?(\d+)\s+to\s+(.+)$").unwrap()
});
static STATUS_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(upcoming|pending|confirmed|cancelled|canceled|completed)\b").unwrap()
});
static REMOVAL_VERB: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(cancel|delete|remove)\b").unwrap());

/// Classifies a message; never fails, unknown text is `Unclassified`.
pub fn classify(message: &str) -> Command {
    let lowered = message.to_lowercase();
    for rule in RULES.iter() {
        if !rule.trigger.is_match(&lowered) {
            continue;
        }
        match (rule.parse)(message) {
            Some(command) => return command,
            None => {
                tracing::debug!(kind = rule.kind.as_str(), "trigger matched but structure did not, falling through");
            }
        }
    }
    Command::Unclassified
}

/// Rule kinds in evaluation order.
pub fn precedence() -> Vec<CommandKind> {
    RULES.iter().map(|r| r.kind).collect()
}

fn parse_id(s: &str) -> Option<i64> {
    s.parse().ok()
}

fn parse_create_user(text: &str) -> Option<Command> {
    let caps = CREATE_USER.captures(text)?;
    Some(Command::CreateUser {
        first_name: caps[1].to_string(),
        last_name: caps[2].to_string(),
        email: caps[3].trim_end_matches(['.', ',']).to_string(),
        role: UserRole::parse(&caps[4])?,
    })
}

fn parse_delete_user(text: &str) -> Option<Command> {
    let caps = DELETE_USER.captures(text)?;
    Some(Command::DeleteUser { id: parse_id(&caps[1])? })
}

fn parse_create_doctor(text: &str) -> Option<Command> {
    let caps = CREATE_DOCTOR.captures(text)?;
    Some(Command::CreateDoctor {
        first_name: caps[1].to_string(),
        last_name: caps[2].to_string(),
        specialization: caps[3].trim().to_string(),
        license_number: caps[4].to_string(),
        user_id: parse_id(&caps[5])?,
    })
}

fn parse_delete_doctor(text: &str) -> Option<Command> {
    let caps = DELETE_DOCTOR.captures(text)?;
    Some(Command::DeleteDoctor { id: parse_id(&caps[1])? })
}

fn parse_delete_appointment(text: &str) -> Option<Command> {
    let caps = DELETE_APPOINTMENT.captures(text)?;
    Some(Command::DeleteAppointment { id: parse_id(&caps[1])? })
}

fn parse_list_by_user(text: &str) -> Option<Command> {
    let caps = LIST_BY_USER.captures(text)?;
    Some(Command::ListAppointmentsById { user_id: parse_id(&caps[1])? })
}

fn parse_reschedule_by_id(text: &str) -> Option<Command> {
    let caps = RESCHEDULE_BY_ID.captures(text)?;
    // "to 2025-06-01 3:00 pm" is 12-hour and belongs to the natural-text rule
    let trailing = caps[5].to_lowercase();
    if trailing.starts_with("am") || trailing.starts_with("pm") || trailing.starts_with("a.m") || trailing.starts_with("p.m") {
        return None;
    }
    let date = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok()?;
    let time = NaiveTime::from_hms_opt(caps[3].parse().ok()?, caps[4].parse().ok()?, 0)?;
    Some(Command::RescheduleById {
        id: parse_id(&caps[1])?,
        start: NaiveDateTime::new(date, time),
    })
}

fn parse_reschedule_by_id_natural(text: &str) -> Option<Command> {
    let caps = RESCHEDULE_NATURAL.captures(text)?;
    let when = caps[2].trim().to_string();
    if when.is_empty() {
        return None;
    }
    Some(Command::RescheduleByIdNaturalText {
        id: parse_id(&caps[1])?,
        when,
    })
}

fn parse_list_natural(text: &str) -> Option<Command> {
    let lowered = text.to_lowercase();
    let filter = STATUS_WORD.captures(&lowered).map(|caps| match &caps[1] {
        "upcoming" => StatusFilter::Upcoming,
        other => StatusFilter::Only(AppointmentStatus::parse(other)),
    });
    Some(Command::ListAppointmentsNaturalText { filter })
}

fn parse_cancel_or_delete(text: &str) -> Option<Command> {
    let lowered = text.to_lowercase();
    let verb = REMOVAL_VERB.captures(&lowered)?;
    let mode = match &verb[1] {
        "cancel" => RemovalMode::Cancel,
        _ => RemovalMode::Delete,
    };
    Some(Command::CancelOrDeleteByDoctorAndDate { mode })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_is_fixed() {
        assert_eq!(
            precedence(),
            vec![
                CommandKind::CreateUser,
                CommandKind::DeleteUser,
                CommandKind::ListUsers,
                CommandKind::CreateDoctor,
                CommandKind::DeleteDoctor,
                CommandKind::ListDoctors,
                CommandKind::DeleteAppointment,
                CommandKind::ListAppointmentsById,
                CommandKind::RescheduleById,
                CommandKind::RescheduleByIdNaturalText,
                CommandKind::ListAppointmentsNaturalText,
                CommandKind::CancelOrDeleteByDoctorAndDate,
                CommandKind::RescheduleNaturalByDoctorOrLatest,
                CommandKind::BookAppointment,
            ]
        );
    }

    #[test]
    fn test_create_user() {
        let cmd = classify("Create user Jane Doe with email jane@example.com and role Patient");
        assert_eq!(
            cmd,
            Command::CreateUser {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                role: UserRole::Patient,
            }
        );
    }

    #[test]
    fn test_create_doctor() {
        let cmd = classify(
            "add doctor John Smith with specialization General Medicine, license MD123456, user 2",
        );
        assert_eq!(
            cmd,
            Command::CreateDoctor {
                first_name: "John".to_string(),
                last_name: "Smith".to_string(),
                specialization: "General Medicine".to_string(),
                license_number: "MD123456".to_string(),
                user_id: 2,
            }
        );
    }

    #[test]
    fn test_admin_ids_and_listings() {
        assert_eq!(classify("delete user 4"), Command::DeleteUser { id: 4 });
        assert_eq!(classify("delete doctor #2"), Command::DeleteDoctor { id: 2 });
        assert_eq!(classify("delete appointment 9"), Command::DeleteAppointment { id: 9 });
        assert_eq!(classify("list users"), Command::ListUsers);
        assert_eq!(classify("show all doctors"), Command::ListDoctors);
        assert_eq!(
            classify("show appointments for user 3"),
            Command::ListAppointmentsById { user_id: 3 }
        );
    }

    #[test]
    fn test_structural_failure_falls_through() {
        // no id: not an admin delete, but still a natural-text removal
        assert_eq!(
            classify("delete appointment with Dr. Smith on 2025-06-01"),
            Command::CancelOrDeleteByDoctorAndDate { mode: RemovalMode::Delete }
        );
        // no email/role: nothing else claims it
        assert_eq!(classify("create user Bob"), Command::Unclassified);
        // "show appointments" without a user id lists the caller's own
        assert_eq!(
            classify("show appointments"),
            Command::ListAppointmentsNaturalText { filter: None }
        );
    }

    #[test]
    fn test_reschedule_by_id_forms() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(
            classify("reschedule appointment 5 to 2025-06-02 14:30"),
            Command::RescheduleById { id: 5, start }
        );
        assert_eq!(
            classify("Reschedule appointment 5 to 2025-06-02 2:30 pm"),
            Command::RescheduleByIdNaturalText {
                id: 5,
                when: "2025-06-02 2:30 pm".to_string()
            }
        );
        assert_eq!(
            classify("reschedule appointment 5 to next friday at 3pm"),
            Command::RescheduleByIdNaturalText {
                id: 5,
                when: "next friday at 3pm".to_string()
            }
        );
        // invalid clock time falls back to natural text
        assert!(matches!(
            classify("reschedule appointment 5 to 2025-06-02 25:00"),
            Command::RescheduleByIdNaturalText { .. }
        ));
    }

    #[test]
    fn test_list_natural_status_filters() {
        assert_eq!(
            classify("What are my upcoming appointments?"),
            Command::ListAppointmentsNaturalText { filter: Some(StatusFilter::Upcoming) }
        );
        assert_eq!(
            classify("show my cancelled appointments"),
            Command::ListAppointmentsNaturalText {
                filter: Some(StatusFilter::Only(AppointmentStatus::Cancelled))
            }
        );
        assert_eq!(
            classify("do I have any appointments"),
            Command::ListAppointmentsNaturalText { filter: None }
        );
    }

    #[test]
    fn test_cancel_versus_delete_verb() {
        assert_eq!(
            classify("cancel my appointment with Dr. Smith on 2025-06-01"),
            Command::CancelOrDeleteByDoctorAndDate { mode: RemovalMode::Cancel }
        );
        assert_eq!(
            classify("please remove my booking tomorrow"),
            Command::CancelOrDeleteByDoctorAndDate { mode: RemovalMode::Delete }
        );
    }

    #[test]
    fn test_natural_reschedule_and_booking() {
        assert_eq!(
            classify("reschedule my appointment with Dr. Smith to tomorrow at 3pm"),
            Command::RescheduleNaturalByDoctorOrLatest
        );
        assert_eq!(
            classify("move my appointment to friday"),
            Command::RescheduleNaturalByDoctorOrLatest
        );
        assert_eq!(
            classify("book appointment with Dr. Smith on 2025-06-01 at 10:00 for checkup"),
            Command::BookAppointment
        );
        assert_eq!(
            classify("Can you schedule me with Dr. Lee tomorrow?"),
            Command::BookAppointment
        );
        assert_eq!(classify("what's the weather like?"), Command::Unclassified);
    }

    #[test]
    fn test_first_match_wins() {
        // both list and cancel words: list comes first
        assert_eq!(
            classify("show me which appointments I can cancel"),
            Command::ListAppointmentsNaturalText { filter: None }
        );
        // cancel outranks booking vocabulary
        assert_eq!(
            classify("cancel the appointment I booked"),
            Command::CancelOrDeleteByDoctorAndDate { mode: RemovalMode::Cancel }
        );
    }
}
