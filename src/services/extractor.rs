use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::DEFAULT_REASON;
use crate::services::datetime;

static DOCTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdr(?:\.\s*|\s+)([a-z][a-z'-]*)(?:\s+([a-z][a-z'-]*))?").unwrap());
static FOR_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfor\s+").unwrap());
static APPOINTMENT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\b(?:appointment|booking)\s+(?:id\s+|number\s+)?#?|#)(\d+)\b([/:-])?").unwrap()
});

/// Tokens that may follow `Dr. <First>` without being a last name.
const NAME_STOP_WORDS: &[&str] = &[
    "on", "at", "for", "to", "from", "and", "in", "with", "next", "this", "tomorrow", "today",
    "am", "pm", "instead", "please", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "january", "february", "march", "april", "may", "june", "july",
    "august", "september", "october", "november", "december",
];

/// Words that end a reason clause.
const REASON_STOP_WORDS: &[&str] = &[
    "with", "at", "on", "to", "from", "tomorrow", "today", "dr", "dr.", "next", "this",
];

/// Doctor as written in the message; `last` is absent for a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorRef {
    pub first: String,
    pub last: Option<String>,
}

impl DoctorRef {
    pub fn display(&self) -> String {
        match &self.last {
            Some(last) => format!("Dr. {} {}", self.first, last),
            None => format!("Dr. {}", self.first),
        }
    }
}

/// Everything a booking-class command can pull out of free text. Missing
/// pieces stay `None`; the engine decides which ones it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Entities {
    pub doctor: Option<DoctorRef>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub reason: String,
    pub appointment_id: Option<i64>,
}

impl Entities {
    pub fn extract(text: &str, today: NaiveDate) -> Self {
        Self {
            doctor: extract_doctor(text),
            date: datetime::extract_date(text, today),
            time: datetime::extract_time(text),
            reason: extract_reason(text).unwrap_or_else(|| DEFAULT_REASON.to_string()),
            appointment_id: extract_appointment_id(text),
        }
    }
}

pub fn extract_doctor(text: &str) -> Option<DoctorRef> {
    let caps = DOCTOR.captures(text)?;
    let first = caps[1].to_string();
    let last = caps
        .get(2)
        .map(|m| m.as_str())
        .filter(|w| !NAME_STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .map(str::to_string);
    Some(DoctorRef { first, last })
}

/// Text after "for ", up to the next connector word or number.
pub fn extract_reason(text: &str) -> Option<String> {
    FOR_CLAUSE.find_iter(text).find_map(|m| {
        let words: Vec<&str> = text[m.end()..]
            .split_whitespace()
            .take_while(|w| {
                let lower = w.to_lowercase();
                !REASON_STOP_WORDS.contains(&lower.trim_end_matches(','))
                    && !w.starts_with(|c: char| c.is_ascii_digit())
            })
            .collect();
        let reason = words
            .join(" ")
            .trim_end_matches(['.', ',', '!', '?'])
            .trim()
            .to_string();
        (!reason.is_empty()).then_some(reason)
    })
}

/// Explicit `appointment 12` / `#12` reference. Numbers glued to `/`, `-`
/// or `:` are dates or times, not ids.
pub fn extract_appointment_id(text: &str) -> Option<i64> {
    APPOINTMENT_ID
        .captures_iter(text)
        .filter(|caps| caps.get(2).is_none())
        .find_map(|caps| caps[1].parse().ok())
}
