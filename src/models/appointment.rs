use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Every appointment occupies a fixed slot of this many minutes.
pub const APPOINTMENT_MINUTES: i64 = 30;

pub const DEFAULT_REASON: &str = "Scheduled via agent";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    pub doctor_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: i64,
    pub doctor_id: i64,
    pub start_time: NaiveDateTime,
    pub reason: String,
    pub status: AppointmentStatus,
}

impl NewAppointment {
    pub fn end_time(&self) -> NaiveDateTime {
        slot_end(self.start_time)
    }
}

/// An appointment together with the names of the doctor's user account.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

impl AppointmentDetails {
    pub fn doctor_name(&self) -> String {
        format!("Dr. {} {}", self.doctor_first_name, self.doctor_last_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => AppointmentStatus::Confirmed,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            "completed" => AppointmentStatus::Completed,
            _ => AppointmentStatus::Pending,
        }
    }

    /// Pending and confirmed appointments hold their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

pub fn slot_end(start: NaiveDateTime) -> NaiveDateTime {
    start + Duration::minutes(APPOINTMENT_MINUTES)
}

/// Human-readable local timestamp used in every confirmation, e.g. `2025-06-01 10:00 AM`.
pub fn display_time(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_slot_end_is_thirty_minutes() {
        assert_eq!(slot_end(dt("2025-06-01 23:45")), dt("2025-06-02 00:15"));
    }

    #[test]
    fn test_display_time() {
        assert_eq!(display_time(&dt("2025-06-01 10:00")), "2025-06-01 10:00 AM");
        assert_eq!(display_time(&dt("2025-06-01 14:30")), "2025-06-01 02:30 PM");
    }

    #[test]
    fn test_active_statuses() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
        assert_eq!(AppointmentStatus::parse("canceled"), AppointmentStatus::Cancelled);
    }
}
