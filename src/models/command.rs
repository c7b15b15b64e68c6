use chrono::NaiveDateTime;
use serde::Serialize;

use super::{AppointmentStatus, UserRole};

/// Closed set of command kinds a message can be classified into.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    CreateUser,
    DeleteUser,
    ListUsers,
    CreateDoctor,
    DeleteDoctor,
    ListDoctors,
    DeleteAppointment,
    ListAppointmentsById,
    RescheduleById,
    RescheduleByIdNaturalText,
    ListAppointmentsNaturalText,
    CancelOrDeleteByDoctorAndDate,
    RescheduleNaturalByDoctorOrLatest,
    BookAppointment,
    Unclassified,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::CreateUser => "create_user",
            CommandKind::DeleteUser => "delete_user",
            CommandKind::ListUsers => "list_users",
            CommandKind::CreateDoctor => "create_doctor",
            CommandKind::DeleteDoctor => "delete_doctor",
            CommandKind::ListDoctors => "list_doctors",
            CommandKind::DeleteAppointment => "delete_appointment",
            CommandKind::ListAppointmentsById => "list_appointments_by_id",
            CommandKind::RescheduleById => "reschedule_by_id",
            CommandKind::RescheduleByIdNaturalText => "reschedule_by_id_natural_text",
            CommandKind::ListAppointmentsNaturalText => "list_appointments_natural_text",
            CommandKind::CancelOrDeleteByDoctorAndDate => "cancel_or_delete_by_doctor_and_date",
            CommandKind::RescheduleNaturalByDoctorOrLatest => "reschedule_natural_by_doctor_or_latest",
            CommandKind::BookAppointment => "book_appointment",
            CommandKind::Unclassified => "unclassified",
        }
    }
}

/// Which appointments a "list my appointments" request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Active appointments starting from now on.
    Upcoming,
    Only(AppointmentStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Soft: status becomes cancelled, the row stays.
    Cancel,
    /// Hard: the row is removed.
    Delete,
}

/// A classified message with the structural fields its rule captured.
///
/// Natural-text commands carry no entities here; those are pulled out of the
/// raw message by the extractor once the kind is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateUser {
        first_name: String,
        last_name: String,
        email: String,
        role: UserRole,
    },
    DeleteUser {
        id: i64,
    },
    ListUsers,
    CreateDoctor {
        first_name: String,
        last_name: String,
        specialization: String,
        license_number: String,
        user_id: i64,
    },
    DeleteDoctor {
        id: i64,
    },
    ListDoctors,
    DeleteAppointment {
        id: i64,
    },
    ListAppointmentsById {
        user_id: i64,
    },
    RescheduleById {
        id: i64,
        start: NaiveDateTime,
    },
    RescheduleByIdNaturalText {
        id: i64,
        when: String,
    },
    ListAppointmentsNaturalText {
        filter: Option<StatusFilter>,
    },
    CancelOrDeleteByDoctorAndDate {
        mode: RemovalMode,
    },
    RescheduleNaturalByDoctorOrLatest,
    BookAppointment,
    Unclassified,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateUser { .. } => CommandKind::CreateUser,
            Command::DeleteUser { .. } => CommandKind::DeleteUser,
            Command::ListUsers => CommandKind::ListUsers,
            Command::CreateDoctor { .. } => CommandKind::CreateDoctor,
            Command::DeleteDoctor { .. } => CommandKind::DeleteDoctor,
            Command::ListDoctors => CommandKind::ListDoctors,
            Command::DeleteAppointment { .. } => CommandKind::DeleteAppointment,
            Command::ListAppointmentsById { .. } => CommandKind::ListAppointmentsById,
            Command::RescheduleById { .. } => CommandKind::RescheduleById,
            Command::RescheduleByIdNaturalText { .. } => CommandKind::RescheduleByIdNaturalText,
            Command::ListAppointmentsNaturalText { .. } => {
                CommandKind::ListAppointmentsNaturalText
            }
            Command::CancelOrDeleteByDoctorAndDate { .. } => {
                CommandKind::CancelOrDeleteByDoctorAndDate
            }
            Command::RescheduleNaturalByDoctorOrLatest => {
                CommandKind::RescheduleNaturalByDoctorOrLatest
            }
            Command::BookAppointment => CommandKind::BookAppointment,
            Command::Unclassified => CommandKind::Unclassified,
        }
    }
}
