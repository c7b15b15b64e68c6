pub mod appointment;
pub mod command;
pub mod doctor;
pub mod user;

pub use appointment::{
    Appointment, AppointmentDetails, AppointmentStatus, NewAppointment, APPOINTMENT_MINUTES,
    DEFAULT_REASON,
};
pub use command::{Command, CommandKind, RemovalMode, StatusFilter};
pub use doctor::{Doctor, DoctorListing, NewDoctor};
pub use user::{NewUser, User, UserRole};
