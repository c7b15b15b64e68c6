use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields needed to insert a user; ids and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Doctor => "doctor",
            UserRole::Admin => "admin",
        }
    }

    /// Case-insensitive parse of a role word typed by a user.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "patient" => Some(UserRole::Patient),
            "doctor" => Some(UserRole::Doctor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Patient => "PATIENT",
            UserRole::Doctor => "DOCTOR",
            UserRole::Admin => "ADMIN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(UserRole::parse("DOCTOR"), Some(UserRole::Doctor));
        assert_eq!(UserRole::parse("Patient"), Some(UserRole::Patient));
        assert_eq!(UserRole::parse(" admin "), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("nurse"), None);
    }
}
