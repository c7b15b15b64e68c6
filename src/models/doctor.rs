use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Doctor profile, owned 1:1 by a user with the doctor role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub user_id: i64,
    pub specialization: String,
    pub license_number: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub user_id: i64,
    pub specialization: String,
    pub license_number: String,
}

/// A doctor profile joined with the owning user's name.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorListing {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub license_number: String,
}
