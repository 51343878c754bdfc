//! Student domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentPhoneNumberUse {
    Parent,
    Student,
    Home,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPhoneNumber {
    pub number: String,
    #[serde(rename = "use")]
    pub used_by: StudentPhoneNumberUse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    /// Display name, as entered.
    pub name: String,
    /// Canonical search key, derived from `name`. Never entered directly.
    #[serde(rename = "_name")]
    pub search_name: String,
    pub phone_numbers: Vec<StudentPhoneNumber>,
    pub space: Uuid,
}

/// Creation payload. The search key is derived, not supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudent {
    pub name: String,
    pub phone_numbers: Vec<StudentPhoneNumber>,
    pub space: Uuid,
}
