//! Local user domain model.
//!
//! Users are global — they are not scoped to a space; their capabilities
//! are. The password is hashed with Argon2id before storage and is never
//! selected back out of the database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub phone_number: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    /// Raw replacement password (re-hashed before storage).
    pub password: Option<String>,
}

/// Directory entry returned by the user listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUserInfo {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub is_center_manager: bool,
    /// Names of spaces this user manages.
    pub manages_spaces: Vec<String>,
    /// Names of spaces this user belongs to, excluding managed ones.
    pub member_of_spaces: Vec<String>,
}

/// A user allowed to reset someone's password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordResetter {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
}
