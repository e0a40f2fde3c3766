//! User model as seen by the authentication service

use common::role::Role;
use serde::Deserialize;
use uuid::Uuid;

/// The subset of a user row needed to authenticate
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// User login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    /// Emails are matched case-insensitively
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}
