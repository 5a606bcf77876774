//! User record and payload models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a directory user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {} (expected customer or admin)", other)),
        }
    }
}

/// A user record as returned by the remote directory API.
///
/// The client holds a transient cached copy for display only. Passwords are
/// write-only and never appear here, even when the API echoes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
}

/// Payload for creating or updating a user.
///
/// `password` is omitted from the serialized body when `None`, so an update
/// with a blank password keeps the existing one.
#[derive(Debug, Clone, Serialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    pub role: Role,
}

impl UserPayload {
    /// Build an editable payload from an existing record, password blanked.
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            password: None,
            avatar_url: record.avatar_url.clone(),
            role: record.role,
        }
    }

    /// Set the password, treating empty/whitespace input as "leave unchanged".
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = if password.trim().is_empty() {
            None
        } else {
            Some(password)
        };
        self
    }
}
