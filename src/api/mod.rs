//! Remote directory API collaborator.
//!
//! This module provides:
//! - The [`UserApi`] trait: the operations the console consumes
//! - [`DirectoryClient`]: the HTTP implementation over the remote REST API
//! - [`ApiError`]: the structured failure taxonomy

pub mod client;
pub mod error;

pub use client::DirectoryClient;
pub use error::{ApiError, ErrorKind};

use crate::models::{UserPayload, UserRecord};
use async_trait::async_trait;

/// Operations the console consumes from the remote directory API.
///
/// Transport details live behind this seam; tests substitute in-memory
/// implementations.
#[async_trait]
pub trait UserApi: Send + Sync {
    /// Exchange credentials for a bearer token.
    ///
    /// Fails with an `Auth` error on invalid credentials or network failure.
    async fn authenticate(&self, email: &str, password: &str) -> Result<String, ApiError>;

    /// Fetch the profile of the token's owner.
    ///
    /// Fails with an `Auth` error on an invalid/expired token.
    async fn fetch_profile(&self, token: &str) -> Result<UserRecord, ApiError>;

    /// List all user records.
    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError>;

    /// Fetch a single user record by id.
    async fn fetch_user(&self, id: i64) -> Result<UserRecord, ApiError>;

    /// Create a user record.
    async fn create_user(&self, payload: &UserPayload) -> Result<UserRecord, ApiError>;

    /// Update a user record.
    async fn update_user(&self, id: i64, payload: &UserPayload) -> Result<UserRecord, ApiError>;

    /// Delete a user record.
    async fn delete_user(&self, id: i64) -> Result<(), ApiError>;
}
