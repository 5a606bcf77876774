//! HTTP client for the remote user-directory API.
//!
//! The client wraps a small set of authenticated request helpers and maps
//! every failure into the [`ApiError`] taxonomy. Error response bodies carry
//! a `message` field (string or array of strings) that becomes the
//! human-readable message; transport failures fall back to the transport
//! error text.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::{ApiError, UserApi};
use crate::models::{UserPayload, UserRecord};

/// HTTP client for the remote directory API.
pub struct DirectoryClient {
    base_url: String,
    client: reqwest::Client,
}

impl DirectoryClient {
    /// Create a new client for the given API base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode a JSON response, mapping failures
    /// into the error taxonomy.
    async fn request<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, error_message(status, &body)));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::fetch(format!("Failed to parse API response: {}", e)))
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, token, None).await
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    async fn put<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, token, Some(body)).await
    }
}

/// Extract a human-readable message from an error response body.
///
/// The lineage API returns `{"message": "..."}` or `{"message": [...]}`;
/// anything else degrades to the HTTP status line.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match &value["message"] {
            serde_json::Value::String(message) => return message.clone(),
            serde_json::Value::Array(parts) => {
                let parts: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
                if !parts.is_empty() {
                    return parts.join("; ");
                }
            }
            _ => {}
        }
    }

    format!("Request failed with status {}", status)
}

// Wire types

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
}

#[async_trait]
impl UserApi for DirectoryClient {
    async fn authenticate(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = LoginRequest { email, password };
        let response: LoginResponse = self
            .post("/auth/login", None, &body)
            .await
            .map_err(ApiError::into_auth)?;

        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ApiError::auth("Login failed: no access token received")),
        }
    }

    async fn fetch_profile(&self, token: &str) -> Result<UserRecord, ApiError> {
        self.get("/auth/profile", Some(token))
            .await
            .map_err(ApiError::into_auth)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.get("/users", None).await
    }

    async fn fetch_user(&self, id: i64) -> Result<UserRecord, ApiError> {
        self.get(&format!("/users/{}", id), None).await
    }

    async fn create_user(&self, payload: &UserPayload) -> Result<UserRecord, ApiError> {
        self.post("/users", None, payload).await
    }

    async fn update_user(&self, id: i64, payload: &UserPayload) -> Result<UserRecord, ApiError> {
        self.put(&format!("/users/{}", id), None, payload).await
    }

    async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        // The API answers a bare boolean; decode and discard it.
        let _: serde_json::Value = self
            .request::<(), _>(Method::DELETE, &format!("/users/{}", id), None, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = DirectoryClient::new("https://api.example.com/api/v1/");
        assert_eq!(client.base_url(), "https://api.example.com/api/v1");
    }

    #[test]
    fn test_error_message_from_string_body() {
        let msg = error_message(
            StatusCode::UNAUTHORIZED,
            r#"{"message": "Unauthorized", "statusCode": 401}"#,
        );
        assert_eq!(msg, "Unauthorized");
    }

    #[test]
    fn test_error_message_from_array_body() {
        let msg = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"message": ["email must be an email", "name should not be empty"]}"#,
        );
        assert_eq!(msg, "email must be an email; name should not be empty");
    }

    #[test]
    fn test_error_message_fallback_on_garbage() {
        let msg = error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(msg, "Request failed with status 502 Bad Gateway");
    }
}
