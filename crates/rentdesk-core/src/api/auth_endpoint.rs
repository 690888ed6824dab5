use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::models::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest};

use super::ApiError;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const REFRESH_PATH: &str = "/auth/refresh";

/// The unauthenticated half of the auth API.
///
/// Calls made here never go through the session pipeline, so a 401 from
/// the refresh endpoint cannot trigger another refresh.
#[async_trait]
pub trait AuthEndpoint: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<LoginResponse, ApiError>;

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError>;
}

#[derive(Clone)]
pub struct HttpAuthEndpoint {
    client: Client,
    base_url: String,
}

impl HttpAuthEndpoint {
    pub fn from_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        debug!(url = %url, "Auth request succeeded");
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)))
    }
}

#[async_trait]
impl AuthEndpoint for HttpAuthEndpoint {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post(LOGIN_PATH, request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<LoginResponse, ApiError> {
        self.post(REGISTER_PATH, request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let request = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post(REFRESH_PATH, &request).await
    }
}
