//! Typed JSON client for the rentdesk REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests. Every call goes through the [`SessionClient`], so expired
//! access tokens are refreshed without the caller noticing.

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::session::SessionClient;

use super::request::{ApiRequest, ApiResponse};
use super::ApiError;

/// Clone is cheap - the session client is shared.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionClient,
}

impl ApiClient {
    pub fn new(session: SessionClient) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status(), &response.text()))
        }
    }

    /// Send a prepared request; non-success statuses become errors
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method().clone();
        let path = request.path().to_string();
        let response = self.session.execute(request).await?;
        debug!(%method, path = %path, status = response.status().as_u16(), "API call finished");
        Self::check_response(response)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (key, value)| req.query(*key, *value));
        self.send(request).await?.json()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send(ApiRequest::put(path).json(body)?).await?.json()
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    /// Delete a resource, ignoring whatever body the server sends back
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }
}
