//! REST implementation of the remote data source.

use crate::config::{AuthConfig, ClientConfig};
use crate::error::ApiClientError;
use crate::traits::RemoteDataSource;
use crate::types::{
    Ack, Envelope, ListPoliciesRequest, PolicyPage, UpvoteReply, UpvoteWire, VotesResponse,
};
use agora_core::{Policy, PolicyDraft, PolicyId};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Error body the server attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(
        &self,
        path: &str,
        query: Option<&[(&'static str, String)]>,
    ) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(url).headers(self.auth_header.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(url).headers(self.auth_header.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .put(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn delete_json<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .delete(url)
            .headers(self.auth_header.clone())
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let text = response.text().await?;
            Err(server_error(status.as_u16(), &text))
        }
    }
}

fn server_error(status: u16, body: &str) -> ApiClientError {
    if let Ok(parsed) = serde_json::from_str::<ServerErrorBody>(body) {
        if let Some(message) = parsed.message {
            return ApiClientError::Rejected { message };
        }
    }
    warn!(status, "unrecognized error body from server");
    ApiClientError::InvalidResponse(format!("HTTP {}: {}", status, body))
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &auth.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[async_trait]
impl RemoteDataSource for RestClient {
    async fn list_policies(
        &self,
        request: &ListPoliciesRequest,
    ) -> Result<PolicyPage, ApiClientError> {
        self.get_json("/api/policies", Some(&request.query_pairs()))
            .await
    }

    async fn get_policy(&self, id: &PolicyId) -> Result<Policy, ApiClientError> {
        let path = format!("/api/policies/{}", id);
        self.get_json(&path, None).await
    }

    async fn user_policies(&self) -> Result<Vec<Policy>, ApiClientError> {
        let envelope: Envelope<Vec<Policy>> =
            self.get_json("/api/policies/user-policies", None).await?;
        envelope.into_result()
    }

    async fn user_votes(&self) -> Result<Vec<PolicyId>, ApiClientError> {
        let response: VotesResponse = self.get_json("/api/policies/votes", None).await?;
        Ok(response.votes)
    }

    async fn upvote_policy(&self, id: &PolicyId) -> Result<UpvoteReply, ApiClientError> {
        let url = format!("{}/api/policies/{}/upvote", self.base_url, id);
        let response = self
            .client
            .post(url)
            .headers(self.auth_header.clone())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            let wire: UpvoteWire = serde_json::from_str(&text)?;
            return wire.into_reply();
        }
        // Duplicate votes come back as a client error with a message body;
        // those are in-band conflicts, not failures.
        if status.is_client_error() {
            if let Ok(parsed) = serde_json::from_str::<ServerErrorBody>(&text) {
                if let Some(message) = parsed.message {
                    return Ok(UpvoteReply::Conflict { message });
                }
            }
        }
        Err(server_error(status.as_u16(), &text))
    }

    async fn create_policy(&self, draft: &PolicyDraft) -> Result<Policy, ApiClientError> {
        let envelope: Envelope<Policy> = self.post_json("/api/policies", Some(draft)).await?;
        envelope.into_result()
    }

    async fn update_policy(
        &self,
        id: &PolicyId,
        draft: &PolicyDraft,
    ) -> Result<Ack, ApiClientError> {
        let path = format!("/api/policies/{}", id);
        let envelope: Envelope<serde_json::Value> = self.put_json(&path, draft).await?;
        envelope.into_ack()
    }

    async fn delete_policy(&self, id: &PolicyId) -> Result<Ack, ApiClientError> {
        let path = format!("/api/policies/{}", id);
        self.delete_json(&path).await
    }
}
