//! Shared HTTP client and response envelope.

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// `{success, data, message}` as returned by every endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResult<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResult<T> {
    /// `data` of a successful result; otherwise the server message.
    pub fn into_data(self) -> Result<T, String> {
        if !self.success {
            return Err(self
                .message
                .unwrap_or_else(|| "request was not successful".to_string()));
        }
        self.data
            .ok_or_else(|| "response carried no data".to_string())
    }
}

/// Base URL + bearer token. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    client: Arc<Client>,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Base URL extended by `segments`, each percent-encoded as a single path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| format!("invalid API URL {}: {}", self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| format!("API URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, String> {
        let request = self.client.get(self.endpoint(segments)?);
        self.send(request).await
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, String>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.endpoint(segments)?).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> Result<T, String> {
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        let response = request
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!(status = %status, len = text.len(), "api response");
        if !status.is_success() {
            warn!(status = %status, body = %text.chars().take(200).collect::<String>(), "API returned error");
            // Error bodies usually still carry the envelope message.
            let message = serde_json::from_str::<ApiResult<serde_json::Value>>(&text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(format!("API error {}: {}", status, message));
        }
        parse_envelope(&text)
    }
}

pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, String> {
    let envelope: ApiResult<T> = serde_json::from_str(body)
        .map_err(|e| format!("Failed to parse API response: {}", e))?;
    envelope.into_data()
}
