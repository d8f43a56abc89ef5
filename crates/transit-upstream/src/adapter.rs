use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, DataEnvelope, ErrorEnvelope,
    ImageGenerationRequest, Submission, SubmissionData, TaskStatusResponse, VideoGenerationRequest,
};

/// Per-request deadline for upstream calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Typed client for one channel's upstream account
///
/// Instantiated per `(base_url, secret_key)` pair; connection pooling
/// stays inside reqwest.
pub struct UpstreamAdapter {
    http: reqwest::Client,
    base_url: String,
    secret_key: SecretString,
}

impl UpstreamAdapter {
    pub fn new(base_url: &str, secret_key: SecretString) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UpstreamError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            secret_key,
        })
    }

    /// Synchronous chat completion
    pub async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, UpstreamError> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "forwarding chat completion");
        self.post_json("/v1/chat/completions", request).await
    }

    /// Submit an image generation job; returns the provider's task handle
    pub async fn submit_image(&self, request: &ImageGenerationRequest) -> Result<Submission, UpstreamError> {
        tracing::debug!(model = %request.model, "submitting image generation");
        let envelope: DataEnvelope<SubmissionData> =
            self.post_json("/v1/images/generations", request).await?;
        Ok(Submission {
            task_id: envelope.data.task_id,
            status: envelope.data.status,
        })
    }

    /// Submit a video generation job; returns the provider's task handle
    pub async fn submit_video(&self, request: &VideoGenerationRequest) -> Result<Submission, UpstreamError> {
        tracing::debug!(model = %request.model, "submitting video generation");
        let envelope: DataEnvelope<SubmissionData> =
            self.post_json("/v1/videos/generations", request).await?;
        Ok(Submission {
            task_id: envelope.data.task_id,
            status: envelope.data.status,
        })
    }

    /// Query the status of a previously submitted job
    pub async fn task_status(&self, upstream_task_id: &str) -> Result<TaskStatusResponse, UpstreamError> {
        let response = self
            .http
            .get(format!("{}/v1/tasks/{upstream_task_id}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.secret_key.expose_secret()))
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, UpstreamError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.secret_key.expose_secret()))
            .json(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, UpstreamError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for UpstreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
