use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chat completion request forwarded to the provider
///
/// Unknown fields the client sent ride along in `extra`, so the relay
/// does not strip provider options it does not know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user`, or `assistant`
    pub role: String,
    pub content: String,
}

/// Chat completion response passed back to the client verbatim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Value>,
    pub usage: Usage,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Clip length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// Accepted async submission, normalized out of the provider's
/// `{code, data: {...}}` envelope
#[derive(Debug, Clone)]
pub struct Submission {
    /// The provider's identifier for the job
    pub task_id: String,
    /// Status string as the provider reported it (e.g. `submitted`)
    pub status: String,
}

/// Job status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    /// Any status string this relay does not know
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(rename = "id")]
    pub task_id: String,
    pub status: UpstreamStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub result: TaskResult,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
}

impl TaskResult {
    /// First produced artifact, images before videos
    pub fn first_url(&self) -> Option<&str> {
        self.images
            .first()
            .or_else(|| self.videos.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Provider error body: `{"error": {"message": ...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
}

/// Provider wrapper around async submissions
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[allow(dead_code)]
    pub code: i64,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionData {
    pub task_id: String,
    pub status: String,
}
