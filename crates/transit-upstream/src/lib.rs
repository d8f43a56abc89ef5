#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod adapter;
mod error;
mod types;

pub use adapter::UpstreamAdapter;
pub use error::UpstreamError;
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ImageGenerationRequest, Submission,
    TaskError, TaskResult, TaskStatusResponse, Usage, UpstreamStatus, VideoGenerationRequest,
};
