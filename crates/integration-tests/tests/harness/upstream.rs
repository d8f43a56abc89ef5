//! Wiremock helpers shaping the upstream provider's responses

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Chat completion returning the given usage split
pub async fn mock_chat(server: &MockServer, prompt_tokens: u32, completion_tokens: u32) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-test",
            "model": "provider-m",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello back"}}],
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": completion_tokens,
                "total_tokens": prompt_tokens + completion_tokens
            }
        })))
        .mount(server)
        .await;
}

/// Chat endpoint that always fails with the provider error envelope
pub async fn mock_chat_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": {"message": "provider exploded", "type": "server_error", "code": "boom"}
        })))
        .mount(server)
        .await;
}

/// Image submission accepted with the given upstream task id
pub async fn mock_image_submission(server: &MockServer, upstream_task_id: &str) {
    submission(server, "/v1/images/generations", upstream_task_id).await;
}

/// Video submission accepted with the given upstream task id
pub async fn mock_video_submission(server: &MockServer, upstream_task_id: &str) {
    submission(server, "/v1/videos/generations", upstream_task_id).await;
}

async fn submission(server: &MockServer, endpoint: &str, upstream_task_id: &str) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": {"status": "submitted", "task_id": upstream_task_id}
        })))
        .mount(server)
        .await;
}

/// Submission endpoint that rejects every job
pub async fn mock_submission_failure(server: &MockServer, endpoint_path: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(endpoint_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": {"message": "no capacity", "type": "server_error", "code": "overloaded"}
        })))
        .mount(server)
        .await;
}

/// Status query for one upstream task
pub async fn mock_task_status(server: &MockServer, upstream_task_id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/tasks/{upstream_task_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
