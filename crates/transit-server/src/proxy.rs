//! User-facing proxy pipelines
//!
//! Sync chat runs a single round trip: advisory balance precheck,
//! channel admission, upstream call, metered post-deduction, release.
//! Async generation reserves funds first and hands its slot to the
//! poller on success; every failure before the task row exists
//! compensates what was already taken.

use std::future::Future;

use axum::extract::{Extension, Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use transit_config::{ModelConfig, ModelKind};
use transit_core::AuthedUser;
use transit_db::Task;
use transit_selector::ChannelLease;
use transit_upstream::{
    ChatCompletionRequest, ImageGenerationRequest, Submission, UpstreamAdapter,
    VideoGenerationRequest,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/v1/chat/completions`
pub async fn chat_completions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(mut request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let model = resolve_model(&state, &request.model, ModelKind::Sync)?;

    // Advisory precheck against a rough upper bound of 1000 tokens
    // each way; nothing is held
    let estimate =
        1000.0 * (model.price_per_1k_input_tokens + model.price_per_1k_output_tokens) / 1000.0;
    let balance = state.billing.balance(user.user_id).await?;
    if balance < estimate {
        return Err(ApiError::PaymentRequired);
    }

    let lease = state.selector.select().await?;
    let adapter = match build_adapter(&lease) {
        Ok(adapter) => adapter,
        Err(e) => {
            lease.release().await;
            return Err(e);
        }
    };

    request.model = model.upstream_name.clone();
    let response = match adapter.chat(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(channel_id = %lease.channel().id, error = %e, "upstream chat request failed");
            lease.release().await;
            return Err(e.into());
        }
    };

    // The response already cost the upstream tokens; a billing failure
    // here is logged rather than turned into a client error
    match state
        .billing
        .post_deduct(
            user.user_id,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            model.price_per_1k_input_tokens,
            model.price_per_1k_output_tokens,
        )
        .await
    {
        Ok(cost) => {
            tracing::info!(
                user_id = %user.user_id,
                model = %model.name,
                total_tokens = response.usage.total_tokens,
                cost,
                "chat completion served"
            );
        }
        Err(e) => {
            tracing::error!(user_id = %user.user_id, error = %e, "post-deduction failed");
        }
    }

    lease.release().await;
    Ok(Json(response).into_response())
}

/// Response to an accepted generation submission
#[derive(Debug, Serialize)]
struct SubmissionAccepted {
    /// Task identifier in this relay's namespace
    task_id: Uuid,
    /// Status as the provider reported it
    status: String,
}

/// `POST /api/v1/images/generations`
pub async fn image_generation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(mut request): Json<ImageGenerationRequest>,
) -> Result<Response, ApiError> {
    let model = resolve_model(&state, &request.model, ModelKind::Async)?;
    let model_name = request.model.clone();
    request.model = model.upstream_name.clone();

    submit_generation(&state, user, model, model_name, |adapter| async move {
        adapter.submit_image(&request).await
    })
    .await
}

/// `POST /api/v1/videos/generations`
pub async fn video_generation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(mut request): Json<VideoGenerationRequest>,
) -> Result<Response, ApiError> {
    let model = resolve_model(&state, &request.model, ModelKind::Async)?;
    let model_name = request.model.clone();
    request.model = model.upstream_name.clone();

    submit_generation(&state, user, model, model_name, |adapter| async move {
        adapter.submit_video(&request).await
    })
    .await
}

/// Shared async-submission pipeline: pre-deduct, admit, submit,
/// persist; compensating at each step for what the previous ones took
async fn submit_generation<F, Fut>(
    state: &AppState,
    user: AuthedUser,
    model: ModelConfig,
    model_name: String,
    submit: F,
) -> Result<Response, ApiError>
where
    F: FnOnce(UpstreamAdapter) -> Fut,
    Fut: Future<Output = Result<Submission, transit_upstream::UpstreamError>>,
{
    let cost = model.price_per_generation;
    state.billing.pre_deduct(user.user_id, cost).await?;

    let lease = match state.selector.select().await {
        Ok(lease) => lease,
        Err(e) => {
            refund(state, user.user_id, cost).await;
            return Err(e.into());
        }
    };

    let adapter = match build_adapter(&lease) {
        Ok(adapter) => adapter,
        Err(e) => {
            refund(state, user.user_id, cost).await;
            lease.release().await;
            return Err(e);
        }
    };

    let submission = match submit(adapter).await {
        Ok(submission) => submission,
        Err(e) => {
            tracing::error!(channel_id = %lease.channel().id, error = %e, "upstream submission failed");
            refund(state, user.user_id, cost).await;
            lease.release().await;
            return Err(e.into());
        }
    };

    // From here the slot belongs to the poller: it is released when the
    // task reaches a terminal state
    let channel = lease.keep();
    let task = Task::submitted(
        user.user_id,
        channel.id,
        model_name,
        submission.task_id.clone(),
        cost,
    );

    if let Err(e) = state.tasks.create(&task).await {
        // The upstream job is live but invisible to the poller: no
        // task row means no reconciliation, so the funds and slot stay
        // held rather than compensating a job that may still finish
        tracing::error!(
            user_id = %user.user_id,
            upstream_task_id = %submission.task_id,
            error = %e,
            "task persistence failed after upstream submission; job orphaned upstream"
        );
        return Err(e.into());
    }

    tracing::info!(
        user_id = %user.user_id,
        task_id = %task.id,
        upstream_task_id = %submission.task_id,
        channel_id = %channel.id,
        "generation submitted"
    );

    Ok(Json(SubmissionAccepted {
        task_id: task.id,
        status: submission.status,
    })
    .into_response())
}

/// `GET /api/v1/tasks/{task_id}`
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let task = state
        .tasks
        .find(task_id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    Ok(Json(task).into_response())
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    balance: f64,
}

/// `GET /api/v1/balance`
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Response, ApiError> {
    let balance = state.billing.balance(user.user_id).await?;
    Ok(Json(BalanceResponse { balance }).into_response())
}

/// Look up a model and check it is usable for this pipeline
fn resolve_model(state: &AppState, name: &str, kind: ModelKind) -> Result<ModelConfig, ApiError> {
    if name.is_empty() {
        return Err(ApiError::BadRequest("model is required".to_owned()));
    }

    let model = state
        .models
        .find(name)
        .ok_or_else(|| ApiError::BadRequest(format!("unsupported model: {name}")))?;

    if model.kind != kind {
        let expected = match kind {
            ModelKind::Sync => "chat",
            ModelKind::Async => "generation",
        };
        return Err(ApiError::BadRequest(format!(
            "model {name} cannot be used for {expected} requests"
        )));
    }

    Ok(model.clone())
}

fn build_adapter(lease: &ChannelLease) -> Result<UpstreamAdapter, ApiError> {
    let channel = lease.channel();
    UpstreamAdapter::new(&channel.base_url, channel.secret_key.clone()).map_err(ApiError::from)
}

/// Compensating refund; a failure here is logged, not surfaced, since
/// the caller is already on an error path
async fn refund(state: &AppState, user_id: Uuid, amount: f64) {
    if let Err(e) = state.billing.refund(user_id, amount).await {
        tracing::error!(%user_id, amount, error = %e, "compensating refund failed");
    }
}
