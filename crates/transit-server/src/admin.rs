//! Admin surface: channel management, recharges, and the concurrency
//! monitor. Everything here sits behind the shared `X-Admin-Token`.

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use transit_billing::BillingError;
use transit_db::Channel;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_MAX_CONCURRENCY: i32 = 200;
const DEFAULT_WEIGHT: i32 = 10;

/// Gate requests on the configured admin token
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok());

    if presented.is_some_and(|t| t == state.admin_token.expose_secret()) {
        next.run(request).await
    } else {
        ApiError::Unauthorized.into_response()
    }
}

/// Channel as exposed to admins: live concurrency joined in, secret
/// key left out
#[derive(Debug, Serialize)]
struct ChannelSummary {
    id: Uuid,
    name: String,
    base_url: String,
    max_concurrency: i32,
    current_concurrency: i64,
    weight: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChannelSummary {
    fn new(channel: &Channel, current_concurrency: i64) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone(),
            base_url: channel.base_url.clone(),
            max_concurrency: channel.max_concurrency,
            current_concurrency,
            weight: channel.weight,
            is_active: channel.is_active,
            created_at: channel.created_at,
            updated_at: channel.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    name: String,
    secret_key: String,
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    max_concurrency: i32,
    #[serde(default)]
    weight: i32,
}

/// `POST /admin/channels`
pub async fn create_channel(
    State(state): State<AppState>,
    Json(request): Json<CreateChannelRequest>,
) -> Result<Response, ApiError> {
    if request.name.is_empty() || request.secret_key.is_empty() {
        return Err(ApiError::BadRequest("name and secret_key are required".to_owned()));
    }
    if request.max_concurrency < 0 || request.weight < 0 {
        return Err(ApiError::BadRequest(
            "max_concurrency and weight must not be negative".to_owned(),
        ));
    }

    let max_concurrency = if request.max_concurrency == 0 {
        DEFAULT_MAX_CONCURRENCY
    } else {
        request.max_concurrency
    };
    let weight = if request.weight == 0 { DEFAULT_WEIGHT } else { request.weight };

    let channel = Channel::new(
        request.name,
        SecretString::from(request.secret_key),
        request.base_url,
        max_concurrency,
        weight,
    );
    state.channels.create(&channel).await?;

    tracing::info!(channel_id = %channel.id, channel_name = %channel.name, "channel created");
    Ok(Json(json!({
        "message": "channel created",
        "channel": ChannelSummary::new(&channel, 0),
    }))
    .into_response())
}

/// `GET /admin/channels`
pub async fn list_channels(State(state): State<AppState>) -> Result<Response, ApiError> {
    let channels = state.channels.list_all().await?;

    let mut summaries = Vec::with_capacity(channels.len());
    for channel in &channels {
        let current = match state.admission.in_flight(channel.id).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(channel_id = %channel.id, error = %e, "failed to read concurrency");
                0
            }
        };
        summaries.push(ChannelSummary::new(channel, current));
    }

    Ok(Json(json!({ "channels": summaries })).into_response())
}

/// `DELETE /admin/channels/{id}`
pub async fn delete_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.channels.delete(id).await?;
    tracing::info!(channel_id = %id, "channel deleted");
    Ok(Json(json!({ "message": "channel deleted" })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    user_id: Uuid,
    amount: f64,
}

/// `POST /admin/recharge`
pub async fn recharge(
    State(state): State<AppState>,
    Json(request): Json<RechargeRequest>,
) -> Result<Response, ApiError> {
    state
        .users
        .find(request.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    match state.billing.recharge(request.user_id, request.amount).await {
        Ok(()) => {
            tracing::info!(user_id = %request.user_id, amount = request.amount, "user recharged");
            Ok(Json(json!({ "message": "recharge successful" })).into_response())
        }
        Err(BillingError::InvalidAmount(_)) => {
            Err(ApiError::BadRequest("amount must be positive".to_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
struct ChannelLoad {
    id: Uuid,
    name: String,
    concurrency: i64,
    max: i32,
    usage: f64,
}

/// `GET /admin/monitor`
///
/// Live concurrency water line across the active channels
pub async fn monitor(State(state): State<AppState>) -> Result<Response, ApiError> {
    let channels = state.channels.list_all().await?;

    let mut total_concurrency = 0i64;
    let mut loads = Vec::new();
    for channel in channels.iter().filter(|c| c.is_active) {
        let concurrency = state.admission.in_flight(channel.id).await.unwrap_or(0);
        total_concurrency += concurrency;

        let usage = if channel.max_concurrency > 0 {
            concurrency as f64 / f64::from(channel.max_concurrency) * 100.0
        } else {
            0.0
        };
        loads.push(ChannelLoad {
            id: channel.id,
            name: channel.name.clone(),
            concurrency,
            max: channel.max_concurrency,
            usage,
        });
    }

    Ok(Json(json!({
        "total_concurrency": total_concurrency,
        "channels": loads,
        "status": "healthy",
    }))
    .into_response())
}
