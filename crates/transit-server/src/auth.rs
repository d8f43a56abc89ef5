use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use transit_core::AuthedUser;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticate requests via user API key
///
/// Extracts the bearer token from the Authorization header and resolves
/// it against the key repository, with a short TTL cache in front so
/// hot keys skip the lookup. Inactive keys are rejected the same way as
/// unknown ones.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return ApiError::Unauthorized.into_response();
    };

    if let Some(user) = state.key_cache.get(&token.to_owned()) {
        request.extensions_mut().insert(user);
        return next.run(request).await;
    }

    let key = match state.api_keys.find_by_key(token).await {
        Ok(Some(key)) => key,
        Ok(None) => {
            tracing::warn!("unknown API key");
            return ApiError::Unauthorized.into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "API key lookup failed");
            return ApiError::Internal(e.to_string()).into_response();
        }
    };

    if !key.is_active {
        tracing::warn!(api_key_id = %key.id, "inactive API key");
        return ApiError::Unauthorized.into_response();
    }

    let user = AuthedUser {
        user_id: key.user_id,
        api_key_id: key.id,
    };
    state.key_cache.insert(token.to_owned(), user);

    tracing::debug!(user_id = %user.user_id, "user authenticated");
    request.extensions_mut().insert(user);
    next.run(request).await
}
