use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use transit_billing::BillingError;
use transit_core::HttpError;
use transit_db::DbError;
use transit_selector::SelectorError;
use transit_store::StoreError;
use transit_upstream::UpstreamError;

/// API-facing error taxonomy, one variant per HTTP outcome
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, missing field, or unknown model
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Missing, unknown, or inactive API key
    #[error("invalid API key")]
    Unauthorized,

    /// Balance precheck or pre-deduction failed
    #[error("insufficient balance")]
    PaymentRequired,

    /// Task lookup miss
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No active channel, or every channel at capacity
    #[error("no available channels")]
    ServiceUnavailable,

    /// The provider rejected the call or could not be reached
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Store or repository failure, or any unexpected condition
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::Unauthorized => "authentication_error",
            Self::PaymentRequired => "insufficient_balance_error",
            Self::NotFound(_) => "not_found_error",
            Self::ServiceUnavailable => "service_unavailable_error",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Internal details stay in the logs
            Self::Internal(_) => "internal error".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Error envelope compatible with the OpenAI wire format
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: ErrorDetails {
                message: self.client_message(),
                r#type: self.error_type().to_owned(),
                code: status.as_u16(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SelectorError> for ApiError {
    fn from(e: SelectorError) -> Self {
        match e {
            SelectorError::NoActiveChannels | SelectorError::AllAtCapacity => Self::ServiceUnavailable,
            SelectorError::Repository(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::InsufficientBalance => Self::PaymentRequired,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}
