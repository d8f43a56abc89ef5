use http::StatusCode;

/// Trait for domain errors that can be surfaced as HTTP responses
///
/// Each feature crate keeps its own error enum; the server layer turns
/// them into wire responses through this trait, so domain crates never
/// depend on axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}
