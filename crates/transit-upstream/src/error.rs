/// Errors from one upstream call
///
/// No retries happen at this layer; callers decide whether to
/// compensate or surface.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Provider responded non-2xx
    #[error("upstream API error ({status}): {message}")]
    Api {
        /// HTTP status from the provider
        status: u16,
        /// Message from the provider's error envelope, or the raw body
        message: String,
    },

    /// Network failure or deadline exceeded
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// 2xx response whose body did not match the expected shape
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}
