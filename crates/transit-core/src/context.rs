use uuid::Uuid;

/// Authenticated caller resolved from an API key
///
/// Inserted into request extensions by the auth middleware and read by
/// every user-facing handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthedUser {
    /// Owner of the API key
    pub user_id: Uuid,
    /// The key record that authenticated this request
    pub api_key_id: Uuid,
}
