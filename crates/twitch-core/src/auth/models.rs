//! OAuth response models.

use serde::{Deserialize, Serialize};

/// Token endpoint response for both the authorization-code and the
/// refresh-token grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// New access token.
    pub access_token: String,
    /// New refresh token; Twitch rotates this on every refresh.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

/// Validate endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Login name of the token's user.
    pub login: String,
    /// Numeric user id as a string.
    pub user_id: String,
    /// Scopes the token was granted.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Remaining token lifetime in seconds at validation time.
    pub expires_in: u64,
}

/// The user the current access token belongs to.
///
/// Derived from the latest successful validation call and cleared whenever
/// credentials are invalidated. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedInUser {
    pub user_id: String,
    pub display_name: String,
    pub scopes: Vec<String>,
    /// Remaining token lifetime in seconds at validation time.
    pub expires_in: u64,
}

impl From<ValidationResponse> for LoggedInUser {
    fn from(response: ValidationResponse) -> Self {
        Self {
            user_id: response.user_id,
            display_name: response.login,
            scopes: response.scopes,
            expires_in: response.expires_in,
        }
    }
}
