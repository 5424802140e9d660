//! Persisted credential record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long before the provider's actual expiry a token is already treated as
/// stale. Forces a proactive refresh instead of using a token that could
/// expire mid-request.
pub const TOKEN_EXPIRY_SKEW_MINUTES: i64 = 5;

/// Per-platform credential record, persisted as-is by a [`CredentialStore`].
///
/// Access and refresh token are either both present or both absent; a partial
/// record is meaningless and gets downgraded to "no tokens" by
/// [`TwitchCredentials::normalize`].
///
/// [`CredentialStore`]: super::store::CredentialStore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitchCredentials {
    /// Short-lived bearer token used to authenticate API calls.
    pub access_token: Option<String>,
    /// Longer-lived token exchanged for a new access token; rotates on use.
    pub refresh_token: Option<String>,
    /// Instant after which the access token is no longer accepted.
    pub valid_until: Option<DateTime<Utc>>,
}

impl TwitchCredentials {
    /// True iff both the access and the refresh token are present.
    pub fn has_tokens(&self) -> bool {
        fn present(token: &Option<String>) -> bool {
            token.as_deref().is_some_and(|t| !t.trim().is_empty())
        }

        present(&self.access_token) && present(&self.refresh_token)
    }

    /// True iff the access token has more than the skew window left before
    /// expiry. False when no expiry is known.
    pub fn is_valid(&self) -> bool {
        self.valid_until
            .is_some_and(|until| until > Utc::now() + Duration::minutes(TOKEN_EXPIRY_SKEW_MINUTES))
    }

    /// Enforce the both-or-neither token invariant, dropping a partial record.
    pub fn normalize(&mut self) {
        if !self.has_tokens() && (self.access_token.is_some() || self.refresh_token.is_some()) {
            self.clear();
        }
    }

    /// Drop all fields.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.valid_until = None;
    }
}
