//! OAuth provider boundary and the Twitch implementation.
//!
//! Network timeouts are the HTTP client's responsibility; nothing here blocks
//! beyond the configured request timeout.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;

use super::models::{AuthorizationResponse, ValidationResponse};

/// Install the process-wide rustls `CryptoProvider` once. The TLS backend is
/// built without a default provider, so client construction requires this.
fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

const TWITCH_AUTH_BASE_URL: &str = "https://id.twitch.tv/oauth2/";

/// Scopes requested during the authorization-code flow.
pub const TWITCH_AUTHORIZATION_SCOPES: &[&str] = &[
    "channel:moderate",
    "chat:edit",
    "chat:read",
    "whispers:read",
    "whispers:edit",
    "bits:read",
    "channel:manage:broadcast",
    "channel:read:redemptions",
    "channel:read:subscriptions",
];

/// OAuth operations the token lifecycle manager depends on.
///
/// `refresh_token` distinguishes a transport/HTTP failure (`Err`, transient,
/// no conclusion about the refresh token) from a 2xx response with an empty
/// body (`Ok(None)`, the provider signals the refresh token itself is dead).
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Authorization-code flow URL the user must be sent to.
    fn authorization_url(&self, redirect_url: &str) -> String;

    /// Exchange an authorization code for a token pair.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_url: &str,
    ) -> Result<Option<AuthorizationResponse>>;

    /// Exchange a refresh token for a rotated token pair.
    async fn refresh_token(&self, refresh_token: &str) -> Result<Option<AuthorizationResponse>>;

    /// Validate an access token, returning who it belongs to.
    async fn validate_token(&self, access_token: &str) -> Result<ValidationResponse>;

    /// Revoke a refresh token on the provider side.
    async fn revoke_token(&self, refresh_token: &str) -> Result<()>;
}

/// Static configuration for the Twitch OAuth client.
#[derive(Debug, Clone)]
pub struct TwitchOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl TwitchOAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// [`OAuthProvider`] talking to `id.twitch.tv`.
pub struct TwitchOAuth {
    config: TwitchOAuthConfig,
    client: Client,
}

impl TwitchOAuth {
    /// Create a client with a default user agent and request timeout.
    pub fn new(config: TwitchOAuthConfig) -> Self {
        install_rustls_provider();

        let client = Client::builder()
            .user_agent(concat!("twitch-core/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|error| {
                warn!(
                    error = %error,
                    "Failed to create HTTP client; falling back to reqwest defaults"
                );
                Client::new()
            });
        Self::with_client(config, client)
    }

    /// Create a client reusing an existing HTTP client (connection pooling,
    /// custom timeouts).
    pub fn with_client(config: TwitchOAuthConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn post_token_grant(&self, params: &[(&str, &str)]) -> Result<Option<AuthorizationResponse>> {
        let response = self
            .client
            .post(format!("{TWITCH_AUTH_BASE_URL}token"))
            .query(params)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        decode_token_body(&body)
    }
}

/// Decode a 2xx token grant body. An empty or `null` body is the provider's
/// terminal-invalidation signal, not a decode error.
fn decode_token_body(body: &str) -> Result<Option<AuthorizationResponse>> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str::<Option<AuthorizationResponse>>(body)?)
}

#[async_trait]
impl OAuthProvider for TwitchOAuth {
    fn authorization_url(&self, redirect_url: &str) -> String {
        format!(
            "{TWITCH_AUTH_BASE_URL}authorize\
             ?client_id={}\
             &redirect_uri={}\
             &response_type=code\
             &force_verify=true\
             &scope={}",
            self.config.client_id,
            urlencoding::encode(redirect_url),
            urlencoding::encode(&TWITCH_AUTHORIZATION_SCOPES.join(" ")),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_url: &str,
    ) -> Result<Option<AuthorizationResponse>> {
        debug!("exchanging authorization code");
        self.post_token_grant(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_url),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<Option<AuthorizationResponse>> {
        debug!("exchanging refresh token");
        self.post_token_grant(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn validate_token(&self, access_token: &str) -> Result<ValidationResponse> {
        let response = self
            .client
            .get(format!("{TWITCH_AUTH_BASE_URL}validate"))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<()> {
        self.client
            .post(format!("{TWITCH_AUTH_BASE_URL}revoke"))
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("token", refresh_token),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
