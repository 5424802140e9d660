//! Twitch credential lifecycle management and PubSub connection supervision.
//!
//! This crate owns two pieces of a Twitch client that have real concurrency
//! requirements: the OAuth token lifecycle (acquire, validate, refresh,
//! revoke, with single-flight refreshes and persistence on every mutation)
//! and the supervisor that keeps per-channel push connections converged with
//! credential validity and the platform activation flag.
//!
//! ## Core Types
//!
//! - [`TwitchAuthService`] - Token lifecycle manager for one platform
//! - [`TwitchCredentials`] - The persisted credential record
//! - [`CredentialStore`] - Persistence boundary ([`FileCredentialStore`] for JSON files)
//! - [`OAuthProvider`] - OAuth endpoint boundary ([`TwitchOAuth`] for id.twitch.tv)
//! - [`PubSubSupervisor`] - Keeps per-channel agents in sync with credential state
//! - [`PubSubAgent`] / [`AgentFactory`] - One live push connection per channel
//!
//! ## Wiring
//!
//! ```no_run
//! # async fn wire() -> twitch_core::Result<()> {
//! use std::sync::Arc;
//! use twitch_core::{
//!     FileCredentialStore, PlatformActivationState, PlatformType, TwitchAuthService,
//!     TwitchOAuth, TwitchOAuthConfig,
//! };
//!
//! let oauth = Arc::new(TwitchOAuth::new(TwitchOAuthConfig::new("client-id", "secret")));
//! let store = Arc::new(FileCredentialStore::new("./data"));
//! let auth = Arc::new(TwitchAuthService::load(oauth, store).await?);
//! auth.initialize().await;
//!
//! let activation = Arc::new(PlatformActivationState::new());
//! activation.set_active(PlatformType::Twitch, true);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod credentials;
pub mod error;
pub mod platform;
pub mod pubsub;

pub use auth::{
    AuthorizationResponse, CredentialsChanged, LoggedInUser, OAuthProvider,
    TWITCH_AUTHORIZATION_SCOPES, TwitchAuthService, TwitchOAuth, TwitchOAuthConfig,
    ValidationResponse,
};
pub use credentials::{
    CredentialStore, FileCredentialStore, TOKEN_EXPIRY_SKEW_MINUTES, TwitchCredentials,
};
pub use error::{Result, TwitchCoreError};
pub use platform::{ActiveStateManager, PlatformActivationState, PlatformType};
pub use pubsub::{AgentFactory, ChannelSource, PubSubAgent, PubSubSupervisor};
