//! Twitch OAuth token lifecycle.

mod models;
mod provider;
mod service;

pub use models::{AuthorizationResponse, LoggedInUser, ValidationResponse};
pub use provider::{OAuthProvider, TWITCH_AUTHORIZATION_SCOPES, TwitchOAuth, TwitchOAuthConfig};
pub use service::{CredentialsChanged, TwitchAuthService};
