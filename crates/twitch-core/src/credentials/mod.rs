//! Credential record and persistence.

mod store;
mod types;

pub use store::{CredentialStore, FileCredentialStore};
pub use types::{TOKEN_EXPIRY_SKEW_MINUTES, TwitchCredentials};
