//! Twitch token lifecycle manager.
//!
//! Owns the in-memory credential record for the Twitch platform, serializes
//! refreshes, persists every committed mutation and broadcasts a notification
//! whenever the usable-credentials status flips.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, TwitchCredentials};
use crate::error::Result;
use crate::platform::PlatformType;

use super::models::{AuthorizationResponse, LoggedInUser};
use super::provider::OAuthProvider;

/// Notification that the usable-credentials status changed.
///
/// Carries no payload on purpose; subscribers re-read the queries they care
/// about, which is guaranteed to reflect the mutation that triggered the
/// notification (the record is persisted before the event is published).
#[derive(Debug, Clone, Copy)]
pub struct CredentialsChanged;

/// In-memory credential state. Mutated only through
/// [`TwitchAuthService::commit`] so readers never see a half-updated record.
#[derive(Debug, Default)]
struct AuthState {
    credentials: TwitchCredentials,
    logged_in_user: Option<LoggedInUser>,
}

/// Outcome of the last completed refresh, shared with callers that arrived
/// while it was in flight.
struct RefreshSlot {
    generation: u64,
    last_result: bool,
}

/// Token lifecycle manager for the Twitch platform.
///
/// One explicitly constructed instance owns the platform's credential record;
/// there is no ambient shared state. Collaborators hold it behind an [`Arc`].
pub struct TwitchAuthService {
    provider: Arc<dyn OAuthProvider>,
    store: Arc<dyn CredentialStore>,
    state: RwLock<AuthState>,
    /// Serializes commit + persist + notify so the notification order matches
    /// the persistence order. Holds the last notified status.
    commit_lock: Mutex<bool>,
    /// Single-flight guard for refreshes.
    refresh_lock: Mutex<RefreshSlot>,
    refresh_generation: AtomicU64,
    events: broadcast::Sender<CredentialsChanged>,
}

impl TwitchAuthService {
    /// Load the persisted credential record and construct the service.
    pub async fn load(
        provider: Arc<dyn OAuthProvider>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let mut credentials = store.load(PlatformType::Twitch).await?;
        credentials.normalize();

        let initial_status = credentials.has_tokens();
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            provider,
            store,
            state: RwLock::new(AuthState {
                credentials,
                logged_in_user: None,
            }),
            commit_lock: Mutex::new(initial_status),
            refresh_lock: Mutex::new(RefreshSlot {
                generation: 0,
                last_result: false,
            }),
            refresh_generation: AtomicU64::new(0),
            events,
        })
    }

    // ========== Read-only queries ==========

    /// True iff both access and refresh token are present.
    pub fn has_tokens(&self) -> bool {
        self.state.read().credentials.has_tokens()
    }

    /// True iff the access token has more than the skew window left.
    pub fn token_is_valid(&self) -> bool {
        self.state.read().credentials.is_valid()
    }

    /// Current access token, for API calls made on the user's behalf.
    pub fn access_token(&self) -> Option<String> {
        self.state.read().credentials.access_token.clone()
    }

    /// The user the access token belongs to, per the latest validation.
    pub fn logged_in_user(&self) -> Option<LoggedInUser> {
        self.state.read().logged_in_user.clone()
    }

    /// Authorization-code flow URL the user must be sent to.
    pub fn authorization_url(&self, redirect_url: &str) -> String {
        self.provider.authorization_url(redirect_url)
    }

    /// Subscribe to usable-credentials status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<CredentialsChanged> {
        self.events.subscribe()
    }

    // ========== Lifecycle operations ==========

    /// Validate stored credentials on startup and refresh them when stale.
    ///
    /// A no-op when no tokens are stored; the authorization-code flow has to
    /// be driven externally in that case.
    pub async fn initialize(&self) {
        info!("validating stored twitch credentials");

        if !self.has_tokens() {
            warn!("no twitch credentials present");
            return;
        }

        let validated = self.validate_access_token(false).await;
        info!(
            is_valid = validated.is_some() && self.token_is_valid(),
            "validated stored token"
        );

        if validated.is_none() || !self.token_is_valid() {
            info!("stored token is stale, refreshing");
            self.refresh_tokens().await;
        }
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// On success the pair is stored atomically and immediately re-validated
    /// to populate the logged-in user; the raw exchange response is returned.
    /// On failure nothing changes and `None` is returned.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_url: &str,
    ) -> Option<AuthorizationResponse> {
        let response = match self.provider.exchange_code(code, redirect_url).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                warn!("authorization code exchange returned no body");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "authorization code exchange failed");
                return None;
            }
        };

        self.store_token_pair(&response).await;
        self.validate_access_token(true).await;

        Some(response)
    }

    /// Validate the current access token.
    ///
    /// On failure with `reset_on_failure` the whole record is cleared (hard
    /// logout); without it the state is left untouched so the caller can
    /// distinguish "stale" from "gone".
    pub async fn validate_access_token(&self, reset_on_failure: bool) -> Option<LoggedInUser> {
        let access_token = self.access_token()?;

        match self.provider.validate_token(&access_token).await {
            Ok(validation) => {
                let user = LoggedInUser::from(validation);
                let valid_until = Utc::now() + Duration::seconds(user.expires_in as i64);
                let stored = user.clone();
                self.commit(move |state| {
                    state.logged_in_user = Some(stored);
                    state.credentials.valid_until = Some(valid_until);
                })
                .await;
                Some(user)
            }
            Err(e) if reset_on_failure => {
                warn!(error = %e, "access token validation failed, clearing credentials");
                self.clear_credentials().await;
                None
            }
            Err(e) => {
                debug!(error = %e, "access token validation failed");
                None
            }
        }
    }

    /// Refresh the token pair.
    ///
    /// Single-flight: at most one refresh network call is outstanding per
    /// instance. Callers that arrive while one is in flight wait for it and
    /// adopt its result instead of resubmitting, since Twitch rotates the
    /// refresh token on use and a duplicate call would race the rotation.
    pub async fn refresh_tokens(&self) -> bool {
        let observed = self.refresh_generation.load(Ordering::Acquire);
        let mut slot = self.refresh_lock.lock().await;
        if slot.generation != observed {
            // A refresh completed while we were waiting for the lock.
            debug!(result = slot.last_result, "adopting result of concurrent refresh");
            return slot.last_result;
        }

        let Some(refresh_token) = self.state.read().credentials.refresh_token.clone() else {
            return false;
        };

        // Re-checked under the lock: the token may have just been refreshed.
        if self.token_is_valid() {
            return true;
        }

        let result = self.do_refresh(&refresh_token).await;
        slot.generation += 1;
        slot.last_result = result;
        self.refresh_generation
            .store(slot.generation, Ordering::Release);
        result
    }

    async fn do_refresh(&self, refresh_token: &str) -> bool {
        match self.provider.refresh_token(refresh_token).await {
            Ok(Some(response)) => {
                info!("token refresh succeeded");
                self.store_token_pair(&response).await;
                self.validate_access_token(true).await.is_some()
            }
            Ok(None) => {
                // The provider accepted the call but returned nothing: the
                // refresh token itself is no longer usable.
                warn!("refresh token no longer usable, clearing credentials");
                self.clear_credentials().await;
                false
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                false
            }
        }
    }

    /// Revoke the refresh token and discard all credential state.
    ///
    /// Remote revocation is best-effort; local state is cleared and persisted
    /// even when the call fails. Returns whether the remote call succeeded.
    pub async fn revoke_tokens(&self) -> bool {
        let Some(refresh_token) = self.state.read().credentials.refresh_token.clone() else {
            return false;
        };

        let revoked = match self.provider.revoke_token(&refresh_token).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "remote token revocation failed");
                false
            }
        };

        self.clear_credentials().await;
        info!(revoked, "twitch credentials discarded");
        revoked
    }

    // ========== Transactional mutation ==========

    /// Apply a mutation, persist the record and publish a notification when
    /// the usable-credentials status flipped.
    ///
    /// Commits are serialized, persistence runs on every path, and the
    /// notification is only published after persistence completed, so a
    /// subscriber's re-read observes the committed record.
    async fn commit<F>(&self, mutate: F)
    where
        F: FnOnce(&mut AuthState),
    {
        let mut last_notified = self.commit_lock.lock().await;

        let snapshot = {
            let mut state = self.state.write();
            mutate(&mut state);
            state.credentials.clone()
        };

        if let Err(e) = self.store.save(PlatformType::Twitch, &snapshot).await {
            warn!(error = %e, "failed to persist credentials");
        }

        let status = snapshot.has_tokens();
        if status != *last_notified {
            *last_notified = status;
            debug!(has_tokens = status, "credentials status changed");
            let _ = self.events.send(CredentialsChanged);
        }
    }

    async fn store_token_pair(&self, response: &AuthorizationResponse) {
        let access_token = response.access_token.clone();
        let refresh_token = response.refresh_token.clone();
        let valid_until = Utc::now() + Duration::seconds(response.expires_in as i64);
        self.commit(move |state| {
            state.credentials.access_token = Some(access_token);
            state.credentials.refresh_token = Some(refresh_token);
            state.credentials.valid_until = Some(valid_until);
        })
        .await;
    }

    async fn clear_credentials(&self) {
        self.commit(|state| {
            state.credentials.clear();
            state.logged_in_user = None;
        })
        .await;
    }
}
