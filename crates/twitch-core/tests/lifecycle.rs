//! End-to-end credential and connection lifecycle.
//!
//! Drives the auth service and the supervisor together through login,
//! credential loss and re-login, with a scripted OAuth provider and
//! file-backed persistence.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use twitch_core::{
    AgentFactory, AuthorizationResponse, ChannelSource, FileCredentialStore,
    PlatformActivationState, PlatformType, PubSubAgent, PubSubSupervisor, Result,
    TwitchAuthService, TwitchCoreError, TwitchCredentials, ValidationResponse,
};

struct ScriptedOAuth {
    refresh_calls: AtomicUsize,
    grant_counter: AtomicUsize,
}

impl ScriptedOAuth {
    fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            grant_counter: AtomicUsize::new(0),
        }
    }

    fn grant(&self) -> AuthorizationResponse {
        let n = self.grant_counter.fetch_add(1, Ordering::SeqCst);
        AuthorizationResponse {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            expires_in: 14400,
            token_type: Some("bearer".to_string()),
            scope: vec![],
        }
    }
}

#[async_trait]
impl twitch_core::OAuthProvider for ScriptedOAuth {
    fn authorization_url(&self, _redirect_url: &str) -> String {
        "https://id.twitch.tv/oauth2/authorize?client_id=test".to_string()
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _redirect_url: &str,
    ) -> Result<Option<AuthorizationResponse>> {
        Ok(Some(self.grant()))
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<Option<AuthorizationResponse>> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.grant()))
    }

    async fn validate_token(&self, access_token: &str) -> Result<ValidationResponse> {
        if access_token.starts_with("access-") {
            Ok(ValidationResponse {
                client_id: None,
                login: "testuser".to_string(),
                user_id: "141981764".to_string(),
                scopes: vec!["chat:read".to_string()],
                expires_in: 14400,
            })
        } else {
            Err(TwitchCoreError::other("unknown token"))
        }
    }

    async fn revoke_token(&self, _refresh_token: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct AgentLedger {
    running: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

struct LedgerAgent {
    running: Arc<AtomicBool>,
}

#[async_trait]
impl PubSubAgent for LedgerAgent {
    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl AgentFactory for AgentLedger {
    fn create(&self, channel_id: &str) -> Box<dyn PubSubAgent> {
        let running = Arc::new(AtomicBool::new(false));
        self.running
            .lock()
            .insert(channel_id.to_string(), running.clone());
        Box::new(LedgerAgent { running })
    }
}

impl AgentLedger {
    fn running_channels(&self) -> Vec<String> {
        self.running
            .lock()
            .iter()
            .filter(|(_, flag)| flag.load(Ordering::SeqCst))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

struct StaticChannels(Vec<String>);

impl ChannelSource for StaticChannels {
    fn all_active_channel_ids(&self) -> Vec<String> {
        self.0.clone()
    }
}

async fn wait_for_agent_count(supervisor: &PubSubSupervisor, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while supervisor.running_agent_count().await != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "supervisor never reached {expected} running agents"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_login_supervise_revoke_relogin() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedOAuth::new());
    let store = Arc::new(FileCredentialStore::new(dir.path()));

    let auth = Arc::new(
        TwitchAuthService::load(provider.clone(), store.clone())
            .await
            .unwrap(),
    );
    auth.initialize().await;
    assert!(!auth.has_tokens(), "fresh install starts logged out");

    let activation = Arc::new(PlatformActivationState::new());
    activation.set_active(PlatformType::Twitch, true);

    let ledger = Arc::new(AgentLedger::default());
    let supervisor = PubSubSupervisor::new(
        auth.clone(),
        activation,
        Arc::new(StaticChannels(vec![
            "channel-a".to_string(),
            "channel-b".to_string(),
        ])),
        ledger.clone(),
    );
    let listener = supervisor.listen();

    // Login: the code exchange flips the credential status and the listener
    // brings up one agent per channel.
    auth.exchange_authorization_code("the-code", "http://localhost:8338/oauth")
        .await
        .unwrap();
    assert!(auth.has_tokens());
    assert_eq!(
        auth.logged_in_user().map(|u| u.display_name),
        Some("testuser".to_string())
    );
    wait_for_agent_count(&supervisor, 2).await;

    let mut running = ledger.running_channels();
    running.sort();
    assert_eq!(running, vec!["channel-a", "channel-b"]);

    // Revoke: credentials gone, the listener tears every agent down.
    auth.revoke_tokens().await;
    wait_for_agent_count(&supervisor, 0).await;
    assert!(ledger.running_channels().is_empty());

    // Re-login works after revocation.
    auth.exchange_authorization_code("another-code", "http://localhost:8338/oauth")
        .await
        .unwrap();
    wait_for_agent_count(&supervisor, 2).await;

    supervisor.shutdown().await;
    listener.await.unwrap();
}

#[tokio::test]
async fn test_restart_picks_up_persisted_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedOAuth::new());

    {
        let store = Arc::new(FileCredentialStore::new(dir.path()));
        let auth = Arc::new(
            TwitchAuthService::load(provider.clone(), store)
                .await
                .unwrap(),
        );
        auth.exchange_authorization_code("the-code", "http://localhost:8338/oauth")
            .await
            .unwrap();
    }

    // A second service instance over the same directory sees the record.
    let store = Arc::new(FileCredentialStore::new(dir.path()));
    let auth = Arc::new(TwitchAuthService::load(provider.clone(), store).await.unwrap());
    assert!(auth.has_tokens());
    assert!(auth.token_is_valid());

    auth.initialize().await;
    assert!(auth.logged_in_user().is_some());
    // The persisted token is still fresh; no refresh happened.
    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_restart_with_expired_record_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedOAuth::new());
    let store = Arc::new(FileCredentialStore::new(dir.path()));

    // Seed a persisted record whose access token the provider no longer
    // accepts; only the refresh token is still good.
    let stale = TwitchCredentials {
        access_token: Some("expired-access".to_string()),
        refresh_token: Some("refresh-old".to_string()),
        valid_until: Some(chrono::Utc::now() + chrono::Duration::minutes(2)),
    };
    twitch_core::CredentialStore::save(store.as_ref(), PlatformType::Twitch, &stale)
        .await
        .unwrap();

    let auth = Arc::new(TwitchAuthService::load(provider.clone(), store).await.unwrap());
    auth.initialize().await;

    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(auth.token_is_valid());
    assert!(auth.logged_in_user().is_some());
}
