//! PubSub connection supervisor.
//!
//! Keeps the set of live per-channel agents converged with two independently
//! changing signals: the auth service's usable-credentials status and the
//! platform activation flag. Agents exist iff credentials are usable and the
//! platform is active.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::TwitchAuthService;
use crate::platform::{ActiveStateManager, PlatformType};

use super::agent::{AgentFactory, ChannelSource, PubSubAgent};

/// Supervisor for per-channel PubSub agents.
///
/// Exclusively owns the agent handles; all mutations of the channel→agent map
/// (explicit start/stop and the credential-event handler) are serialized
/// behind one lock, so concurrent invocations can neither duplicate nor
/// orphan an agent.
pub struct PubSubSupervisor {
    auth: Arc<TwitchAuthService>,
    active_state: Arc<dyn ActiveStateManager>,
    channels: Arc<dyn ChannelSource>,
    factory: Arc<dyn AgentFactory>,
    agents: Mutex<HashMap<String, Box<dyn PubSubAgent>>>,
    cancel: CancellationToken,
}

impl PubSubSupervisor {
    pub fn new(
        auth: Arc<TwitchAuthService>,
        active_state: Arc<dyn ActiveStateManager>,
        channels: Arc<dyn ChannelSource>,
        factory: Arc<dyn AgentFactory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            auth,
            active_state,
            channels,
            factory,
            agents: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to the auth service's notifications and react to them on a
    /// background task until [`PubSubSupervisor::shutdown`].
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        let mut rx = supervisor.auth.subscribe();
        let cancel = supervisor.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(_) => supervisor.on_credentials_changed().await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Missed notifications collapse into one resync;
                            // the handler re-reads the current state anyway.
                            warn!(skipped, "credential events lagged, resynchronizing");
                            supervisor.on_credentials_changed().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("pubsub supervisor event loop stopped");
        })
    }

    /// Start an agent for every known channel.
    ///
    /// Creation is gated on usable, non-stale credentials: an agent started
    /// without them could only sit in a reconnect loop. The next credential
    /// notification starts the missing agents instead.
    pub async fn start(&self) {
        let mut agents = self.agents.lock().await;

        if !(self.auth.has_tokens() && self.auth.token_is_valid()) {
            warn!("no usable credentials, not starting pubsub agents");
            return;
        }

        self.start_missing_agents(&mut agents).await;
    }

    /// Stop every running agent. A no-op when none are running.
    pub async fn stop(&self) {
        let mut agents = self.agents.lock().await;
        Self::stop_all(&mut agents).await;
    }

    /// Stop the event loop, then every agent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.stop().await;
    }

    /// Number of currently running agents.
    pub async fn running_agent_count(&self) -> usize {
        self.agents.lock().await.len()
    }

    async fn on_credentials_changed(&self) {
        let mut agents = self.agents.lock().await;

        if self.auth.has_tokens() {
            if self.active_state.is_active(PlatformType::Twitch) {
                self.start_missing_agents(&mut agents).await;
            }
        } else {
            info!("credentials gone, stopping all pubsub agents");
            Self::stop_all(&mut agents).await;
        }
    }

    /// Start an agent for every known channel that has none. A failing start
    /// is logged and skipped; the remaining channels still get theirs.
    async fn start_missing_agents(&self, agents: &mut HashMap<String, Box<dyn PubSubAgent>>) {
        for channel_id in self.channels.all_active_channel_ids() {
            if agents.contains_key(&channel_id) {
                continue;
            }

            let agent = self.factory.create(&channel_id);
            match agent.start().await {
                Ok(()) => {
                    debug!(channel_id = %channel_id, "pubsub agent started");
                    agents.insert(channel_id, agent);
                }
                Err(e) => {
                    error!(channel_id = %channel_id, error = %e, "failed to start pubsub agent");
                }
            }
        }
    }

    async fn stop_all(agents: &mut HashMap<String, Box<dyn PubSubAgent>>) {
        for (channel_id, agent) in agents.drain() {
            agent.stop().await;
            debug!(channel_id = %channel_id, "pubsub agent stopped");
        }
    }
}
