//! PubSub agent boundary.
//!
//! One agent owns one channel's live push connection. Reconnect and backoff
//! are internal to the agent; the supervisor only starts and stops it.

use async_trait::async_trait;

use crate::error::Result;

/// One live per-channel push connection.
#[async_trait]
pub trait PubSubAgent: Send + Sync {
    /// Open the connection. A failure is isolated to this channel.
    async fn start(&self) -> Result<()>;

    /// Close the connection. Infallible; a connection that is already down
    /// simply stays down.
    async fn stop(&self);
}

/// Creates agents for the supervisor.
///
/// Implementations capture whatever the agent needs to authenticate, e.g. the
/// auth service for a fresh access token on (re)connect.
pub trait AgentFactory: Send + Sync {
    fn create(&self, channel_id: &str) -> Box<dyn PubSubAgent>;
}

/// Source of the channels that should have live connections.
pub trait ChannelSource: Send + Sync {
    /// Channel ids that are currently enabled for push notifications.
    fn all_active_channel_ids(&self) -> Vec<String>;
}
