//! PubSub connection supervision.

mod agent;
mod supervisor;

pub use agent::{AgentFactory, ChannelSource, PubSubAgent};
pub use supervisor::PubSubSupervisor;
