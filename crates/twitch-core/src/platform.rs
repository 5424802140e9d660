//! Platform identity and activation state.
//!
//! The activation flag decides whether a platform's live connections should be
//! running at all, independently of credential validity. It is flipped by the
//! embedding application and read synchronously by the connection supervisor.

use std::collections::HashSet;

use parking_lot::RwLock;

/// Supported streaming platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformType {
    Twitch,
}

impl PlatformType {
    /// Lowercase platform identifier, used as the per-service credential key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
        }
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the per-platform activation flag.
pub trait ActiveStateManager: Send + Sync {
    /// Whether the platform's connections should currently be live.
    fn is_active(&self, platform: PlatformType) -> bool;
}

/// Activation flags for all platforms, owned by the embedding application.
///
/// All platforms start inactive.
#[derive(Debug, Default)]
pub struct PlatformActivationState {
    active: RwLock<HashSet<PlatformType>>,
}

impl PlatformActivationState {
    /// Create a new activation state with every platform inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the activation flag for a platform.
    pub fn set_active(&self, platform: PlatformType, active: bool) {
        let mut set = self.active.write();
        if active {
            set.insert(platform);
        } else {
            set.remove(&platform);
        }
    }
}

impl ActiveStateManager for PlatformActivationState {
    fn is_active(&self, platform: PlatformType) -> bool {
        self.active.read().contains(&platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platforms_start_inactive() {
        let state = PlatformActivationState::new();
        assert!(!state.is_active(PlatformType::Twitch));
    }

    #[test]
    fn test_set_active_round_trip() {
        let state = PlatformActivationState::new();

        state.set_active(PlatformType::Twitch, true);
        assert!(state.is_active(PlatformType::Twitch));

        state.set_active(PlatformType::Twitch, false);
        assert!(!state.is_active(PlatformType::Twitch));
    }

    #[test]
    fn test_platform_identifier() {
        assert_eq!(PlatformType::Twitch.as_str(), "twitch");
        assert_eq!(PlatformType::Twitch.to_string(), "twitch");
    }
}
