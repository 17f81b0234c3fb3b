//! Peer Configuration
//!
//! Everything a peer needs before it connects. Defaults match the deployed
//! peers; the secret has no default and must be supplied.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::game::state::PieceSupply;
use crate::network::negotiator::HandshakeTiming;
use crate::network::protocol::DEFAULT_TOPIC_PREFIX;

/// Environment variable holding the shared secret.
pub const SECRET_ENV: &str = "LIGHT_HEAVY_SECRET";

/// Environment variable overriding the topic prefix.
pub const TOPIC_PREFIX_ENV: &str = "LIGHT_HEAVY_TOPIC_PREFIX";

/// Connection retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Retries after the first failed attempt.
    pub retries: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl ConnectPolicy {
    /// Attempts made before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No shared secret set.
    #[error("shared secret is empty (set LIGHT_HEAVY_SECRET)")]
    MissingSecret,

    /// Topic prefix is empty.
    #[error("topic prefix is empty")]
    EmptyTopicPrefix,
}

/// Peer configuration.
#[derive(Clone)]
pub struct PeerConfig {
    /// Shared secret for message authentication.
    pub secret: String,
    /// Topic prefix.
    pub topic_prefix: String,
    /// Handshake delays.
    pub handshake: HandshakeTiming,
    /// Connection retries.
    pub connect: ConnectPolicy,
    /// Pieces per player per game.
    pub supply: PieceSupply,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            handshake: HandshakeTiming::default(),
            connect: ConnectPolicy::default(),
            supply: PieceSupply::default(),
        }
    }
}

impl PeerConfig {
    /// Defaults with the given secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: std::env::var(SECRET_ENV).unwrap_or_default(),
            topic_prefix: std::env::var(TOPIC_PREFIX_ENV).unwrap_or(defaults.topic_prefix),
            ..defaults
        }
    }

    /// Check the config is usable. Connecting is refused otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.topic_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyTopicPrefix);
        }
        Ok(())
    }
}

impl fmt::Debug for PeerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConfig")
            .field("secret", &"<redacted>")
            .field("topic_prefix", &self.topic_prefix)
            .field("handshake", &self.handshake)
            .field("connect", &self.connect)
            .field("supply", &self.supply)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PeerConfig::default();
        assert_eq!(config.topic_prefix, "light_and_heavy");
        assert_eq!(config.handshake.challenge_delay, Duration::from_secs(1));
        assert_eq!(config.handshake.retry_delay, Duration::from_secs(3));
        assert_eq!(config.connect.max_attempts(), 4);
        assert_eq!(config.supply.light, 11);
        assert_eq!(config.supply.heavy, 10);
    }

    #[test]
    fn test_validate() {
        assert_eq!(PeerConfig::default().validate(), Err(ConfigError::MissingSecret));
        assert_eq!(PeerConfig::with_secret("s").validate(), Ok(()));

        let mut config = PeerConfig::with_secret("s");
        config.topic_prefix = " ".into();
        assert_eq!(config.validate(), Err(ConfigError::EmptyTopicPrefix));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", PeerConfig::with_secret("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("light_and_heavy"));
    }
}
