//! Random Tokens
//!
//! Nonces and client identifiers. These are the only random values in the
//! crate; the board engine never consumes randomness.

use rand::RngCore;

/// Prefix of handshake nonces.
pub const CHALLENGE_NONCE_PREFIX: &str = "nonce_";

/// Prefix of move nonces.
pub const MOVE_NONCE_PREFIX: &str = "moveNonce_";

/// Prefix of client identifiers.
pub const CLIENT_ID_PREFIX: &str = "client_";

/// `prefix` followed by 8 random lowercase hex characters.
pub fn random_token(prefix: &str) -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", prefix, hex::encode(bytes))
}

/// Fresh nonce for a challenge or challenge-accepted message.
pub fn challenge_nonce() -> String {
    random_token(CHALLENGE_NONCE_PREFIX)
}

/// Fresh nonce for a move message.
pub fn move_nonce() -> String {
    random_token(MOVE_NONCE_PREFIX)
}

/// Generate a client identifier. Called once per process.
///
/// Derived from a v4 UUID, truncated to 8 hex characters to keep the
/// identifiers the same shape as the other peers on the topics.
pub fn client_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", CLIENT_ID_PREFIX, &uuid[..8])
}
