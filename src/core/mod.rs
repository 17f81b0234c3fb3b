//! Core primitives.
//!
//! Message authentication and the random tokens used by the handshake and
//! move protocol.

pub mod mac;
pub mod nonce;

// Re-export core types
pub use mac::{AuthCodec, MAC_HEX_LEN};
pub use nonce::{challenge_nonce, client_id, move_nonce};
