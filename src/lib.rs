//! # Light & Heavy
//!
//! Two-player drop-piece game played peer to peer over a retained pub/sub
//! bus. Peers authenticate every message with a shared secret, settle who
//! plays first with a challenge handshake, and each run the same
//! deterministic board engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      LIGHT & HEAVY                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Primitives                             │
//! │  ├── mac.rs         - HMAC-SHA256 over ordered fields        │
//! │  └── nonce.rs       - Nonces and client ids                  │
//! │                                                              │
//! │  game/              - Game logic (deterministic)             │
//! │  ├── board.rs       - 6×7 grid, light/heavy placement        │
//! │  ├── win.rs         - Four-in-a-line detection               │
//! │  ├── state.rs       - Turn, move counter, outcome, reset     │
//! │  └── events.rs      - Render events                          │
//! │                                                              │
//! │  network/           - Networking (non-deterministic)         │
//! │  ├── protocol.rs    - Topics and wire messages               │
//! │  ├── moves.rs       - Signing and validation                 │
//! │  ├── negotiator.rs  - Challenge handshake, roles             │
//! │  ├── controller.rs  - Event reducer (state, event) → effects │
//! │  ├── bus.rs         - Bus trait + in-process bus             │
//! │  └── runtime.rs     - Tokio task driving one peer            │
//! │                                                              │
//! │  config.rs          - Peer configuration                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `game/` module is **100% deterministic**: no clock, no randomness, no
//! I/O. Two peers that apply the same sequence of authenticated moves hold
//! **identical boards**.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigError, ConnectPolicy, PeerConfig};
pub use crate::core::mac::AuthCodec;
pub use game::board::{Board, Piece, Player, Weight, COLS, ROWS};
pub use game::events::GameEvent;
pub use game::state::{GameState, Outcome};
pub use network::bus::{BusClient, MemoryBus};
pub use network::runtime::{spawn_peer, PeerError, PeerHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
