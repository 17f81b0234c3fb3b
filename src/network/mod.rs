//! Network Layer
//!
//! Handshake, authenticated moves and the peer runtime on top of a
//! retained pub/sub bus. This layer is **non-deterministic** (clock, nonces,
//! delivery order); all board logic runs through `game/`.

pub mod protocol;
pub mod moves;
pub mod effect;
pub mod negotiator;
pub mod controller;
pub mod bus;
pub mod runtime;

pub use protocol::{ChallengeMessage, MoveMessage, Rejection, Topic, DEFAULT_TOPIC_PREFIX};
pub use moves::{MoveProtocol, TrustedMove};
pub use effect::{Effect, Outbound, Timer};
pub use negotiator::{assign_role, HandshakeTiming, NegotiationState, Session, SessionNegotiator};
pub use controller::{ControllerEvent, GameController};
pub use bus::{BusClient, BusError, BusMessage, MemoryBus, MemoryBusClient};
pub use runtime::{connect_with_retry, spawn_peer, PeerCommand, PeerError, PeerHandle};
