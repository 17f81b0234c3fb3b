//! Session Negotiation
//!
//! Challenge handshake that gives each of two peers a role. Both peers post
//! a signed challenge; whichever valid challenge arrives first decides the
//! roles by comparing client ids (smaller id plays first). The role-2 peer
//! confirms on the challenge-accepted topic for a peer that missed the
//! challenge itself.
//!
//! ```text
//! Idle ──connect──▶ Connected ──1 s──▶ ChallengePosted ──3 s──▶ RolePending
//!                       │                    │                      │
//!                       └────────────────────┴──valid challenge─────┴──▶ Negotiated
//! ```

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::nonce::challenge_nonce;
use crate::game::board::Player;
use crate::game::events::GameEvent;
use crate::network::effect::{Effect, Outbound, Timer};
use crate::network::moves::MoveProtocol;
use crate::network::protocol::{ChallengeMessage, Rejection, Topic};

/// Delay between connecting and posting the first challenge.
pub const DEFAULT_CHALLENGE_DELAY: Duration = Duration::from_secs(1);

/// Delay before the single automatic repost.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Not connected yet.
    Idle,
    /// Topics cleared; challenge waits for the settle delay.
    Connected,
    /// Challenge out; one retry armed.
    ChallengePosted,
    /// Retry spent (or reposted after a reset); waiting for the peer.
    RolePending,
    /// Role known.
    Negotiated,
}

/// Handshake timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTiming {
    /// Connect to first challenge.
    pub challenge_delay: Duration,
    /// First challenge to retry.
    pub retry_delay: Duration,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        Self {
            challenge_delay: DEFAULT_CHALLENGE_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Role from a client id comparison: the smaller id plays first.
///
/// Both peers evaluate this with the arguments swapped and get complementary
/// answers as long as the ids differ.
pub fn assign_role(own_id: &str, peer_id: &str) -> Player {
    if own_id < peer_id {
        Player::One
    } else {
        Player::Two
    }
}

/// This peer's handshake identity.
#[derive(Debug, Clone)]
pub struct Session {
    /// Fixed for the life of the process.
    pub client_id: String,
    /// Current handshake nonce; replaced on every post.
    pub nonce: String,
    /// Role once negotiated; kept across resets.
    pub role: Option<Player>,
    /// Handshake progress.
    pub state: NegotiationState,
}

/// Drives the handshake. Returns effects; performs no I/O.
#[derive(Debug)]
pub struct SessionNegotiator {
    session: Session,
    prefix: String,
    timing: HandshakeTiming,
    challenge_received: bool,
    challenge_posted: bool,
    epoch: u64,
}

impl SessionNegotiator {
    /// Create a negotiator for `client_id`, publishing under `prefix`.
    pub fn new(client_id: String, prefix: impl Into<String>, timing: HandshakeTiming) -> Self {
        Self {
            session: Session {
                client_id,
                nonce: challenge_nonce(),
                role: None,
                state: NegotiationState::Idle,
            },
            prefix: prefix.into(),
            timing,
            challenge_received: false,
            challenge_posted: false,
            epoch: 0,
        }
    }

    /// Session snapshot.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Negotiated role.
    pub fn role(&self) -> Option<Player> {
        self.session.role
    }

    /// Client id.
    pub fn client_id(&self) -> &str {
        &self.session.client_id
    }

    /// Current nonce.
    pub fn nonce(&self) -> &str {
        &self.session.nonce
    }

    /// Handshake progress.
    pub fn state(&self) -> NegotiationState {
        self.session.state
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Transport came up: subscribe, clear both handshake topics, and arm the
    /// first challenge.
    pub fn on_connected(&mut self) -> Vec<Effect> {
        self.epoch += 1;
        self.challenge_received = false;
        self.challenge_posted = false;
        self.advance(NegotiationState::Connected);

        let mut effects: Vec<Effect> = Topic::ALL
            .into_iter()
            .map(|topic| Effect::Subscribe(topic.path(&self.prefix)))
            .collect();
        effects.push(Effect::Publish(Outbound::clear(Topic::Challenge.path(&self.prefix))));
        effects.push(Effect::Publish(Outbound::clear(
            Topic::ChallengeAccepted.path(&self.prefix),
        )));
        effects.push(Effect::Schedule {
            timer: Timer::PostChallenge { epoch: self.epoch },
            after: self.timing.challenge_delay,
        });
        effects
    }

    /// A handshake timer fired.
    pub fn on_timer(&mut self, timer: Timer, protocol: &MoveProtocol) -> Vec<Effect> {
        match timer {
            Timer::PostChallenge { epoch } if epoch == self.epoch => {
                let mut effects = self.post_challenge(protocol);
                effects.push(Effect::Schedule {
                    timer: Timer::RetryChallenge { epoch },
                    after: self.timing.retry_delay,
                });
                self.advance(NegotiationState::ChallengePosted);
                effects
            }
            Timer::RetryChallenge { epoch } if epoch == self.epoch => {
                if self.challenge_received {
                    return Vec::new();
                }
                info!(client_id = %self.session.client_id, "no challenge received, reposting");
                let effects = self.post_challenge(protocol);
                self.advance(NegotiationState::RolePending);
                effects
            }
            stale => {
                debug!(?stale, current = self.epoch, "ignoring stale handshake timer");
                Vec::new()
            }
        }
    }

    /// A payload arrived on the challenge topic.
    pub fn on_challenge(
        &mut self,
        payload: &[u8],
        protocol: &MoveProtocol,
    ) -> Result<Vec<Effect>, Rejection> {
        let message = self.validate(payload, protocol)?;
        self.challenge_received = true;

        let mut effects = Vec::new();
        if self.session.role.is_none() {
            effects.extend(self.resolve_role(&message));
        }
        if self.session.role == Some(Player::Two) {
            let accepted = protocol.encode_challenge(&self.session.client_id, &self.session.nonce);
            if let Some(publish) = self.publish(Topic::ChallengeAccepted, &accepted) {
                effects.push(publish);
            }
        }
        effects.push(Effect::Publish(Outbound::clear(Topic::Challenge.path(&self.prefix))));
        Ok(effects)
    }

    /// A payload arrived on the challenge-accepted topic.
    pub fn on_challenge_accepted(
        &mut self,
        payload: &[u8],
        protocol: &MoveProtocol,
    ) -> Result<Vec<Effect>, Rejection> {
        let message = self.validate(payload, protocol)?;
        self.challenge_received = true;

        if self.challenge_posted && self.session.role.is_none() {
            return Ok(self.resolve_role(&message));
        }
        Ok(Vec::new())
    }

    /// Validate a handshake payload against this session without acting on it.
    pub fn validate(
        &self,
        payload: &[u8],
        protocol: &MoveProtocol,
    ) -> Result<ChallengeMessage, Rejection> {
        protocol.decode_challenge(payload, &self.session.nonce, &self.session.client_id)
    }

    /// Repost a fresh challenge for a new game. Keeps the role and skips the
    /// connect sequence; pending timers are invalidated.
    pub fn restart(&mut self, protocol: &MoveProtocol) -> Vec<Effect> {
        self.epoch += 1;
        self.challenge_received = false;
        let effects = self.post_challenge(protocol);
        self.advance(NegotiationState::RolePending);
        effects
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn post_challenge(&mut self, protocol: &MoveProtocol) -> Vec<Effect> {
        self.session.nonce = challenge_nonce();
        let challenge = protocol.encode_challenge(&self.session.client_id, &self.session.nonce);
        self.challenge_posted = true;
        self.publish(Topic::Challenge, &challenge).into_iter().collect()
    }

    fn publish(&self, topic: Topic, message: &ChallengeMessage) -> Option<Effect> {
        match message.to_json() {
            Ok(payload) => Some(Effect::Publish(Outbound {
                topic: topic.path(&self.prefix),
                payload,
                retained: topic.is_retained(),
            })),
            Err(e) => {
                warn!(error = %e, "failed to serialize handshake message");
                None
            }
        }
    }

    fn resolve_role(&mut self, peer: &ChallengeMessage) -> Vec<Effect> {
        let role = assign_role(&self.session.client_id, &peer.client_id);
        self.session.role = Some(role);
        self.session.state = NegotiationState::Negotiated;
        info!(
            client_id = %self.session.client_id,
            peer_id = %peer.client_id,
            role = role.number(),
            "negotiation complete"
        );
        vec![Effect::Emit(GameEvent::RoleAssigned {
            role,
            peer_id: peer.client_id.clone(),
        })]
    }

    fn advance(&mut self, state: NegotiationState) {
        if self.session.role.is_none() {
            self.session.state = state;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
