//! Game Controller
//!
//! Single owner of one peer's session and game state. Every input (bus
//! delivery, fired timer, operator command) becomes a [`ControllerEvent`];
//! `handle` mutates state and returns the [`Effect`]s to perform. There is
//! exactly one path from an inbound payload to the board.

use tracing::{debug, info, warn};

use crate::config::PeerConfig;
use crate::game::board::{Piece, Player, Weight};
use crate::game::events::{GameEvent, LastMove};
use crate::game::state::{GameState, MoveError, Placement};
use crate::network::effect::{Effect, Outbound, Timer};
use crate::network::moves::MoveProtocol;
use crate::network::negotiator::SessionNegotiator;
use crate::network::protocol::{Rejection, Topic};

/// Input to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Transport connected.
    Connected,
    /// Bus delivery.
    MessageArrived {
        /// Full topic name.
        topic: String,
        /// Raw payload.
        payload: Vec<u8>,
    },
    /// A scheduled timer fired.
    TimerFired(Timer),
    /// Local player wants to drop a piece.
    LocalMoveRequested {
        /// Column.
        column: usize,
        /// Weight.
        weight: Weight,
    },
    /// Local player wants a new game.
    ResetRequested,
}

/// Session and game state for one peer.
#[derive(Debug)]
pub struct GameController {
    negotiator: SessionNegotiator,
    protocol: MoveProtocol,
    state: GameState,
    prefix: String,
}

impl GameController {
    /// Create a controller for `client_id`.
    pub fn new(config: &PeerConfig, client_id: String) -> Self {
        Self {
            negotiator: SessionNegotiator::new(
                client_id,
                config.topic_prefix.clone(),
                config.handshake,
            ),
            protocol: MoveProtocol::from_secret(&config.secret),
            state: GameState::new(config.supply),
            prefix: config.topic_prefix.clone(),
        }
    }

    /// Current game.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Handshake.
    pub fn negotiator(&self) -> &SessionNegotiator {
        &self.negotiator
    }

    /// Negotiated role.
    pub fn role(&self) -> Option<Player> {
        self.negotiator.role()
    }

    /// Client id.
    pub fn client_id(&self) -> &str {
        self.negotiator.client_id()
    }

    /// Process one event.
    pub fn handle(&mut self, event: ControllerEvent) -> Vec<Effect> {
        let had_role = self.role().is_some();

        let mut effects = match event {
            ControllerEvent::Connected => self.negotiator.on_connected(),
            ControllerEvent::MessageArrived { topic, payload } => self.on_message(&topic, &payload),
            ControllerEvent::TimerFired(timer) => self.negotiator.on_timer(timer, &self.protocol),
            ControllerEvent::LocalMoveRequested { column, weight } => {
                self.on_local_move(column, weight)
            }
            ControllerEvent::ResetRequested => self.on_reset(),
        };

        // Whose turn it is only means something once the role is known
        if !had_role && self.role().is_some() {
            effects.push(self.turn_changed());
        }
        effects
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    fn on_message(&mut self, topic: &str, payload: &[u8]) -> Vec<Effect> {
        let Some(kind) = Topic::from_path(&self.prefix, topic) else {
            debug!(topic, "message on unknown topic");
            return Vec::new();
        };

        let result = match kind {
            Topic::Challenge if self.state.over => self
                .negotiator
                .validate(payload, &self.protocol)
                .map(|challenge| {
                    info!(peer_id = %challenge.client_id, "peer wants a rematch");
                    vec![Effect::Emit(GameEvent::RematchRequested {
                        peer_id: challenge.client_id,
                    })]
                }),
            Topic::Challenge => self.negotiator.on_challenge(payload, &self.protocol),
            Topic::ChallengeAccepted if self.state.over => Ok(Vec::new()),
            Topic::ChallengeAccepted => {
                self.negotiator.on_challenge_accepted(payload, &self.protocol)
            }
            Topic::Move => self.on_remote_move(payload),
        };

        result.unwrap_or_else(|rejection| {
            log_rejection(kind, &rejection);
            Vec::new()
        })
    }

    fn on_remote_move(&mut self, payload: &[u8]) -> Result<Vec<Effect>, Rejection> {
        if self.state.over {
            debug!("game over, discarding move");
            return Ok(Vec::new());
        }

        let trusted = self.protocol.decode_and_validate(
            payload,
            self.state.move_number,
            self.negotiator.client_id(),
        )?;

        match self.state.apply_move(trusted.column, trusted.piece) {
            Ok(placement) => {
                debug!(
                    move_number = placement.move_number,
                    column = placement.column,
                    row = placement.row,
                    peer_id = %trusted.client_id,
                    "applied remote move"
                );
                Ok(self.placement_effects(&placement, false))
            }
            Err(e) => {
                warn!(column = trusted.column, error = %e, "remote move refused by local board");
                Ok(Vec::new())
            }
        }
    }

    // =========================================================================
    // LOCAL COMMANDS
    // =========================================================================

    fn on_local_move(&mut self, column: usize, weight: Weight) -> Vec<Effect> {
        match self.try_local_move(column, weight) {
            Ok(effects) => effects,
            Err(reason) => {
                debug!(column, %weight, %reason, "local move refused");
                vec![Effect::Emit(GameEvent::MoveRejected {
                    column,
                    weight,
                    reason,
                })]
            }
        }
    }

    fn try_local_move(&mut self, column: usize, weight: Weight) -> Result<Vec<Effect>, MoveError> {
        let role = self.role().ok_or(MoveError::NotNegotiated)?;
        if self.state.over {
            return Err(MoveError::GameOver);
        }
        if self.state.turn != role {
            return Err(MoveError::NotYourTurn {
                turn: self.state.turn,
            });
        }
        if self.state.remaining(role, weight) == 0 {
            return Err(MoveError::OutOfPieces {
                player: role,
                weight,
            });
        }

        // Signed against the pre-move counter; dropped if the board refuses
        let message = self
            .protocol
            .encode_move(&self.state, self.negotiator.client_id(), column, weight);
        let placement = self.state.apply_move(column, Piece::new(role, weight))?;

        let mut effects = Vec::new();
        match message.to_json() {
            Ok(payload) => effects.push(Effect::Publish(Outbound {
                topic: Topic::Move.path(&self.prefix),
                payload,
                retained: Topic::Move.is_retained(),
            })),
            Err(e) => warn!(error = %e, "failed to serialize move"),
        }
        effects.extend(self.placement_effects(&placement, true));
        Ok(effects)
    }

    fn on_reset(&mut self) -> Vec<Effect> {
        self.state.reset();
        info!(turn = self.state.turn.number(), "new game");

        let mut effects = vec![
            Effect::Emit(GameEvent::BoardChanged {
                board: self.state.board.clone(),
                last_move: None,
            }),
            self.turn_changed(),
        ];
        effects.extend(self.negotiator.restart(&self.protocol));
        effects
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn placement_effects(&self, placement: &Placement, local: bool) -> Vec<Effect> {
        let mut effects = vec![Effect::Emit(GameEvent::BoardChanged {
            board: self.state.board.clone(),
            last_move: Some(LastMove {
                row: placement.row,
                column: placement.column,
                local,
            }),
        })];

        match &placement.outcome {
            Some(outcome) => {
                let winner = outcome.winner();
                info!(
                    winner = winner.map(Player::number),
                    moves = placement.move_number,
                    "game over"
                );
                effects.push(Effect::Emit(GameEvent::GameEnded {
                    outcome: outcome.clone(),
                    local_win: winner.is_some() && winner == self.role(),
                }));
            }
            None => effects.push(self.turn_changed()),
        }
        effects
    }

    fn turn_changed(&self) -> Effect {
        Effect::Emit(GameEvent::TurnChanged {
            turn: self.state.turn,
            local: self.role() == Some(self.state.turn),
        })
    }
}

fn log_rejection(topic: Topic, rejection: &Rejection) {
    match rejection {
        Rejection::Cleared => debug!(?topic, "topic cleared"),
        r if r.is_suspicious() => warn!(?topic, reason = %r, "discarding unauthenticated message"),
        r => debug!(?topic, reason = %r, "discarding message"),
    }
}

// =============================================================================
// TESTS
// =============================================================================
