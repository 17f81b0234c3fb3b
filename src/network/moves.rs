//! Authenticated Messages
//!
//! Builds and checks the signed handshake and move messages. Every inbound
//! payload passes through here before it can touch session or game state;
//! anything that fails comes back as a [`Rejection`].

use crate::core::mac::AuthCodec;
use crate::core::nonce::move_nonce;
use crate::game::board::{Piece, Player, Weight, COLS};
use crate::game::state::GameState;
use crate::network::protocol::{
    decode_payload, ChallengeMessage, MoveMessage, Rejection, CHALLENGE_SENTINEL,
};

/// A move that passed every check. Owner and placement are still recomputed
/// locally by the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedMove {
    /// Move number it was played under.
    pub move_number: u32,
    /// Column played.
    pub column: usize,
    /// Piece, owner taken from the colour tag.
    pub piece: Piece,
    /// Sender.
    pub client_id: String,
}

/// Signs and validates protocol messages under the shared secret.
#[derive(Clone, Debug)]
pub struct MoveProtocol {
    codec: AuthCodec,
}

impl MoveProtocol {
    /// Create from a codec.
    pub fn new(codec: AuthCodec) -> Self {
        Self { codec }
    }

    /// Create from the shared secret.
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Self {
        Self::new(AuthCodec::new(secret))
    }

    /// Underlying codec.
    pub fn codec(&self) -> &AuthCodec {
        &self.codec
    }

    // =========================================================================
    // MOVES
    // =========================================================================

    /// Build the message for the side to move playing `(column, weight)`.
    ///
    /// Carries the current move number and a fresh nonce. Callers encode
    /// before applying the move and drop the message if the board refuses it.
    pub fn encode_move(
        &self,
        state: &GameState,
        client_id: &str,
        column: usize,
        weight: Weight,
    ) -> MoveMessage {
        let color = Piece::new(state.turn, weight).color_tag().to_string();
        let col = u8::try_from(column).unwrap_or(u8::MAX);
        let mut message = MoveMessage {
            move_number: state.move_number,
            col,
            weight,
            color,
            nonce: move_nonce(),
            hmac: String::new(),
            client_id: client_id.to_string(),
        };
        message.hmac = self.codec.sign_str(&message.mac_input());
        message
    }

    /// Parse and validate a move payload.
    ///
    /// Checks, in order: shape, sender, sequence, tag, column, colour.
    pub fn decode_and_validate(
        &self,
        payload: &[u8],
        expected_move_number: u32,
        own_client_id: &str,
    ) -> Result<TrustedMove, Rejection> {
        let message: MoveMessage = decode_payload(payload)?;

        if message.client_id == own_client_id {
            return Err(Rejection::SelfEcho);
        }
        if message.move_number != expected_move_number {
            return Err(Rejection::OutOfSequence {
                expected: expected_move_number,
                got: message.move_number,
            });
        }
        if !self.codec.verify_str(&message.mac_input(), &message.hmac) {
            return Err(Rejection::BadMac);
        }

        let column = usize::from(message.col);
        if column >= COLS {
            return Err(Rejection::InvalidColumn(message.col));
        }
        let owner = Player::from_color_tag(&message.color)
            .ok_or_else(|| Rejection::UnknownColor(message.color.clone()))?;

        Ok(TrustedMove {
            move_number: message.move_number,
            column,
            piece: Piece::new(owner, message.weight),
            client_id: message.client_id,
        })
    }

    // =========================================================================
    // HANDSHAKE
    // =========================================================================

    /// Build a challenge (or challenge-accepted) message over `nonce`.
    pub fn encode_challenge(&self, client_id: &str, nonce: &str) -> ChallengeMessage {
        let mut message = ChallengeMessage {
            move_number: CHALLENGE_SENTINEL,
            nonce: nonce.to_string(),
            hmac: String::new(),
            client_id: client_id.to_string(),
        };
        message.hmac = self.codec.sign(&[&message.move_number, &message.nonce]);
        message
    }

    /// Parse and validate a challenge or challenge-accepted payload.
    ///
    /// Anything carrying this peer's current nonce or client id is an echo.
    pub fn decode_challenge(
        &self,
        payload: &[u8],
        own_nonce: &str,
        own_client_id: &str,
    ) -> Result<ChallengeMessage, Rejection> {
        let message: ChallengeMessage = decode_payload(payload)?;

        if message.nonce == own_nonce || message.client_id == own_client_id {
            return Err(Rejection::SelfEcho);
        }
        if message.move_number != CHALLENGE_SENTINEL {
            return Err(Rejection::BadSentinel(message.move_number));
        }
        if !self.codec.verify(&[&message.move_number, &message.nonce], &message.hmac) {
            return Err(Rejection::BadMac);
        }

        Ok(message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
