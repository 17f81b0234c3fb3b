//! Controller Effects
//!
//! What the session and game logic ask the runtime to do. The logic itself
//! never touches the bus or the clock; it returns these and the runtime
//! performs them in order.

use std::time::Duration;

use crate::game::events::GameEvent;

/// Handshake timers. The epoch ties a timer to the connection or reset that
/// armed it; a fired timer from an older epoch is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer {
    /// Post the first challenge after the settle delay.
    PostChallenge {
        /// Arming epoch.
        epoch: u64,
    },
    /// Repost once if nobody answered.
    RetryChallenge {
        /// Arming epoch.
        epoch: u64,
    },
}

/// A publish request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    /// Full topic name.
    pub topic: String,
    /// Payload; empty clears a retained topic.
    pub payload: String,
    /// Ask the bus to retain it.
    pub retained: bool,
}

impl Outbound {
    /// Empty retained publish: clears the topic.
    pub fn clear(topic: String) -> Self {
        Self {
            topic,
            payload: String::new(),
            retained: true,
        }
    }

    /// Is this a clear?
    pub fn is_clear(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Side effect requested by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Subscribe to a full topic name.
    Subscribe(String),
    /// Publish a payload.
    Publish(Outbound),
    /// Deliver `timer` back after `after`.
    Schedule {
        /// Timer to fire.
        timer: Timer,
        /// Delay.
        after: Duration,
    },
    /// Hand a render event to listeners.
    Emit(GameEvent),
}
