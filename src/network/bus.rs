//! Message Bus
//!
//! Abstract last-value pub/sub bus, plus an in-process implementation.
//!
//! The peers only need four things from a bus: connect, subscribe, publish,
//! and per-topic retention (the latest retained payload is handed to every
//! new subscriber; an empty retained publish clears it). Ordering holds per
//! topic only, and the publisher receives its own messages.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// A delivery from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Full topic name.
    pub topic: String,
    /// Raw payload; empty means cleared.
    pub payload: Vec<u8>,
}

/// Bus errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// Broker refused or could not be reached.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Operation needs an open connection.
    #[error("not connected")]
    NotConnected,
}

/// Client side of a pub/sub bus.
#[async_trait]
pub trait BusClient: Send + Sync + 'static {
    /// Identity presented to the broker.
    fn client_id(&self) -> &str;

    /// Open a connection. Deliveries for every later subscription arrive on
    /// the returned receiver; it closes when the connection drops.
    async fn connect(&self) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError>;

    /// Subscribe to a topic. A retained payload, if any, is delivered at once.
    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;

    /// Publish a payload.
    async fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), BusError>;
}

// =============================================================================
// IN-PROCESS BUS
// =============================================================================

struct Connection {
    sender: mpsc::UnboundedSender<BusMessage>,
    topics: BTreeSet<String>,
}

#[derive(Default)]
struct BusState {
    retained: BTreeMap<String, Vec<u8>>,
    connections: BTreeMap<String, Connection>,
    refuse_connects: u32,
}

/// In-process bus shared by any number of clients.
#[derive(Clone, Default)]
pub struct MemoryBus {
    state: Arc<RwLock<BusState>>,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client handle presenting `client_id`.
    pub fn client(&self, client_id: impl Into<String>) -> MemoryBusClient {
        MemoryBusClient {
            bus: self.clone(),
            client_id: client_id.into(),
        }
    }

    /// Refuse the next `count` connection attempts.
    pub async fn refuse_connections(&self, count: u32) {
        self.state.write().await.refuse_connects = count;
    }

    /// Retained payload on `topic`.
    pub async fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.state.read().await.retained.get(topic).cloned()
    }

    /// Drop a client's connection; its receiver closes.
    pub async fn disconnect(&self, client_id: &str) {
        self.state.write().await.connections.remove(client_id);
    }
}

/// One client of a [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryBusClient {
    bus: MemoryBus,
    client_id: String,
}

#[async_trait]
impl BusClient for MemoryBusClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn connect(&self) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError> {
        let mut state = self.bus.state.write().await;
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(BusError::ConnectionRefused("broker unavailable".into()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        // A reconnect with the same id takes over the old session
        state.connections.insert(
            self.client_id.clone(),
            Connection {
                sender,
                topics: BTreeSet::new(),
            },
        );
        debug!(client_id = %self.client_id, "bus connection opened");
        Ok(receiver)
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        let mut state = self.bus.state.write().await;
        let BusState {
            retained,
            connections,
            ..
        } = &mut *state;

        let connection = connections
            .get_mut(&self.client_id)
            .ok_or(BusError::NotConnected)?;
        if connection.topics.insert(topic.to_string()) {
            if let Some(payload) = retained.get(topic) {
                let _ = connection.sender.send(BusMessage {
                    topic: topic.to_string(),
                    payload: payload.clone(),
                });
            }
        }
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), BusError> {
        let mut state = self.bus.state.write().await;
        if !state.connections.contains_key(&self.client_id) {
            return Err(BusError::NotConnected);
        }

        if retained {
            if payload.is_empty() {
                state.retained.remove(topic);
            } else {
                state.retained.insert(topic.to_string(), payload.to_vec());
            }
        }

        let mut closed = Vec::new();
        for (id, connection) in &state.connections {
            if !connection.topics.contains(topic) {
                continue;
            }
            let message = BusMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            };
            if connection.sender.send(message).is_err() {
                closed.push(id.clone());
            }
        }
        for id in closed {
            state.connections.remove(&id);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
