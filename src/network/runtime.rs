//! Peer Runtime
//!
//! Runs one peer as a tokio task: connects with retry, then feeds bus
//! deliveries, operator commands and fired timers one at a time into the
//! [`GameController`] and performs the effects it returns. All state is
//! owned by that task, so events are strictly serialized.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, ConnectPolicy, PeerConfig};
use crate::game::board::Weight;
use crate::game::events::GameEvent;
use crate::network::bus::{BusClient, BusError, BusMessage};
use crate::network::controller::{ControllerEvent, GameController};
use crate::network::effect::{Effect, Timer};

/// Command queue depth.
const COMMAND_BUFFER: usize = 64;

/// Render event fan-out depth.
const EVENT_BUFFER: usize = 256;

/// Runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Configuration rejected before connecting.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Every connection attempt failed.
    #[error("unable to connect after {attempts} attempts: {source}")]
    ConnectFailed {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        #[source]
        source: BusError,
    },

    /// Bus operation failed after connecting.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The bus closed the delivery stream.
    #[error("bus connection closed")]
    Disconnected,

    /// The peer task has already stopped.
    #[error("peer task stopped")]
    Stopped,

    /// The peer task panicked or was cancelled.
    #[error("peer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Operator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCommand {
    /// Drop a piece for the local player.
    DropPiece {
        /// Column.
        column: usize,
        /// Weight.
        weight: Weight,
    },
    /// Start a new game.
    Reset,
    /// Stop the peer.
    Shutdown,
}

/// Handle to a running peer.
pub struct PeerHandle {
    client_id: String,
    commands: mpsc::Sender<PeerCommand>,
    events: broadcast::Sender<GameEvent>,
    task: JoinHandle<Result<(), PeerError>>,
}

impl PeerHandle {
    /// Peer's client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Listen for render events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Ask the local player to drop a piece.
    pub async fn drop_piece(&self, column: usize, weight: Weight) -> Result<(), PeerError> {
        self.send(PeerCommand::DropPiece { column, weight }).await
    }

    /// Start a new game.
    pub async fn reset(&self) -> Result<(), PeerError> {
        self.send(PeerCommand::Reset).await
    }

    /// Stop the peer and wait for it.
    pub async fn shutdown(self) -> Result<(), PeerError> {
        // The task may already have ended on its own
        let _ = self.commands.send(PeerCommand::Shutdown).await;
        self.task.await?
    }

    /// Wait for the peer to stop on its own.
    pub async fn join(self) -> Result<(), PeerError> {
        self.task.await?
    }

    async fn send(&self, command: PeerCommand) -> Result<(), PeerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PeerError::Stopped)
    }
}

/// Validate `config` and start a peer on `client`.
pub fn spawn_peer<C: BusClient>(client: C, config: PeerConfig) -> Result<PeerHandle, PeerError> {
    config.validate()?;

    let client_id = client.client_id().to_string();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let controller = GameController::new(&config, client_id.clone());
    let task = tokio::spawn(run_peer(
        client,
        controller,
        config.connect,
        command_rx,
        event_tx.clone(),
    ));

    Ok(PeerHandle {
        client_id,
        commands: command_tx,
        events: event_tx,
        task,
    })
}

/// Connect, retrying with a fixed backoff.
///
/// Makes one attempt plus `policy.retries` retries, then gives up.
pub async fn connect_with_retry<C: BusClient>(
    client: &C,
    policy: &ConnectPolicy,
) -> Result<mpsc::UnboundedReceiver<BusMessage>, PeerError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match client.connect().await {
            Ok(deliveries) => {
                info!(attempts, "connected to bus");
                return Ok(deliveries);
            }
            Err(e) if attempts < policy.max_attempts() => {
                warn!(attempts, error = %e, "bus connection failed, retrying in {:?}", policy.backoff);
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => {
                error!(attempts, error = %e, "giving up on bus connection");
                return Err(PeerError::ConnectFailed {
                    attempts,
                    source: e,
                });
            }
        }
    }
}

#[instrument(skip_all, fields(client_id = %controller.client_id()))]
async fn run_peer<C: BusClient>(
    client: C,
    mut controller: GameController,
    policy: ConnectPolicy,
    mut commands: mpsc::Receiver<PeerCommand>,
    events: broadcast::Sender<GameEvent>,
) -> Result<(), PeerError> {
    let mut deliveries = match connect_with_retry(&client, &policy).await {
        Ok(deliveries) => deliveries,
        Err(e) => {
            if let PeerError::ConnectFailed { attempts, .. } = &e {
                let _ = events.send(GameEvent::ConnectionFailed {
                    attempts: *attempts,
                });
            }
            return Err(e);
        }
    };

    let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<Timer>();
    let mut effects = controller.handle(ControllerEvent::Connected);

    loop {
        perform(&client, effects, &timer_tx, &events).await?;

        let event = tokio::select! {
            delivery = deliveries.recv() => match delivery {
                Some(BusMessage { topic, payload }) => {
                    ControllerEvent::MessageArrived { topic, payload }
                }
                None => {
                    error!("bus connection lost");
                    return Err(PeerError::Disconnected);
                }
            },
            Some(timer) = timer_rx.recv() => ControllerEvent::TimerFired(timer),
            command = commands.recv() => match command {
                Some(PeerCommand::DropPiece { column, weight }) => {
                    ControllerEvent::LocalMoveRequested { column, weight }
                }
                Some(PeerCommand::Reset) => ControllerEvent::ResetRequested,
                Some(PeerCommand::Shutdown) | None => {
                    info!("peer shutting down");
                    return Ok(());
                }
            },
        };

        effects = controller.handle(event);
    }
}

async fn perform<C: BusClient>(
    client: &C,
    effects: Vec<Effect>,
    timers: &mpsc::UnboundedSender<Timer>,
    events: &broadcast::Sender<GameEvent>,
) -> Result<(), PeerError> {
    for effect in effects {
        match effect {
            Effect::Subscribe(topic) => {
                client.subscribe(&topic).await?;
                debug!(topic, "subscribed");
            }
            Effect::Publish(out) => {
                if let Err(e) = client
                    .publish(&out.topic, out.payload.as_bytes(), out.retained)
                    .await
                {
                    warn!(topic = %out.topic, error = %e, "publish failed");
                }
            }
            Effect::Schedule { timer, after } => {
                let timers = timers.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = timers.send(timer);
                });
            }
            Effect::Emit(event) => {
                debug!(event = event.name(), "emit");
                // No listeners is fine
                let _ = events.send(event);
            }
        }
    }
    Ok(())
}
