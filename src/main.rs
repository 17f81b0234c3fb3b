//! Light & Heavy Demo
//!
//! Starts two peers on an in-process bus, lets a scripted player drive each
//! side through one game, then resets both so the loser opens the rematch.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use light_and_heavy::{
    core::nonce, spawn_peer, Board, GameEvent, MemoryBus, Outcome, PeerConfig, PeerHandle,
    Player, Weight, VERSION,
};

/// Upper bound on the scripted game.
const DEMO_TIMEOUT: Duration = Duration::from_secs(60);

/// How a scripted side saw the game end.
struct Finished {
    role: Option<Player>,
    outcome: Outcome,
    board: Board,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Light & Heavy v{}", VERSION);

    let mut config = PeerConfig::from_env();
    if config.secret.is_empty() {
        warn!("LIGHT_HEAVY_SECRET not set, using the demo secret");
        config.secret = "light-and-heavy-demo".to_string();
    }

    let bus = MemoryBus::new();
    let first = spawn_peer(bus.client(nonce::client_id()), config.clone())?;
    let mut first_events = first.subscribe();
    let second = spawn_peer(bus.client(nonce::client_id()), config)?;
    let mut second_events = second.subscribe();
    info!(first = first.client_id(), second = second.client_id(), "peers started");

    let (a, b) = tokio::time::timeout(DEMO_TIMEOUT, async {
        tokio::try_join!(
            autoplay(&first, &mut first_events),
            autoplay(&second, &mut second_events)
        )
    })
    .await
    .context("demo game timed out")??;

    if a.board != b.board {
        bail!("peers disagree on the final board");
    }
    match &a.outcome {
        Outcome::Win(line) => info!(
            winner = line.player.number(),
            cells = ?line.cells,
            "game won"
        ),
        Outcome::Draw => info!("game drawn"),
    }
    info!(
        first_role = ?a.role.map(Player::number),
        second_role = ?b.role.map(Player::number),
        "final board:\n{}",
        a.board
    );

    first.reset().await?;
    second.reset().await?;
    let opener = next_turn(&mut first_events).await?;
    info!(turn = opener.number(), "rematch ready, loser moves first");

    first.shutdown().await?;
    second.shutdown().await?;
    Ok(())
}

/// Moves a side tries in order, by role.
fn script(role: Player) -> Vec<(usize, Weight)> {
    match role {
        Player::One => vec![
            (0, Weight::Light),
            (1, Weight::Light),
            (2, Weight::Light),
            (3, Weight::Light),
        ],
        Player::Two => vec![
            (6, Weight::Light),
            (5, Weight::Light),
            (4, Weight::Light),
            (6, Weight::Heavy),
        ],
    }
}

/// Play from the script whenever it is this side's turn, until the game ends.
async fn autoplay(peer: &PeerHandle, events: &mut Receiver<GameEvent>) -> Result<Finished> {
    let mut role = None;
    let mut moves = Vec::new().into_iter();
    let mut board = Board::new();

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event listener lagged");
                continue;
            }
            Err(RecvError::Closed) => bail!("peer {} stopped", peer.client_id()),
        };

        match event {
            GameEvent::RoleAssigned { role: assigned, peer_id } => {
                info!(client_id = peer.client_id(), peer_id, role = assigned.number(), "role assigned");
                role = Some(assigned);
                moves = script(assigned).into_iter();
            }
            GameEvent::BoardChanged { board: snapshot, .. } => board = snapshot,
            GameEvent::TurnChanged { local: true, .. } | GameEvent::MoveRejected { .. } => {
                let Some((column, weight)) = moves.next() else {
                    bail!("script for {} ran out of moves", peer.client_id());
                };
                peer.drop_piece(column, weight).await?;
            }
            GameEvent::GameEnded { outcome, .. } => {
                return Ok(Finished {
                    role,
                    outcome,
                    board,
                })
            }
            GameEvent::ConnectionFailed { attempts } => {
                bail!("{} could not connect after {} attempts", peer.client_id(), attempts)
            }
            _ => {}
        }
    }
}

/// Wait for the next turn announcement.
async fn next_turn(events: &mut Receiver<GameEvent>) -> Result<Player> {
    loop {
        match events.recv().await {
            Ok(GameEvent::TurnChanged { turn, .. }) => return Ok(turn),
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => bail!("peer stopped before the rematch"),
        }
    }
}
