//! Two peers on an in-process bus, end to end.

use std::time::Duration;

use tokio::sync::broadcast::{error::RecvError, Receiver};

use light_and_heavy::config::ConfigError;
use light_and_heavy::network::bus::{BusClient, MemoryBus};
use light_and_heavy::network::moves::MoveProtocol;
use light_and_heavy::network::protocol::{Topic, DEFAULT_TOPIC_PREFIX};
use light_and_heavy::{
    spawn_peer, Board, GameEvent, Outcome, PeerConfig, PeerError, PeerHandle, Player, Weight,
};

const SECRET: &str = "integration-secret";
const LOW_ID: &str = "client_00000001";
const HIGH_ID: &str = "client_00000002";

async fn next_event<F>(events: &mut Receiver<GameEvent>, mut wanted: F) -> GameEvent
where
    F: FnMut(&GameEvent) -> bool,
{
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if wanted(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event stream closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(120), wait)
        .await
        .expect("timed out waiting for event")
}

async fn role_of(events: &mut Receiver<GameEvent>) -> Player {
    match next_event(events, |e| matches!(e, GameEvent::RoleAssigned { .. })).await {
        GameEvent::RoleAssigned { role, .. } => role,
        _ => unreachable!(),
    }
}

/// Play `script` on every local turn until the game ends.
async fn play(
    peer: &PeerHandle,
    events: &mut Receiver<GameEvent>,
    script: &[(usize, Weight)],
) -> (Board, Outcome) {
    let mut moves = script.iter().copied();
    let mut board = Board::new();
    loop {
        let event = next_event(events, |_| true).await;
        match event {
            GameEvent::BoardChanged { board: snapshot, .. } => board = snapshot,
            GameEvent::TurnChanged { local: true, .. } => {
                let (column, weight) = moves.next().expect("script ran out");
                peer.drop_piece(column, weight).await.unwrap();
            }
            GameEvent::MoveRejected { reason, .. } => panic!("move rejected: {reason}"),
            GameEvent::GameEnded { outcome, .. } => return (board, outcome),
            _ => {}
        }
    }
}

fn start(bus: &MemoryBus, id: &str) -> (PeerHandle, Receiver<GameEvent>) {
    let peer = spawn_peer(bus.client(id), PeerConfig::with_secret(SECRET)).unwrap();
    let events = peer.subscribe();
    (peer, events)
}

#[tokio::test(start_paused = true)]
async fn test_handshake_assigns_complementary_roles() {
    let bus = MemoryBus::new();
    let (high, mut high_events) = start(&bus, HIGH_ID);
    let (low, mut low_events) = start(&bus, LOW_ID);

    assert_eq!(role_of(&mut low_events).await, Player::One);
    assert_eq!(role_of(&mut high_events).await, Player::Two);

    // Let the retries lapse, then check what the bus kept
    tokio::time::sleep(Duration::from_secs(10)).await;
    let challenge = Topic::Challenge.path(DEFAULT_TOPIC_PREFIX);
    let accepted = Topic::ChallengeAccepted.path(DEFAULT_TOPIC_PREFIX);
    assert_eq!(bus.retained(&challenge).await, None);
    assert!(bus.retained(&accepted).await.is_some());

    low.shutdown().await.unwrap();
    high.shutdown().await.unwrap();
}

/// Start `first`, wait out its challenge retry, then start `second`.
async fn late_join(first_id: &str, second_id: &str) -> (Player, Player) {
    let bus = MemoryBus::new();
    let (first, mut first_events) = start(&bus, first_id);

    tokio::time::sleep(Duration::from_secs(20)).await;
    let challenge = Topic::Challenge.path(DEFAULT_TOPIC_PREFIX);
    assert!(bus.retained(&challenge).await.is_some());

    let (second, mut second_events) = start(&bus, second_id);
    let roles = (
        role_of(&mut first_events).await,
        role_of(&mut second_events).await,
    );

    first.shutdown().await.unwrap();
    second.shutdown().await.unwrap();
    roles
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_with_larger_id() {
    assert_eq!(late_join(LOW_ID, HIGH_ID).await, (Player::One, Player::Two));
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_with_smaller_id() {
    assert_eq!(late_join(HIGH_ID, LOW_ID).await, (Player::Two, Player::One));
}

#[tokio::test(start_paused = true)]
async fn test_scripted_game_and_rematch() {
    let bus = MemoryBus::new();
    let (one, mut one_events) = start(&bus, LOW_ID);
    let (two, mut two_events) = start(&bus, HIGH_ID);

    let one_script = [
        (0, Weight::Light),
        (1, Weight::Light),
        (2, Weight::Light),
        (3, Weight::Light),
    ];
    let two_script = [(6, Weight::Light), (5, Weight::Light), (4, Weight::Light)];

    let ((one_board, one_outcome), (two_board, two_outcome)) = tokio::join!(
        play(&one, &mut one_events, &one_script),
        play(&two, &mut two_events, &two_script)
    );

    assert_eq!(one_board, two_board);
    assert_eq!(one_outcome, two_outcome);
    let Outcome::Win(line) = one_outcome else {
        panic!("expected a win");
    };
    assert_eq!(line.player, Player::One);
    assert_eq!(line.cells, [(0, 0), (0, 1), (0, 2), (0, 3)]);

    one.reset().await.unwrap();
    let rematch = next_event(&mut two_events, |e| {
        matches!(e, GameEvent::RematchRequested { .. })
    })
    .await;
    assert_eq!(
        rematch,
        GameEvent::RematchRequested {
            peer_id: LOW_ID.to_string()
        }
    );

    two.reset().await.unwrap();
    let turn = next_event(&mut two_events, |e| matches!(e, GameEvent::TurnChanged { .. })).await;
    assert_eq!(
        turn,
        GameEvent::TurnChanged {
            turn: Player::Two,
            local: true
        }
    );

    two.drop_piece(3, Weight::Heavy).await.unwrap();
    let changed = next_event(&mut one_events, |e| matches!(e, GameEvent::BoardChanged { last_move: Some(_), .. })).await;
    let GameEvent::BoardChanged { board, .. } = changed else {
        unreachable!()
    };
    assert_eq!(board.column_count(3), 1);

    one.shutdown().await.unwrap();
    two.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_forged_traffic_is_ignored() {
    let bus = MemoryBus::new();

    // A stranger's stale offer, signed with the wrong secret, is still retained
    let stranger = bus.client("client_ffffffff");
    stranger.connect().await.unwrap();
    let forged = MoveProtocol::from_secret("wrong")
        .encode_challenge("client_ffffffff", "nonce_deadbeef")
        .to_json()
        .unwrap();
    stranger
        .publish(&Topic::Challenge.path(DEFAULT_TOPIC_PREFIX), forged.as_bytes(), true)
        .await
        .unwrap();

    let (a, mut a_events) = start(&bus, LOW_ID);
    let (b, mut b_events) = start(&bus, HIGH_ID);

    match next_event(&mut a_events, |e| matches!(e, GameEvent::RoleAssigned { .. })).await {
        GameEvent::RoleAssigned { role, peer_id } => {
            assert_eq!(role, Player::One);
            assert_eq!(peer_id, HIGH_ID);
        }
        _ => unreachable!(),
    }
    assert_eq!(role_of(&mut b_events).await, Player::Two);

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_connects_after_transient_failures() {
    let bus = MemoryBus::new();
    bus.refuse_connections(3).await;

    let (a, mut a_events) = start(&bus, LOW_ID);
    let (b, mut b_events) = start(&bus, HIGH_ID);

    assert_eq!(role_of(&mut a_events).await, Player::One);
    assert_eq!(role_of(&mut b_events).await, Player::Two);

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_connection_failure_is_terminal() {
    let bus = MemoryBus::new();
    bus.refuse_connections(10).await;

    let (peer, mut events) = start(&bus, LOW_ID);
    let failed = next_event(&mut events, |e| matches!(e, GameEvent::ConnectionFailed { .. })).await;
    assert_eq!(failed, GameEvent::ConnectionFailed { attempts: 4 });

    match peer.join().await {
        Err(PeerError::ConnectFailed { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_missing_secret_refused() {
    let bus = MemoryBus::new();
    let result = spawn_peer(bus.client(LOW_ID), PeerConfig::default());
    assert!(matches!(
        result,
        Err(PeerError::Config(ConfigError::MissingSecret))
    ));
}
