//! End-to-end scenarios driving `MatchmakerActor` the way
//! `MatchmakingConn` would: join/leave with a recorder standing in for
//! the WebSocket connection, and assert on what each side is told.

mod support;

use std::sync::Arc;

use actix::prelude::*;

use chessmate::collaborators::{
    Clock, FirstLegalMoveBot, InMemoryUserExistenceChecker, NeverBot, RandomSource,
};
use chessmate::ids::UserId;
use chessmate::matchmaker::{Join, Leave, MatchmakerActor};
use chessmate::protocol::ServerMatchmakingMessage;
use chessmate::repository::{InMemoryGameRepository, StandardGameFactory};
use chessmate::session_directory::SessionDirectory;
use chessmate::types::Color;

struct FixedClock;
impl Clock for FixedClock {
    fn now_unix_millis(&self) -> u64 {
        0
    }
}

struct FixedWhite;
impl RandomSource for FixedWhite {
    fn random_color(&self) -> Color {
        Color::White
    }
}

fn start_matchmaker(
    checker: Arc<InMemoryUserExistenceChecker>,
) -> Addr<MatchmakerActor> {
    MatchmakerActor::new(
        checker,
        Arc::new(FixedWhite),
        Arc::new(FixedClock),
        Arc::new(StandardGameFactory),
        Arc::new(InMemoryGameRepository::new()),
        Arc::new(NeverBot),
        Arc::new(FirstLegalMoveBot),
        Arc::new(SessionDirectory::new()),
    )
    .start()
}

#[actix::test]
async fn two_queued_users_are_paired_with_opposite_sides() {
    let checker = Arc::new(InMemoryUserExistenceChecker::new());
    let user1 = UserId::new();
    let user2 = UserId::new();
    checker.register(user1);
    checker.register(user2);
    let matchmaker = start_matchmaker(checker);

    let conn1 = support::MatchRecorder::default().start();
    let conn2 = support::MatchRecorder::default().start();

    matchmaker
        .send(Join {
            user_id: user1,
            conn: conn1.clone().recipient(),
        })
        .await
        .unwrap()
        .unwrap();
    matchmaker
        .send(Join {
            user_id: user2,
            conn: conn2.clone().recipient(),
        })
        .await
        .unwrap()
        .unwrap();

    let seen1 = conn1.send(support::GetMatchMessages).await.unwrap();
    let seen2 = conn2.send(support::GetMatchMessages).await.unwrap();

    let found1 = seen1
        .iter()
        .find_map(|m| match m {
            ServerMatchmakingMessage::MatchFound { game_id, side, .. } => Some((*game_id, *side)),
            _ => None,
        })
        .expect("user1 should have been paired");
    let found2 = seen2
        .iter()
        .find_map(|m| match m {
            ServerMatchmakingMessage::MatchFound { game_id, side, .. } => Some((*game_id, *side)),
            _ => None,
        })
        .expect("user2 should have been paired");

    assert_eq!(found1.0, found2.0, "both sides should join the same game");
    assert_ne!(found1.1, found2.1, "the two sides must be opposite colors");
}

#[actix::test]
async fn a_lone_queued_user_receives_a_queue_position_update() {
    let checker = Arc::new(InMemoryUserExistenceChecker::new());
    let user = UserId::new();
    checker.register(user);
    let matchmaker = start_matchmaker(checker);
    let conn = support::MatchRecorder::default().start();

    matchmaker
        .send(Join {
            user_id: user,
            conn: conn.clone().recipient(),
        })
        .await
        .unwrap()
        .unwrap();

    let seen = conn.send(support::GetMatchMessages).await.unwrap();
    assert!(seen
        .iter()
        .any(|m| matches!(m, ServerMatchmakingMessage::QueuePositionUpdate { .. })));
    assert!(!seen
        .iter()
        .any(|m| matches!(m, ServerMatchmakingMessage::MatchFound { .. })));
}

#[actix::test]
async fn joining_twice_without_leaving_is_rejected() {
    let checker = Arc::new(InMemoryUserExistenceChecker::new());
    let user = UserId::new();
    checker.register(user);
    let matchmaker = start_matchmaker(checker);
    let conn = support::MatchRecorder::default().start();

    matchmaker
        .send(Join {
            user_id: user,
            conn: conn.clone().recipient(),
        })
        .await
        .unwrap()
        .unwrap();

    let second = matchmaker
        .send(Join {
            user_id: user,
            conn: conn.clone().recipient(),
        })
        .await
        .unwrap();
    assert!(second.is_err());
}

#[actix::test]
async fn unknown_user_is_rejected_and_told_why() {
    let checker = Arc::new(InMemoryUserExistenceChecker::new());
    let matchmaker = start_matchmaker(checker);
    let conn = support::MatchRecorder::default().start();
    let stranger = UserId::new();

    let result = matchmaker
        .send(Join {
            user_id: stranger,
            conn: conn.clone().recipient(),
        })
        .await
        .unwrap();
    assert!(result.is_err());

    let seen = conn.send(support::GetMatchMessages).await.unwrap();
    assert!(matches!(
        seen.last(),
        Some(ServerMatchmakingMessage::Error { .. })
    ));
}

#[actix::test]
async fn leaving_the_queue_prevents_a_later_pairing() {
    let checker = Arc::new(InMemoryUserExistenceChecker::new());
    let user1 = UserId::new();
    let user2 = UserId::new();
    checker.register(user1);
    checker.register(user2);
    let matchmaker = start_matchmaker(checker);

    let conn1 = support::MatchRecorder::default().start();
    let conn2 = support::MatchRecorder::default().start();

    matchmaker
        .send(Join {
            user_id: user1,
            conn: conn1.recipient(),
        })
        .await
        .unwrap()
        .unwrap();
    matchmaker.send(Leave { user_id: user1 }).await.unwrap();

    matchmaker
        .send(Join {
            user_id: user2,
            conn: conn2.clone().recipient(),
        })
        .await
        .unwrap()
        .unwrap();

    let seen2 = conn2.send(support::GetMatchMessages).await.unwrap();
    assert!(!seen2
        .iter()
        .any(|m| matches!(m, ServerMatchmakingMessage::MatchFound { .. })));
}
