//! Registry mapping a live `GameId` to its `GameSessionActor` address.
//! The matchmaker inserts on pairing; the WebSocket route handlers look
//! games up here when a player or spectator connects to
//! `/ws/game/{gameId}`. A plain `RwLock<HashMap<..>>` is enough — reads
//! vastly outnumber writes and there is no cross-key invariant to
//! protect.

use std::collections::HashMap;
use std::sync::RwLock;

use actix::Addr;

use crate::ids::GameId;
use crate::session::GameSessionActor;

#[derive(Default)]
pub struct SessionDirectory {
    sessions: RwLock<HashMap<GameId, Addr<GameSessionActor>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, game_id: GameId, addr: Addr<GameSessionActor>) {
        self.sessions
            .write()
            .expect("session directory lock poisoned")
            .insert(game_id, addr);
    }

    pub fn get(&self, game_id: GameId) -> Option<Addr<GameSessionActor>> {
        self.sessions
            .read()
            .expect("session directory lock poisoned")
            .get(&game_id)
            .cloned()
    }

    pub fn remove(&self, game_id: GameId) {
        self.sessions
            .write()
            .expect("session directory lock poisoned")
            .remove(&game_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FirstLegalMoveBot, NeverBot};
    use crate::game::Game;
    use crate::ids::UserId;
    use crate::player::Player;
    use crate::repository::InMemoryGameRepository;
    use crate::types::Color;
    use std::sync::Arc;

    #[actix::test]
    async fn insert_then_get_returns_the_same_address() {
        let directory = SessionDirectory::new();
        let white = Player::new(UserId::new(), Color::White);
        let black = Player::new(UserId::new(), Color::Black);
        let game = Game::new(white, black);
        let game_id = game.id;

        let addr = GameSessionActor::new(
            game,
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(NeverBot),
            Arc::new(FirstLegalMoveBot),
        )
        .start();

        directory.insert(game_id, addr);
        assert!(directory.get(game_id).is_some());
        directory.remove(game_id);
        assert!(directory.get(game_id).is_none());
    }
}
