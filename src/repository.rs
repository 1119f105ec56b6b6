//! Game persistence and construction: the `GameRepository` trait (the
//! persisted `games`/`moves` store contract) and the `GameFactory`
//! trait (mints a fresh `Game` for two paired players). SQL/ORM
//! backends are out of scope; both traits ship only in-memory
//! implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::game::{Game, MoveRecord};
use crate::ids::GameId;
use crate::player::Player;
use crate::types::{GameEndReason, GameStatus};

/// A persisted snapshot of a game: enough to reconstruct its history
/// and final status without needing the live `Game` aggregate.
#[derive(Debug, Clone)]
pub struct StoredGame {
    pub id: GameId,
    pub white: Player,
    pub black: Player,
    pub status: GameStatus,
    pub end_reason: Option<GameEndReason>,
    pub moves: Vec<MoveRecord>,
}

impl From<&Game> for StoredGame {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            white: game.white,
            black: game.black,
            status: game.status,
            end_reason: game.end_reason,
            moves: game.move_history.clone(),
        }
    }
}

/// The persisted-state contract for games: `save` is called after
/// every successful mutation (move, resignation, draw), preserving
/// move order via `MoveRecord::move_number`.
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn save(&self, game: &Game) -> Result<(), CoreError>;
    async fn load(&self, id: GameId) -> Result<Option<StoredGame>, CoreError>;
    async fn delete(&self, id: GameId) -> Result<(), CoreError>;
}

/// A `RwLock<HashMap<..>>`-backed repository. Games vanish on process
/// restart — acceptable, since durable multi-instance persistence is
/// explicitly out of scope.
pub struct InMemoryGameRepository {
    games: RwLock<HashMap<GameId, StoredGame>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryGameRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn save(&self, game: &Game) -> Result<(), CoreError> {
        self.games
            .write()
            .map_err(|_| CoreError::PersistenceFailure("game store lock poisoned".to_string()))?
            .insert(game.id, StoredGame::from(game));
        Ok(())
    }

    async fn load(&self, id: GameId) -> Result<Option<StoredGame>, CoreError> {
        Ok(self
            .games
            .read()
            .map_err(|_| CoreError::PersistenceFailure("game store lock poisoned".to_string()))?
            .get(&id)
            .cloned())
    }

    async fn delete(&self, id: GameId) -> Result<(), CoreError> {
        self.games
            .write()
            .map_err(|_| CoreError::PersistenceFailure("game store lock poisoned".to_string()))?
            .remove(&id);
        Ok(())
    }
}

/// Mints a new `Game` for two paired players. Fallible so a real
/// backend (one that persists the initial position before handing the
/// game back) has somewhere to report a write failure; the matchmaker
/// re-enqueues both players on `Err` rather than losing them.
pub trait GameFactory: Send + Sync {
    fn create_game(&self, white: Player, black: Player) -> Result<Game, CoreError>;
}

pub struct StandardGameFactory;

impl GameFactory for StandardGameFactory {
    fn create_game(&self, white: Player, black: Player) -> Result<Game, CoreError> {
        Ok(Game::new(white, black))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::types::Color;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let repo = InMemoryGameRepository::new();
        let white = Player::new(UserId::new(), Color::White);
        let black = Player::new(UserId::new(), Color::Black);
        let game = Game::new(white, black);
        let id = game.id;

        repo.save(&game).await.unwrap();
        let loaded = repo.load(id).await.unwrap().expect("game should exist");
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.status, GameStatus::InProgress);

        repo.delete(id).await.unwrap();
        assert!(repo.load(id).await.unwrap().is_none());
    }

    #[test]
    fn standard_factory_builds_a_fresh_game() {
        let factory = StandardGameFactory;
        let white = Player::new(UserId::new(), Color::White);
        let black = Player::new(UserId::new(), Color::Black);
        let game = factory.create_game(white, black).unwrap();
        assert_eq!(game.status, GameStatus::InProgress);
    }
}
