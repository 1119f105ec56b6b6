//! External collaborator traits (ports). Production JWT/DB/bot
//! backends are out of scope — this module ships only the in-memory
//! and test implementations a caller wires in by default.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;

use crate::error::CoreError;
use crate::ids::{GameId, UserId};
use crate::types::{Color, Move};

/// Checks whether a `UserId` corresponds to a known account. Backed in
/// production by a user-service call; here, by a fixed in-memory set.
#[async_trait]
pub trait UserExistenceChecker: Send + Sync {
    async fn exists(&self, user_id: UserId) -> Result<bool, CoreError>;

    /// Records that `user_id` successfully authenticated, so a checker
    /// backed by a live user service can treat that as sufficient
    /// evidence of existence. A no-op by default; the in-memory
    /// implementation is the one that actually needs it.
    async fn register(&self, _user_id: UserId) -> Result<(), CoreError> {
        Ok(())
    }
}

pub struct InMemoryUserExistenceChecker {
    known: RwLock<HashSet<UserId>>,
}

impl InMemoryUserExistenceChecker {
    pub fn new() -> Self {
        Self {
            known: RwLock::new(HashSet::new()),
        }
    }

    pub fn register(&self, user_id: UserId) {
        self.known.write().expect("lock poisoned").insert(user_id);
    }
}

impl Default for InMemoryUserExistenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserExistenceChecker for InMemoryUserExistenceChecker {
    async fn exists(&self, user_id: UserId) -> Result<bool, CoreError> {
        Ok(self.known.read().expect("lock poisoned").contains(&user_id))
    }

    async fn register(&self, user_id: UserId) -> Result<(), CoreError> {
        self.known.write().expect("lock poisoned").insert(user_id);
        Ok(())
    }
}

/// Wall-clock access, abstracted so matchmaking TTL logic is
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now_unix_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_millis() as u64
    }
}

/// A fixed clock for deterministic tests.
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix_millis(&self) -> u64 {
        self.0
    }
}

/// Randomness, abstracted so color assignment is deterministic under
/// test.
pub trait RandomSource: Send + Sync {
    /// Returns a uniformly random color for the coin-flip side
    /// assignment at match time.
    fn random_color(&self) -> Color;
}

pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn random_color(&self) -> Color {
        if rand::thread_rng().gen_bool(0.5) {
            Color::White
        } else {
            Color::Black
        }
    }
}

/// A source that always returns the same color — for tests that need
/// to pin which side a player gets.
pub struct FixedRandomSource(pub Color);

impl RandomSource for FixedRandomSource {
    fn random_color(&self) -> Color {
        self.0
    }
}

/// Decides whether the side to move in a given game is a bot, so the
/// `GameSessionActor` knows whether to schedule a bot move after a
/// human move completes.
#[async_trait]
pub trait BotPredicate: Send + Sync {
    async fn is_bot(&self, user_id: UserId) -> Result<bool, CoreError>;
}

pub struct NeverBot;

#[async_trait]
impl BotPredicate for NeverBot {
    async fn is_bot(&self, _user_id: UserId) -> Result<bool, CoreError> {
        Ok(false)
    }
}

/// Computes a bot's move for a given game. Swappable for a real engine
/// backend; the bundled implementation just plays the first legal move,
/// which is sufficient to exercise the bot-scheduling path in tests.
#[async_trait]
pub trait BotEngine: Send + Sync {
    async fn choose_move(&self, game_id: GameId, legal_moves: &[Move]) -> Result<Move, CoreError>;
}

pub struct FirstLegalMoveBot;

#[async_trait]
impl BotEngine for FirstLegalMoveBot {
    async fn choose_move(&self, game_id: GameId, legal_moves: &[Move]) -> Result<Move, CoreError> {
        legal_moves
            .first()
            .copied()
            .ok_or(CoreError::GameNotFound(game_id))
    }
}

/// Resolves a bearer token to the `UserId` that presented it.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<UserId, CoreError>;
}

/// Treats the bearer token as a literal ULID-encoded `UserId`. Not a
/// real auth scheme — there is no signature or expiry check — but
/// enough to exercise the authenticated-connection path without a JWT
/// stack.
pub struct StaticTokenAuthenticator;

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, CoreError> {
        token
            .parse()
            .map_err(|_| CoreError::AuthFailed(format!("'{token}' is not a valid user token")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_user_does_not_exist() {
        let checker = InMemoryUserExistenceChecker::new();
        let user = UserId::new();
        assert!(!checker.exists(user).await.unwrap());
        checker.register(user);
        assert!(checker.exists(user).await.unwrap());
    }

    #[tokio::test]
    async fn static_token_authenticator_parses_ulid_tokens() {
        let user = UserId::new();
        let auth = StaticTokenAuthenticator;
        let resolved = auth.authenticate(&user.to_string()).await.unwrap();
        assert_eq!(resolved, user);
        assert!(auth.authenticate("not-a-ulid").await.is_err());
    }

    #[test]
    fn fixed_random_source_always_returns_configured_color() {
        let source = FixedRandomSource(Color::Black);
        assert_eq!(source.random_color(), Color::Black);
        assert_eq!(source.random_color(), Color::Black);
    }
}
