//! A player: one user's participation in one game.

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, UserId};
use crate::types::Color;

/// One side of one game. A `Player` is minted fresh for every game a
/// user joins — the same `UserId` playing two concurrent games holds
/// two distinct `PlayerId`s, one per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub user_id: UserId,
    pub side: Color,
}

impl Player {
    pub fn new(user_id: UserId, side: Color) -> Self {
        Self {
            id: PlayerId::new(),
            user_id,
            side,
        }
    }
}
