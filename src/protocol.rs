//! The wire protocol: tagged-union JSON messages for the three
//! WebSocket channels (matchmaking, per-game, spectator). Every enum is
//! internally tagged (`{"type": "...", ...}`), the same envelope
//! convention as the teacher's broadcast events.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{GameId, PlayerId, UserId};
use crate::types::{Color, GameEndReason, GameStatus, Move};

/// The wire representation of a `CoreError`: a stable code for
/// client-side matching plus a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

impl From<&CoreError> for WireError {
    fn from(err: &CoreError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matchmaking channel (/ws/matchmaking)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMatchmakingMessage {
    /// Enqueues the authenticated user for a pairing.
    JoinQueue,
    /// Withdraws from the queue, if still waiting.
    LeaveQueue,
    /// Anything this server version doesn't recognize — accepted and
    /// discarded with a debug log rather than closing the connection.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMatchmakingMessage {
    AuthSuccess { user_id: UserId },
    QueuePositionUpdate { position: u32 },
    MatchFound {
        game_id: GameId,
        player_id: PlayerId,
        side: Color,
    },
    AuthFailed { error: WireError },
    Error { error: WireError },
}

// ---------------------------------------------------------------------------
// Per-game channel (/ws/game/{gameId})
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientGameMessage {
    MoveAttempt { mv: Move },
    Resign,
    OfferDraw,
    AcceptDraw,
    RejectDraw,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerGameMessage {
    /// Sent once, immediately after the connection's bearer token is
    /// validated, before any other message on this channel.
    AuthSuccess {
        user_id: UserId,
    },
    GameStateSync {
        game_id: GameId,
        fen: String,
        status: GameStatus,
        legal_moves: Vec<Move>,
        pending_draw_offer: Option<Color>,
    },
    MoveExecuted {
        game_id: GameId,
        mv: Move,
        by: Color,
        fen: String,
        status: GameStatus,
        is_check: bool,
    },
    MoveRejected {
        error: WireError,
    },
    GameResigned {
        game_id: GameId,
        by: Color,
    },
    /// Sent only when `status` is `Draw` — checkmate/stalemate are
    /// already fully signaled by `MoveExecuted.status`.
    GameDrawn {
        game_id: GameId,
        reason: GameEndReason,
    },
    DrawOffered {
        by: Color,
    },
    DrawAccepted,
    DrawRejected,
    PlayerDisconnected {
        player_id: PlayerId,
    },
    PlayerReconnected {
        player_id: PlayerId,
    },
    Error {
        error: WireError,
    },
}

// ---------------------------------------------------------------------------
// Spectator channel (/ws/game/{gameId}/spectate) — read-only subset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientSpectatorMessage {
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Square;

    #[test]
    fn move_attempt_round_trips_through_json() {
        let json = r#"{"type":"MoveAttempt","mv":{"from":"e2","to":"e4"}}"#;
        let parsed: ClientGameMessage = serde_json::from_str(json).unwrap();
        match parsed {
            ClientGameMessage::MoveAttempt { mv } => {
                assert_eq!(mv.from, Square::from_algebraic("e2").unwrap());
                assert_eq!(mv.to, Square::from_algebraic("e4").unwrap());
            }
            other => panic!("expected MoveAttempt, got {other:?}"),
        }
    }

    #[test]
    fn unknown_message_kind_does_not_fail_to_parse() {
        let json = r#"{"type":"SomethingFuture"}"#;
        let parsed: ClientGameMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed, ClientGameMessage::Unknown));
    }

    #[test]
    fn wire_error_carries_stable_code() {
        let err = CoreError::AuthRequired;
        let wire = WireError::from(&err);
        assert_eq!(wire.code, "AuthRequired");
    }
}
