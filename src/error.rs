//! The domain error catalogue. Every fallible core operation returns
//! `Result<_, CoreError>`; the transport layer maps each variant to a
//! wire `Error{code, message}` (`code` is the variant name, stable for
//! client-side matching).

use thiserror::Error;

use crate::ids::{GameId, PlayerId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("'{0}' is not valid FEN: {1}")]
    InvalidFen(String, String),

    #[error("move {from}{to} is not legal in the current position")]
    IllegalMove { from: String, to: String },

    #[error("it is not player {0}'s turn to move")]
    NotYourTurn(PlayerId),

    #[error("player {0} is not a participant in game {1}")]
    NotAParticipant(PlayerId, GameId),

    #[error("game {0} has already ended")]
    GameOver(GameId),

    #[error("user {0} is already enqueued for matchmaking")]
    AlreadyEnqueued(UserId),

    #[error("user {0} is not known to the system")]
    UnknownUser(UserId),

    #[error("there is no pending draw offer in game {0}")]
    NoPendingOffer(GameId),

    #[error("a player cannot accept their own draw offer")]
    CannotAcceptOwnOffer,

    #[error("a draw offer is already pending in game {0}")]
    OfferAlreadyPending(GameId),

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("authentication is required before this action")]
    AuthRequired,

    #[error("malformed message: {0}")]
    InvalidMessage(String),

    #[error("game {0} was not found")]
    GameNotFound(GameId),
}

impl CoreError {
    /// The stable wire code for this error kind — the enum variant
    /// name, used verbatim so clients can match on it without parsing
    /// the human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidFen(..) => "InvalidFen",
            CoreError::IllegalMove { .. } => "IllegalMove",
            CoreError::NotYourTurn(_) => "NotYourTurn",
            CoreError::NotAParticipant(..) => "NotAParticipant",
            CoreError::GameOver(_) => "GameOver",
            CoreError::AlreadyEnqueued(_) => "AlreadyEnqueued",
            CoreError::UnknownUser(_) => "UnknownUser",
            CoreError::NoPendingOffer(_) => "NoPendingOffer",
            CoreError::CannotAcceptOwnOffer => "CannotAcceptOwnOffer",
            CoreError::OfferAlreadyPending(_) => "OfferAlreadyPending",
            CoreError::PersistenceFailure(_) => "PersistenceFailure",
            CoreError::AuthFailed(_) => "AuthFailed",
            CoreError::AuthRequired => "AuthRequired",
            CoreError::InvalidMessage(_) => "InvalidMessage",
            CoreError::GameNotFound(_) => "GameNotFound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_variant_name() {
        let err = CoreError::AuthRequired;
        assert_eq!(err.code(), "AuthRequired");
    }
}
