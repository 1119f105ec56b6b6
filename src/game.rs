//! The `Game` aggregate: one in-progress or finished chess game between
//! two players. Owns the authoritative [`Position`], move history, and
//! draw-offer negotiation state. All mutators validate through
//! [`crate::rules`] and return `Result<_, CoreError>` — no mutation is
//! ever partially applied on an error.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::GameId;
use crate::player::Player;
use crate::position::Position;
use crate::rules;
use crate::types::{Color, GameEndReason, GameStatus, Move};

/// One move as recorded in a finished or in-progress game's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub move_number: u32,
    pub side: Color,
    pub mv: Move,
    pub notation: String,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: GameId,
    pub white: Player,
    pub black: Player,
    pub position: Position,
    pub status: GameStatus,
    pub end_reason: Option<GameEndReason>,
    pub move_history: Vec<MoveRecord>,
    pub position_history: Vec<String>,
    pub pending_draw_offer: Option<Color>,
}

impl Game {
    /// Starts a new game between `white` and `black` from the standard
    /// starting position. The sole constructor — callers (the
    /// `GameFactory`) are responsible for minting players with the
    /// correct sides before calling this.
    pub fn new(white: Player, black: Player) -> Self {
        let position = Position::starting_position();
        let position_history = vec![position.to_repetition_key()];
        Self {
            id: GameId::new(),
            white,
            black,
            position,
            status: GameStatus::InProgress,
            end_reason: None,
            move_history: Vec::new(),
            position_history,
            pending_draw_offer: None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn player_for(&self, side: Color) -> Player {
        match side {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn side_of(&self, player_id: crate::ids::PlayerId) -> Option<Color> {
        if self.white.id == player_id {
            Some(Color::White)
        } else if self.black.id == player_id {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        rules::legal_moves(&self.position)
    }

    /// Validates, applies, and records `mv`, then checks for automatic
    /// game-ending conditions. Leaves the game entirely unchanged if
    /// `mv` is illegal or the game has already ended.
    pub fn apply_move(&mut self, mv: Move) -> Result<(), CoreError> {
        if self.is_over() {
            return Err(CoreError::GameOver(self.id));
        }
        if !rules::is_legal_move(&self.position, mv) {
            return Err(CoreError::IllegalMove {
                from: mv.from.to_algebraic(),
                to: mv.to.to_algebraic(),
            });
        }

        let side = self.position.side_to_move;
        let move_number = self.position.fullmove_number;
        let notation = mv.to_string();
        self.position.apply_move(mv);
        self.move_history.push(MoveRecord {
            move_number,
            side,
            mv,
            notation,
        });
        self.position_history.push(self.position.to_repetition_key());

        // A move by either side implicitly declines/withdraws any
        // pending offer — it survives only until the next move.
        self.pending_draw_offer = None;

        self.check_automatic_game_end();
        Ok(())
    }

    fn check_automatic_game_end(&mut self) {
        if self.legal_moves().is_empty() {
            if rules::is_in_check(&self.position, self.position.side_to_move) {
                self.status = GameStatus::Checkmate;
                self.end_reason = Some(GameEndReason::Checkmate);
            } else {
                self.status = GameStatus::Stalemate;
                self.end_reason = Some(GameEndReason::Stalemate);
            }
            return;
        }
        if rules::is_insufficient_material(&self.position) {
            self.status = GameStatus::Draw;
            self.end_reason = Some(GameEndReason::InsufficientMaterial);
            return;
        }
        if rules::is_threefold_repetition(&self.position, &self.position_history) {
            self.status = GameStatus::Draw;
            self.end_reason = Some(GameEndReason::ThreefoldRepetition);
            return;
        }
        if rules::is_fifty_move_rule(&self.position) {
            self.status = GameStatus::Draw;
            self.end_reason = Some(GameEndReason::FiftyMoveRule);
        }
    }

    /// The winner, if the game ended decisively (checkmate or
    /// resignation). `None` for an in-progress or drawn game.
    pub fn winner(&self) -> Option<Color> {
        match self.status {
            GameStatus::Checkmate => Some(self.position.side_to_move.opponent()),
            GameStatus::ResignedWhite => Some(Color::Black),
            GameStatus::ResignedBlack => Some(Color::White),
            _ => None,
        }
    }

    pub fn resign(&mut self, side: Color) -> Result<(), CoreError> {
        if self.is_over() {
            return Err(CoreError::GameOver(self.id));
        }
        self.status = match side {
            Color::White => GameStatus::ResignedWhite,
            Color::Black => GameStatus::ResignedBlack,
        };
        self.end_reason = Some(GameEndReason::Resignation);
        self.pending_draw_offer = None;
        Ok(())
    }

    pub fn offer_draw(&mut self, side: Color) -> Result<(), CoreError> {
        if self.is_over() {
            return Err(CoreError::GameOver(self.id));
        }
        if self.pending_draw_offer.is_some() {
            return Err(CoreError::OfferAlreadyPending(self.id));
        }
        self.pending_draw_offer = Some(side);
        Ok(())
    }

    pub fn accept_draw(&mut self, side: Color) -> Result<(), CoreError> {
        if self.is_over() {
            return Err(CoreError::GameOver(self.id));
        }
        match self.pending_draw_offer {
            Some(offered_by) if offered_by != side => {
                self.status = GameStatus::Draw;
                self.end_reason = Some(GameEndReason::DrawAgreement);
                self.pending_draw_offer = None;
                Ok(())
            }
            Some(_) => Err(CoreError::CannotAcceptOwnOffer),
            None => Err(CoreError::NoPendingOffer(self.id)),
        }
    }

    pub fn reject_draw(&mut self, side: Color) -> Result<(), CoreError> {
        if self.is_over() {
            return Err(CoreError::GameOver(self.id));
        }
        match self.pending_draw_offer {
            Some(offered_by) if offered_by != side => {
                self.pending_draw_offer = None;
                Ok(())
            }
            Some(_) => Err(CoreError::CannotAcceptOwnOffer),
            None => Err(CoreError::NoPendingOffer(self.id)),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::types::Square;

    fn new_game() -> Game {
        let white = Player::new(UserId::new(), Color::White);
        let black = Player::new(UserId::new(), Color::Black);
        Game::new(white, black)
    }

    fn mv(from: &str, to: &str) -> Move {
        Move::new(
            Square::from_algebraic(from).unwrap(),
            Square::from_algebraic(to).unwrap(),
            None,
        )
    }

    #[test]
    fn legal_move_is_applied_and_recorded() {
        let mut game = new_game();
        game.apply_move(mv("e2", "e4")).unwrap();
        assert_eq!(game.move_history.len(), 1);
        assert_eq!(game.position.side_to_move, Color::Black);
    }

    #[test]
    fn illegal_move_is_rejected_without_mutation() {
        let mut game = new_game();
        let before = game.position.clone();
        let err = game.apply_move(mv("e2", "e5")).unwrap_err();
        assert!(matches!(err, CoreError::IllegalMove { .. }));
        assert_eq!(game.position, before);
    }

    #[test]
    fn fools_mate_ends_the_game_by_checkmate() {
        let mut game = new_game();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            game.apply_move(mv(from, to)).unwrap();
        }
        assert_eq!(game.status, GameStatus::Checkmate);
        assert_eq!(game.winner(), Some(Color::Black));
    }

    #[test]
    fn resignation_ends_the_game() {
        let mut game = new_game();
        game.resign(Color::White).unwrap();
        assert_eq!(game.status, GameStatus::ResignedWhite);
        assert_eq!(game.winner(), Some(Color::Black));
        assert!(game.resign(Color::Black).is_err());
    }

    #[test]
    fn draw_offer_must_be_accepted_by_the_other_side() {
        let mut game = new_game();
        game.offer_draw(Color::White).unwrap();
        assert!(matches!(
            game.accept_draw(Color::White).unwrap_err(),
            CoreError::CannotAcceptOwnOffer
        ));
        game.accept_draw(Color::Black).unwrap();
        assert_eq!(game.status, GameStatus::Draw);
    }

    #[test]
    fn a_move_clears_any_pending_draw_offer() {
        let mut game = new_game();
        game.offer_draw(Color::White).unwrap();
        game.apply_move(mv("e2", "e4")).unwrap();
        assert_eq!(game.pending_draw_offer, None);
    }

    #[test]
    fn second_draw_offer_before_resolution_is_rejected() {
        let mut game = new_game();
        game.offer_draw(Color::White).unwrap();
        assert!(matches!(
            game.offer_draw(Color::White).unwrap_err(),
            CoreError::OfferAlreadyPending(_)
        ));
    }

    #[test]
    fn a_move_reaching_the_position_a_third_time_draws_automatically() {
        let mut game = new_game();
        let shuffle = [
            ("g1", "f3"),
            ("g8", "f6"),
            ("f3", "g1"),
            ("f6", "g8"),
            ("g1", "f3"),
            ("g8", "f6"),
            ("f3", "g1"),
        ];
        for (from, to) in shuffle {
            game.apply_move(mv(from, to)).unwrap();
            assert_eq!(game.status, GameStatus::InProgress);
        }
        // The final repeat of the dance: this move yields the starting
        // position for the third time, so it must draw automatically,
        // with no separate claim step.
        game.apply_move(mv("f6", "g8")).unwrap();
        assert_eq!(game.status, GameStatus::Draw);
        assert_eq!(game.end_reason, Some(GameEndReason::ThreefoldRepetition));
    }
}
