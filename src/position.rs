//! The bitboard position: twelve piece bitboards plus the mechanical
//! game-state fields FEN carries (side to move, castling rights, en
//! passant target, halfmove clock, fullmove number).
//!
//! [`Position::apply_move`] is purely mechanical — it does not validate
//! legality. Legality (check safety, pin detection, move generation) is
//! [`crate::rules`]'s job; this module only knows how to carry out a
//! move that the rule engine has already accepted.

use std::fmt;

use crate::bitboard::Bitboard;
use crate::types::{CastlingRights, Color, Move, Piece, PieceType, Square};

fn piece_index(kind: PieceType, color: Color) -> usize {
    let kind_idx = match kind {
        PieceType::King => 0,
        PieceType::Queen => 1,
        PieceType::Rook => 2,
        PieceType::Bishop => 3,
        PieceType::Knight => 4,
        PieceType::Pawn => 5,
    };
    let color_idx = match color {
        Color::White => 0,
        Color::Black => 1,
    };
    color_idx * 6 + kind_idx
}

/// A legal board position plus the mutable game-state fields FEN
/// records. Twelve bitboards, one per (piece type, color) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pieces: [Bitboard; 12],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

/// The outcome of mechanically applying a move: which piece moved, what
/// (if anything) was captured, and whether the move was a pawn move or
/// capture (for the RuleEngine's halfmove-clock-based draw checks).
#[derive(Debug, Clone, Copy)]
pub struct MoveEffect {
    pub moved: Piece,
    pub captured: Option<Piece>,
    pub resets_halfmove_clock: bool,
}

impl Position {
    /// An empty position with White to move, no castling rights, no en
    /// passant target. Used as a builder base by `starting_position` and
    /// `from_fen`.
    pub fn empty() -> Self {
        Self {
            pieces: [Bitboard::EMPTY; 12],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// The standard chess starting position.
    pub fn starting_position() -> Self {
        Self::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("starting position FEN is well-formed")
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        for &kind in &PieceType::ALL {
            for &color in &[Color::White, Color::Black] {
                if self.pieces[piece_index(kind, color)].contains(sq) {
                    return Some(Piece::new(kind, color));
                }
            }
        }
        None
    }

    pub fn bitboard_for(&self, kind: PieceType, color: Color) -> Bitboard {
        self.pieces[piece_index(kind, color)]
    }

    pub fn occupied_by(&self, color: Color) -> Bitboard {
        PieceType::ALL
            .iter()
            .fold(Bitboard::EMPTY, |acc, &kind| acc | self.bitboard_for(kind, color))
    }

    pub fn occupied(&self) -> Bitboard {
        self.occupied_by(Color::White) | self.occupied_by(Color::Black)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.bitboard_for(PieceType::King, color).lsb()
    }

    fn put_piece(&mut self, sq: Square, piece: Piece) {
        self.pieces[piece_index(piece.kind, piece.color)].set(sq);
    }

    fn remove_piece(&mut self, sq: Square) -> Option<Piece> {
        let piece = self.piece_at(sq)?;
        self.pieces[piece_index(piece.kind, piece.color)].clear(sq);
        Some(piece)
    }

    /// Mechanically applies `mv`, which the caller (the rule engine)
    /// has already established is legal in this position. Handles
    /// castling rook relocation, en passant capture removal, promotion
    /// substitution, castling-rights updates, the en-passant target,
    /// the halfmove clock, the fullmove counter, and the side to move.
    pub fn apply_move(&mut self, mv: Move) -> MoveEffect {
        let mover_color = self.side_to_move;
        let moved = self
            .remove_piece(mv.from)
            .expect("apply_move called with no piece on the from-square");

        let is_en_passant_capture = moved.kind == PieceType::Pawn
            && Some(mv.to) == self.en_passant
            && mv.from.file != mv.to.file;

        let captured = if is_en_passant_capture {
            let captured_sq = Square::new(mv.to.file, mv.from.rank);
            self.remove_piece(captured_sq)
        } else {
            self.remove_piece(mv.to)
        };

        let placed_kind = mv.promotion.unwrap_or(moved.kind);
        self.put_piece(mv.to, Piece::new(placed_kind, mover_color));

        // Castling: king moving two files relocates the matching rook.
        if moved.kind == PieceType::King && (mv.to.file as i16 - mv.from.file as i16).abs() == 2 {
            let rank = mv.from.rank;
            let (rook_from, rook_to) = if mv.to.file == 6 {
                (Square::new(7, rank), Square::new(5, rank))
            } else {
                (Square::new(0, rank), Square::new(3, rank))
            };
            if let Some(rook) = self.remove_piece(rook_from) {
                self.put_piece(rook_to, rook);
            }
        }

        // Castling rights: king moves clear both; rook moves/captures on
        // a corner clear that side only.
        if moved.kind == PieceType::King {
            let rights = self.castling.for_color_mut(mover_color);
            rights.kingside = false;
            rights.queenside = false;
        }
        clear_rights_if_corner(&mut self.castling, mv.from);
        clear_rights_if_corner(&mut self.castling, mv.to);

        self.en_passant = if moved.kind == PieceType::Pawn
            && (mv.to.rank as i16 - mv.from.rank as i16).abs() == 2
        {
            Some(Square::new(mv.from.file, (mv.from.rank + mv.to.rank) / 2))
        } else {
            None
        };

        let resets_halfmove_clock = moved.kind == PieceType::Pawn || captured.is_some();
        self.halfmove_clock = if resets_halfmove_clock {
            0
        } else {
            self.halfmove_clock + 1
        };

        if mover_color == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = mover_color.opponent();

        MoveEffect {
            moved,
            captured,
            resets_halfmove_clock,
        }
    }

    /// Renders full FEN (all six fields).
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8u8).rev() {
            let mut empty = 0u8;
            for file in 0..8u8 {
                match self.piece_at(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.to_fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });
        fen.push(' ');
        fen.push_str(&self.castling.to_fen());
        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }
        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());
        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());
        fen
    }

    /// The first four FEN fields only (board, side to move, castling,
    /// en passant) — the "position identity" threefold repetition keys
    /// on, per FIDE rules, since halfmove/fullmove counters do not
    /// affect repeatability.
    pub fn to_repetition_key(&self) -> String {
        let full = self.to_fen();
        full.splitn(5, ' ').take(4).collect::<Vec<_>>().join(" ")
    }

    /// Parses full FEN (six space-separated fields).
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(format!(
                "FEN must have 6 fields, got {}: {fen}",
                fields.len()
            ));
        }
        let mut pos = Position::empty();

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("FEN board must have 8 ranks, got {}", ranks.len()));
        }
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(c)
                        .ok_or_else(|| format!("invalid FEN piece char '{c}'"))?;
                    if file >= 8 {
                        return Err(format!("FEN rank overflow: {rank_str}"));
                    }
                    pos.put_piece(Square::new(file, rank), piece);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(format!("FEN rank '{rank_str}' does not cover 8 files"));
            }
        }

        pos.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("invalid FEN side to move: {other}")),
        };
        pos.castling = CastlingRights::from_fen(fields[2])
            .ok_or_else(|| format!("invalid FEN castling field: {}", fields[2]))?;
        pos.en_passant = match fields[3] {
            "-" => None,
            sq => Some(
                Square::from_algebraic(sq)
                    .ok_or_else(|| format!("invalid FEN en passant square: {sq}"))?,
            ),
        };
        pos.halfmove_clock = fields[4]
            .parse()
            .map_err(|_| format!("invalid FEN halfmove clock: {}", fields[4]))?;
        pos.fullmove_number = fields[5]
            .parse()
            .map_err(|_| format!("invalid FEN fullmove number: {}", fields[5]))?;

        Ok(pos)
    }
}

/// The a1/h1/a8/h8 rook-start squares carry castling rights; a rook
/// leaving or a rook being captured there permanently revokes that
/// side's right, regardless of whether a rook currently occupies it.
fn clear_rights_if_corner(rights: &mut CastlingRights, sq: Square) {
    match (sq.file, sq.rank) {
        (0, 0) => rights.white.queenside = false,
        (7, 0) => rights.white.kingside = false,
        (0, 7) => rights.black.queenside = false,
        (7, 7) => rights.black.kingside = false,
        _ => {}
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let c = self
                    .piece_at(Square::new(file, rank))
                    .map(|p| p.to_fen_char())
                    .unwrap_or('.');
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_round_trips_fen() {
        let pos = Position::starting_position();
        assert_eq!(
            pos.to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn pawn_double_step_sets_en_passant_target() {
        let mut pos = Position::starting_position();
        let effect = pos.apply_move(Move::new(
            Square::from_algebraic("e2").unwrap(),
            Square::from_algebraic("e4").unwrap(),
            None,
        ));
        assert!(effect.resets_halfmove_clock);
        assert_eq!(pos.en_passant, Square::from_algebraic("e3"));
        assert_eq!(pos.side_to_move, Color::Black);
    }

    #[test]
    fn en_passant_capture_removes_the_passed_pawn() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();
        let effect = pos.apply_move(Move::new(
            Square::from_algebraic("e5").unwrap(),
            Square::from_algebraic("d6").unwrap(),
            None,
        ));
        assert!(effect.captured.is_some());
        assert_eq!(pos.piece_at(Square::from_algebraic("d5").unwrap()), None);
        assert_eq!(
            pos.piece_at(Square::from_algebraic("d6").unwrap()),
            Some(Piece::new(PieceType::Pawn, Color::White))
        );
    }

    #[test]
    fn castling_relocates_the_rook_and_clears_rights() {
        let mut pos =
            Position::from_fen("rnbqk2r/pppp1ppp/5n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
                .unwrap();
        pos.apply_move(Move::new(
            Square::from_algebraic("e1").unwrap(),
            Square::from_algebraic("g1").unwrap(),
            None,
        ));
        assert_eq!(
            pos.piece_at(Square::from_algebraic("f1").unwrap()),
            Some(Piece::new(PieceType::Rook, Color::White))
        );
        assert_eq!(pos.piece_at(Square::from_algebraic("h1").unwrap()), None);
        assert!(!pos.castling.white.kingside);
        assert!(!pos.castling.white.queenside);
    }

    #[test]
    fn promotion_substitutes_the_piece() {
        let mut pos = Position::from_fen("8/P6k/8/8/8/8/7p/7K w - - 0 1").unwrap();
        pos.apply_move(Move::new(
            Square::from_algebraic("a7").unwrap(),
            Square::from_algebraic("a8").unwrap(),
            Some(PieceType::Queen),
        ));
        assert_eq!(
            pos.piece_at(Square::from_algebraic("a8").unwrap()),
            Some(Piece::new(PieceType::Queen, Color::White))
        );
    }

    #[test]
    fn capture_and_pawn_moves_reset_halfmove_clock() {
        let mut pos = Position::starting_position();
        pos.halfmove_clock = 12;
        let effect = pos.apply_move(Move::new(
            Square::from_algebraic("g1").unwrap(),
            Square::from_algebraic("f3").unwrap(),
            None,
        ));
        assert!(!effect.resets_halfmove_clock);
        assert_eq!(pos.halfmove_clock, 13);
    }
}
