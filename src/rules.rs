//! The rule engine: legal move generation and game-end condition
//! detection, per FIDE's Laws of Chess.
//!
//! A move is legal if it is pseudo-legal (follows its piece's movement
//! pattern, including castling/en passant/promotion preconditions) and,
//! after being applied, does not leave the mover's own king in check.
//! Generation here walks the board with [`Square::offset`] exactly as
//! the array-board ancestor of this module did; only the underlying
//! storage ([`Position`]) is bitboard-based.

use std::collections::HashMap;

use crate::position::Position;
use crate::types::{CastlingRights, Color, Move, Piece, PieceType, Square};

const ROOK_DIRS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const QUEEN_DIRS: [(i8, i8); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// Returns `true` if `sq` is attacked by any piece of `attacker_color`.
/// Used both for check detection and for the "king does not pass
/// through or land on an attacked square" castling rule.
pub fn is_square_attacked(pos: &Position, sq: Square, attacker_color: Color) -> bool {
    for &(df, dr) in &KNIGHT_OFFSETS {
        if let Some(from) = sq.offset(df, dr)
            && pos.piece_at(from)
                == Some(Piece::new(PieceType::Knight, attacker_color))
        {
            return true;
        }
    }

    for df in -1..=1i8 {
        for dr in -1..=1i8 {
            if df == 0 && dr == 0 {
                continue;
            }
            if let Some(from) = sq.offset(df, dr)
                && pos.piece_at(from) == Some(Piece::new(PieceType::King, attacker_color))
            {
                return true;
            }
        }
    }

    let pawn_dir = attacker_color.pawn_direction();
    for df in [-1i8, 1] {
        if let Some(from) = sq.offset(df, -pawn_dir)
            && pos.piece_at(from) == Some(Piece::new(PieceType::Pawn, attacker_color))
        {
            return true;
        }
    }

    for &(df, dr) in &BISHOP_DIRS {
        if ray_hits(pos, sq, df, dr, attacker_color, &[PieceType::Bishop, PieceType::Queen]) {
            return true;
        }
    }
    for &(df, dr) in &ROOK_DIRS {
        if ray_hits(pos, sq, df, dr, attacker_color, &[PieceType::Rook, PieceType::Queen]) {
            return true;
        }
    }

    false
}

fn ray_hits(
    pos: &Position,
    from: Square,
    df: i8,
    dr: i8,
    attacker_color: Color,
    kinds: &[PieceType],
) -> bool {
    let mut cur = from;
    while let Some(next) = cur.offset(df, dr) {
        match pos.piece_at(next) {
            None => cur = next,
            Some(piece) => {
                return piece.color == attacker_color && kinds.contains(&piece.kind);
            }
        }
    }
    false
}

/// Returns `true` if `color`'s king is currently in check.
pub fn is_in_check(pos: &Position, color: Color) -> bool {
    match pos.king_square(color) {
        Some(king_sq) => is_square_attacked(pos, king_sq, color.opponent()),
        None => false,
    }
}

fn generate_pseudo_legal_moves(pos: &Position) -> Vec<Move> {
    let turn = pos.side_to_move;
    let mut moves = Vec::with_capacity(64);

    for rank in 0..8u8 {
        for file in 0..8u8 {
            let from = Square::new(file, rank);
            let piece = match pos.piece_at(from) {
                Some(p) if p.color == turn => p,
                _ => continue,
            };
            match piece.kind {
                PieceType::King => generate_king_moves(pos, from, turn, &mut moves),
                PieceType::Queen => generate_sliding_moves(pos, from, turn, &QUEEN_DIRS, &mut moves),
                PieceType::Rook => generate_sliding_moves(pos, from, turn, &ROOK_DIRS, &mut moves),
                PieceType::Bishop => generate_sliding_moves(pos, from, turn, &BISHOP_DIRS, &mut moves),
                PieceType::Knight => generate_knight_moves(pos, from, turn, &mut moves),
                PieceType::Pawn => generate_pawn_moves(pos, from, turn, pos.en_passant, &mut moves),
            }
        }
    }

    moves
}

fn generate_sliding_moves(
    pos: &Position,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in directions {
        let mut cur = from;
        while let Some(to) = cur.offset(df, dr) {
            match pos.piece_at(to) {
                None => {
                    moves.push(Move::new(from, to, None));
                    cur = to;
                }
                Some(target) => {
                    if target.color != color {
                        moves.push(Move::new(from, to, None));
                    }
                    break;
                }
            }
        }
    }
}

fn generate_knight_moves(pos: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    for &(df, dr) in &KNIGHT_OFFSETS {
        if let Some(to) = from.offset(df, dr) {
            match pos.piece_at(to) {
                None => moves.push(Move::new(from, to, None)),
                Some(target) if target.color != color => moves.push(Move::new(from, to, None)),
                _ => {}
            }
        }
    }
}

fn generate_king_moves(pos: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    for df in -1..=1i8 {
        for dr in -1..=1i8 {
            if df == 0 && dr == 0 {
                continue;
            }
            if let Some(to) = from.offset(df, dr) {
                match pos.piece_at(to) {
                    None => moves.push(Move::new(from, to, None)),
                    Some(target) if target.color != color => moves.push(Move::new(from, to, None)),
                    _ => {}
                }
            }
        }
    }

    generate_castling_moves(pos, from, color, &pos.castling, moves);
}

fn generate_castling_moves(
    pos: &Position,
    from: Square,
    color: Color,
    castling: &CastlingRights,
    moves: &mut Vec<Move>,
) {
    let rights = castling.for_color(color);
    let rank = match color {
        Color::White => 0u8,
        Color::Black => 7u8,
    };
    let king_start = Square::new(4, rank);
    if from != king_start || is_square_attacked(pos, from, color.opponent()) {
        return;
    }

    if rights.kingside {
        let f_sq = Square::new(5, rank);
        let g_sq = Square::new(6, rank);
        let rook_sq = Square::new(7, rank);
        let path_clear = pos.piece_at(f_sq).is_none() && pos.piece_at(g_sq).is_none();
        let rook_present = pos.piece_at(rook_sq) == Some(Piece::new(PieceType::Rook, color));
        let safe = !is_square_attacked(pos, f_sq, color.opponent())
            && !is_square_attacked(pos, g_sq, color.opponent());
        if path_clear && rook_present && safe {
            moves.push(Move::new(from, g_sq, None));
        }
    }

    if rights.queenside {
        let d_sq = Square::new(3, rank);
        let c_sq = Square::new(2, rank);
        let b_sq = Square::new(1, rank);
        let rook_sq = Square::new(0, rank);
        let path_clear =
            pos.piece_at(d_sq).is_none() && pos.piece_at(c_sq).is_none() && pos.piece_at(b_sq).is_none();
        let rook_present = pos.piece_at(rook_sq) == Some(Piece::new(PieceType::Rook, color));
        let safe = !is_square_attacked(pos, d_sq, color.opponent())
            && !is_square_attacked(pos, c_sq, color.opponent());
        if path_clear && rook_present && safe {
            moves.push(Move::new(from, c_sq, None));
        }
    }
}

fn generate_pawn_moves(
    pos: &Position,
    from: Square,
    color: Color,
    en_passant: Option<Square>,
    moves: &mut Vec<Move>,
) {
    let dir = color.pawn_direction();
    let start_rank = color.pawn_start_rank();
    let promo_rank = color.promotion_rank();

    let mut add_move = |to: Square, moves: &mut Vec<Move>| {
        if to.rank == promo_rank {
            for kind in PieceType::PROMOTION {
                moves.push(Move::new(from, to, Some(kind)));
            }
        } else {
            moves.push(Move::new(from, to, None));
        }
    };

    if let Some(one_ahead) = from.offset(0, dir)
        && pos.piece_at(one_ahead).is_none()
    {
        add_move(one_ahead, moves);
        if from.rank == start_rank
            && let Some(two_ahead) = from.offset(0, dir * 2)
            && pos.piece_at(two_ahead).is_none()
        {
            add_move(two_ahead, moves);
        }
    }

    for df in [-1i8, 1] {
        if let Some(to) = from.offset(df, dir) {
            if let Some(target) = pos.piece_at(to)
                && target.color != color
            {
                add_move(to, moves);
            }
            if Some(to) == en_passant {
                add_move(to, moves);
            }
        }
    }
}

/// Generates every legal move available to the side to move.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let turn = pos.side_to_move;
    generate_pseudo_legal_moves(pos)
        .into_iter()
        .filter(|mv| {
            let mut probe = pos.clone();
            probe.apply_move(*mv);
            !is_in_check(&probe, turn)
        })
        .collect()
}

/// `true` if `mv` is among the side to move's legal moves.
pub fn is_legal_move(pos: &Position, mv: Move) -> bool {
    legal_moves(pos).contains(&mv)
}

/// Checkmate: the side to move is in check and has no legal move.
pub fn is_checkmate(pos: &Position) -> bool {
    is_in_check(pos, pos.side_to_move) && legal_moves(pos).is_empty()
}

/// Stalemate: the side to move is not in check but has no legal move.
pub fn is_stalemate(pos: &Position) -> bool {
    !is_in_check(pos, pos.side_to_move) && legal_moves(pos).is_empty()
}

/// The 50-move rule: draw claimable once 100 consecutive halfmoves have
/// passed with no pawn move or capture.
pub fn is_fifty_move_rule(pos: &Position) -> bool {
    pos.halfmove_clock >= 100
}

/// Dead position per FIDE Art. 5.2.2: K v K, K+B v K, K+N v K, or
/// K+B v K+B with same-colored bishops.
pub fn is_insufficient_material(pos: &Position) -> bool {
    let white_minor = minor_pieces(pos, Color::White);
    let black_minor = minor_pieces(pos, Color::Black);
    let white_other = has_major_or_pawn(pos, Color::White);
    let black_other = has_major_or_pawn(pos, Color::Black);

    if white_other || black_other {
        return false;
    }

    match (white_minor.as_slice(), black_minor.as_slice()) {
        ([], []) => true,
        ([(PieceType::Bishop | PieceType::Knight, _)], []) => true,
        ([], [(PieceType::Bishop | PieceType::Knight, _)]) => true,
        ([(PieceType::Bishop, wsq)], [(PieceType::Bishop, bsq)]) => {
            (wsq.file + wsq.rank) % 2 == (bsq.file + bsq.rank) % 2
        }
        _ => false,
    }
}

fn minor_pieces(pos: &Position, color: Color) -> Vec<(PieceType, Square)> {
    let mut found = Vec::new();
    for kind in [PieceType::Bishop, PieceType::Knight] {
        for sq in pos.bitboard_for(kind, color).iter() {
            found.push((kind, sq));
        }
    }
    found
}

fn has_major_or_pawn(pos: &Position, color: Color) -> bool {
    for kind in [PieceType::Queen, PieceType::Rook, PieceType::Pawn] {
        if !pos.bitboard_for(kind, color).is_empty() {
            return true;
        }
    }
    false
}

/// Threefold repetition: `history` (repetition keys of every position
/// reached so far, including the current one) contains the current
/// position's key at least three times.
pub fn is_threefold_repetition(pos: &Position, history: &[String]) -> bool {
    let key = pos.to_repetition_key();
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for h in history {
        *counts.entry(h.as_str()).or_insert(0) += 1;
    }
    counts.get(key.as_str()).copied().unwrap_or(0) >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_has_twenty_legal_moves() {
        let pos = Position::starting_position();
        assert_eq!(legal_moves(&pos).len(), 20);
    }

    #[test]
    fn starting_position_not_in_check() {
        let pos = Position::starting_position();
        assert!(!is_in_check(&pos, Color::White));
        assert!(!is_in_check(&pos, Color::Black));
    }

    #[test]
    fn insufficient_material_k_vs_k() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_insufficient_material(&pos));
    }

    #[test]
    fn insufficient_material_kb_vs_k() {
        let pos = Position::from_fen("4k3/8/8/8/2B5/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_insufficient_material(&pos));
    }

    #[test]
    fn rook_is_sufficient_material() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        assert!(!is_insufficient_material(&pos));
    }

    #[test]
    fn en_passant_move_is_generated() {
        let pos =
            Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let ep_moves: Vec<_> = legal_moves(&pos)
            .into_iter()
            .filter(|m| m.to == Square::from_algebraic("d6").unwrap())
            .collect();
        assert_eq!(ep_moves.len(), 1);
        assert_eq!(ep_moves[0].from, Square::from_algebraic("e5").unwrap());
    }

    #[test]
    fn castling_available_in_clear_position() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let castling_moves: Vec<_> = legal_moves(&pos)
            .into_iter()
            .filter(|m| {
                m.from == Square::from_algebraic("e1").unwrap()
                    && (m.to.file as i16 - m.from.file as i16).abs() == 2
            })
            .collect();
        assert_eq!(castling_moves.len(), 2);
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut pos = Position::starting_position();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let from = Square::from_algebraic(&mv[0..2]).unwrap();
            let to = Square::from_algebraic(&mv[2..4]).unwrap();
            pos.apply_move(Move::new(from, to, None));
        }
        assert!(is_checkmate(&pos));
    }

    #[test]
    fn threefold_repetition_counts_recorded_keys() {
        let pos = Position::starting_position();
        let key = pos.to_repetition_key();
        let history = vec![key.clone(), key.clone(), key];
        assert!(is_threefold_repetition(&pos, &history));
    }
}
