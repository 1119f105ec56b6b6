//! Core chess vocabulary shared by the bitboard position, the rule
//! engine, and the wire protocol: colors, piece types, squares, castling
//! rights, and moves.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// The color of a piece, or the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Returns the opposite color.
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Returns the home rank index (0-based) for pawns of this color.
    /// White pawns start on rank 2 (index 1), Black on rank 7 (index 6).
    pub fn pawn_start_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// Returns the promotion rank index (0-based).
    /// White promotes on rank 8 (index 7), Black on rank 1 (index 0).
    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Returns the direction pawns move: +1 for White, -1 for Black.
    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "WHITE"),
            Color::Black => write!(f, "BLACK"),
        }
    }
}

// ---------------------------------------------------------------------------
// PieceType
// ---------------------------------------------------------------------------

/// A chess piece type, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceType {
    /// All six piece types, in the order [`crate::position::Position`]
    /// indexes its twelve bitboards.
    pub const ALL: [PieceType; 6] = [
        PieceType::King,
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
        PieceType::Pawn,
    ];

    /// The four piece types a pawn may promote to, in the order the rule
    /// engine emits promotion moves.
    pub const PROMOTION: [PieceType; 4] = [
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
    ];

    /// FEN character for this piece type (uppercase; caller lowercases
    /// for Black).
    pub fn to_fen_char(self) -> char {
        match self {
            PieceType::King => 'K',
            PieceType::Queen => 'Q',
            PieceType::Rook => 'R',
            PieceType::Bishop => 'B',
            PieceType::Knight => 'N',
            PieceType::Pawn => 'P',
        }
    }

    /// Parses a FEN piece character, case-insensitively.
    pub fn from_fen_char(c: char) -> Option<PieceType> {
        match c.to_ascii_uppercase() {
            'K' => Some(PieceType::King),
            'Q' => Some(PieceType::Queen),
            'R' => Some(PieceType::Rook),
            'B' => Some(PieceType::Bishop),
            'N' => Some(PieceType::Knight),
            'P' => Some(PieceType::Pawn),
            _ => None,
        }
    }
}

/// A chess piece with both type and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceType,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceType, color: Color) -> Self {
        Self { kind, color }
    }

    /// Converts the piece to its FEN character, uppercase for White.
    pub fn to_fen_char(self) -> char {
        match self.color {
            Color::White => self.kind.to_fen_char(),
            Color::Black => self.kind.to_fen_char().to_ascii_lowercase(),
        }
    }

    /// Parses a FEN character into a piece, color inferred from case.
    pub fn from_fen_char(c: char) -> Option<Self> {
        let color = if c.is_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        PieceType::from_fen_char(c).map(|kind| Piece { kind, color })
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// A square on the board, 0-based file (a=0..h=7) and rank (1=0..8=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    /// Builds a square from 0-based file/rank. Panics if either is out of
    /// range — callers always derive squares from bounded sources (bit
    /// indices 0..64 or validated algebraic text).
    pub const fn new(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8, "square out of bounds");
        Self { file, rank }
    }

    /// Builds a square from its flat bit index (`rank * 8 + file`),
    /// matching the bitboard convention a1 = 0, h8 = 63.
    pub const fn from_index(index: u8) -> Self {
        Self::new(index % 8, index / 8)
    }

    /// The flat bit index (`rank * 8 + file`).
    pub const fn index(self) -> u8 {
        self.rank * 8 + self.file
    }

    /// Parses algebraic notation (`"e4"`). Returns `None` for malformed
    /// or out-of-range input.
    pub fn from_algebraic(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file < 8 && rank < 8 {
            Some(Square::new(file, rank))
        } else {
            None
        }
    }

    /// Renders algebraic notation (`"e4"`).
    pub fn to_algebraic(self) -> String {
        format!("{}{}", (b'a' + self.file) as char, self.rank + 1)
    }

    /// Offsets this square by `(files, ranks)`, returning `None` if the
    /// result would leave the board.
    pub fn offset(self, files: i8, ranks: i8) -> Option<Square> {
        let f = self.file as i8 + files;
        let r = self.rank as i8 + ranks;
        if (0..8).contains(&f) && (0..8).contains(&r) {
            Some(Square::new(f as u8, r as u8))
        } else {
            None
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

impl Serialize for Square {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_algebraic())
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Square::from_algebraic(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid square: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Castling rights
// ---------------------------------------------------------------------------

/// Castling rights for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SideCastlingRights {
    pub kingside: bool,
    pub queenside: bool,
}

impl Default for SideCastlingRights {
    fn default() -> Self {
        Self {
            kingside: true,
            queenside: true,
        }
    }
}

/// Castling rights for both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white: SideCastlingRights,
    pub black: SideCastlingRights,
}

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights {
        white: SideCastlingRights {
            kingside: false,
            queenside: false,
        },
        black: SideCastlingRights {
            kingside: false,
            queenside: false,
        },
    };

    pub fn for_color(&self, color: Color) -> SideCastlingRights {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn for_color_mut(&mut self, color: Color) -> &mut SideCastlingRights {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Renders the FEN castling field (`"KQkq"`, a subset, or `"-"`).
    pub fn to_fen(&self) -> String {
        let mut s = String::new();
        if self.white.kingside {
            s.push('K');
        }
        if self.white.queenside {
            s.push('Q');
        }
        if self.black.kingside {
            s.push('k');
        }
        if self.black.queenside {
            s.push('q');
        }
        if s.is_empty() {
            "-".to_string()
        } else {
            s
        }
    }

    /// Parses the FEN castling field.
    pub fn from_fen(field: &str) -> Option<CastlingRights> {
        if field == "-" {
            return Some(CastlingRights::NONE);
        }
        let mut rights = CastlingRights::NONE;
        for c in field.chars() {
            match c {
                'K' => rights.white.kingside = true,
                'Q' => rights.white.queenside = true,
                'k' => rights.black.kingside = true,
                'q' => rights.black.queenside = true,
                _ => return None,
            }
        }
        Some(rights)
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// A move, as submitted by a client or returned by the rule engine.
/// Promotion is required for pawn moves landing on the last rank and
/// forbidden otherwise (enforced by [`crate::rules`], not by this type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn new(from: Square, to: Square, promotion: Option<PieceType>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p.to_fen_char())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Game result
// ---------------------------------------------------------------------------

/// The terminal status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    Checkmate,
    Stalemate,
    Draw,
    ResignedWhite,
    ResignedBlack,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// The reason a game reached a drawn or decisive terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEndReason {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    FiftyMoveRule,
    InsufficientMaterial,
    Resignation,
    DrawAgreement,
}

impl fmt::Display for GameEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEndReason::Checkmate => write!(f, "checkmate"),
            GameEndReason::Stalemate => write!(f, "stalemate"),
            GameEndReason::ThreefoldRepetition => write!(f, "threefold repetition"),
            GameEndReason::FiftyMoveRule => write!(f, "50-move rule"),
            GameEndReason::InsufficientMaterial => write!(f, "insufficient material"),
            GameEndReason::Resignation => write!(f, "resignation"),
            GameEndReason::DrawAgreement => write!(f, "draw by agreement"),
        }
    }
}
