//! Validated, immutable board positions.

use cozy_chess::{Board, GameStatus, Move};
use serde::Serialize;

use crate::fen::{format_fen, parse_fen, FenError};
use crate::san::format_san;
use crate::uci::{
    convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_uci_move, parse_uci_move,
    MoveError,
};

/// Side to move, serialized as "white" / "black".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl From<cozy_chess::Color> for Side {
    fn from(color: cozy_chess::Color) -> Self {
        match color {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

/// A position that has passed rules validation.
///
/// Never mutated: playing a move returns a new `Position`. The FEN held here
/// is re-rendered from the parsed board, so two spellings of the same
/// position compare equal.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    fen: String,
}

/// Terminal state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Ongoing,
    Checkmate,
    Drawn,
}

/// A legal move rendered in both notations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    pub uci: String,
    pub san: String,
}

/// Result of playing a legal move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub uci: String,
    pub san: String,
    pub position: Position,
    pub is_check: bool,
    pub is_checkmate: bool,
}

impl Position {
    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let board = parse_fen(fen)?;
        Ok(Self::from_board(board))
    }

    pub fn start() -> Self {
        Self::from_board(Board::default())
    }

    fn from_board(board: Board) -> Self {
        let fen = format_fen(&board);
        Self { board, fen }
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    pub fn status(&self) -> PositionStatus {
        match self.board.status() {
            GameStatus::Won => PositionStatus::Checkmate,
            GameStatus::Drawn => PositionStatus::Drawn,
            GameStatus::Ongoing => PositionStatus::Ongoing,
        }
    }

    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    /// All legal moves in cozy_chess notation.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn has_legal_moves(&self) -> bool {
        let mut any = false;
        self.board.generate_moves(|mvs| {
            any = !mvs.is_empty();
            any
        });
        any
    }

    /// Legal moves with UCI (king-two-squares castling) and SAN spellings.
    pub fn legal_move_details(&self) -> Vec<LegalMove> {
        self.legal_moves()
            .into_iter()
            .map(|mv| LegalMove {
                uci: self.uci(mv),
                san: format_san(&self.board, mv),
            })
            .collect()
    }

    /// Resolve UCI text against this position.
    ///
    /// Malformed text is an error; a well-formed move that is not legal here
    /// resolves to `None`.
    pub fn resolve_move(&self, uci: &str) -> Result<Option<Move>, MoveError> {
        let parsed = parse_uci_move(uci.trim())?;
        let legal = self.legal_moves();
        let mv = convert_uci_castling_to_cozy(parsed, &legal);
        Ok(legal.contains(&mv).then_some(mv))
    }

    /// Play a UCI move, producing the successor position.
    pub fn play(&self, uci: &str) -> Result<Option<MoveOutcome>, MoveError> {
        let Some(mv) = self.resolve_move(uci)? else {
            return Ok(None);
        };

        let san = format_san(&self.board, mv);
        let mut next = self.board.clone();
        next.play_unchecked(mv);
        let position = Self::from_board(next);

        Ok(Some(MoveOutcome {
            uci: self.uci(mv),
            san,
            is_check: position.is_check(),
            is_checkmate: position.status() == PositionStatus::Checkmate,
            position,
        }))
    }

    /// UCI spelling of a legal move in this position.
    pub fn uci(&self, mv: Move) -> String {
        format_uci_move(convert_cozy_castling_to_uci(&self.board, mv))
    }

    /// SAN spelling of a UCI move, or `None` when it is not legal here.
    pub fn san(&self, uci: &str) -> Option<String> {
        let mv = self.resolve_move(uci).ok()??;
        Some(format_san(&self.board, mv))
    }

    /// Render a line of UCI moves as SAN, stopping at the first move that
    /// is not legal in sequence.
    pub fn line_to_san(&self, line: &[String]) -> Vec<String> {
        let mut sans = Vec::with_capacity(line.len());
        let mut current = self.clone();
        for uci in line {
            match current.play(uci) {
                Ok(Some(outcome)) => {
                    sans.push(outcome.san);
                    current = outcome.position;
                }
                _ => break,
            }
        }
        sans
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.fen == other.fen
    }
}

impl Eq for Position {}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fen)
    }
}

impl std::str::FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
