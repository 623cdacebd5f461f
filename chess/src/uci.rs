//! Long algebraic move notation as spoken over UCI and by the tools.
//!
//! cozy-chess encodes castling as the king capturing its own rook (e1h1).
//! Everything outside this crate uses the king's two-square step (e1g1), so
//! the conversions here sit at every boundary where a move enters or leaves.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Invalid move: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

/// Syntax only. Whether the move is legal depends on a position, see
/// [`crate::Position::resolve_move`].
pub fn parse_uci_move(text: &str) -> Result<Move, MoveError> {
    let malformed = || MoveError::InvalidFormat(text.to_string());
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(malformed());
    }

    let (squares, suffix) = text.split_at(4);
    let from = parse_square(&squares[..2])?;
    let to = parse_square(&squares[2..])?;
    if from == to {
        return Err(malformed());
    }

    let promotion = suffix
        .bytes()
        .next()
        .map(|b| promotion_piece(b).ok_or_else(|| MoveError::InvalidPromotion(text.to_string())))
        .transpose()?;

    Ok(Move {
        from,
        to,
        promotion,
    })
}

fn promotion_piece(suffix: u8) -> Option<Piece> {
    Some(match suffix {
        b'n' => Piece::Knight,
        b'b' => Piece::Bishop,
        b'r' => Piece::Rook,
        b'q' => Piece::Queen,
        _ => return None,
    })
}

pub fn parse_square(text: &str) -> Result<Square, MoveError> {
    if text.len() != 2 {
        return Err(MoveError::InvalidSquare(text.to_string()));
    }
    text.parse::<Square>()
        .map_err(|_| MoveError::InvalidSquare(text.to_string()))
}

/// "e2e4", "e7e8q". Castling comes out in whatever form `mv` carries.
pub fn format_uci_move(mv: Move) -> String {
    mv.to_string()
}

pub fn format_square(sq: Square) -> String {
    sq.to_string()
}

/// Rewrites e1g1 / e1c1 (and the black equivalents) to the king-takes-rook
/// form, but only when that form is among `legal_moves`. Anything else,
/// including a plain king step to g1, passes through untouched.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let home_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    if !home_rank || mv.from.file() != File::E || mv.promotion.is_some() {
        return mv;
    }
    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };

    let candidate = Move {
        to: Square::new(rook_file, mv.from.rank()),
        ..mv
    };
    if legal_moves.contains(&candidate) {
        candidate
    } else {
        mv
    }
}

/// Inverse of [`convert_uci_castling_to_cozy`] for a move legal on `board`.
pub fn convert_cozy_castling_to_uci(board: &Board, mv: Move) -> Move {
    if !is_castling(board, mv) {
        return mv;
    }
    let king_file = if is_kingside(mv) { File::G } else { File::C };
    Move {
        to: Square::new(king_file, mv.from.rank()),
        ..mv
    }
}

pub(crate) fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// For a king-takes-rook move: the rook sits east of the king.
pub(crate) fn is_kingside(mv: Move) -> bool {
    (mv.to.file() as usize) > (mv.from.file() as usize)
}
