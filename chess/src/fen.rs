use cozy_chess::Board;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
///
/// cozy-chess rejects both grammar errors and impossible positions
/// (missing kings, side not to move in check, bad castling rights).
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let trimmed = fen.trim();
    let fields = trimmed.split_whitespace().count();
    if fields == 0 {
        return Err(FenError::Empty);
    }
    if fields != 6 {
        return Err(FenError::FieldCount(fields));
    }

    trimmed
        .parse()
        .map_err(|_| FenError::InvalidFormat(trimmed.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("FEN is empty")]
    Empty,
    #[error("FEN must have 6 fields, found {0}")]
    FieldCount(usize),
    #[error("Invalid FEN: {0}")]
    InvalidFormat(String),
}
