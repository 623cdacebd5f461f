//! Rules capability for the analysis server: FEN validation, legal moves,
//! move application and notation. Backed by cozy-chess.

pub mod fen;
pub mod position;
pub mod san;
pub mod uci;

pub use fen::{FenError, START_FEN};
pub use position::{LegalMove, MoveOutcome, Position, PositionStatus, Side};
pub use uci::{format_uci_move, parse_uci_move, MoveError};
