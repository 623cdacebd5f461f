//! Standard Algebraic Notation rendering.

use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::uci::{format_square, is_castling, is_kingside};

/// Format a legal move (cozy_chess notation) as SAN, including the
/// check/mate suffix and file/rank disambiguation.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return crate::uci::format_uci_move(mv);
    };

    let mut san = if is_castling(board, mv) {
        let notation = if is_kingside(mv) { "O-O" } else { "O-O-O" };
        notation.to_string()
    } else {
        format_piece_move(board, mv, piece)
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if after.status() == GameStatus::Won {
        san.push('#');
    } else if !after.checkers().is_empty() {
        san.push('+');
    }

    san
}

fn format_piece_move(board: &Board, mv: Move, piece: Piece) -> String {
    let origin = format_square(mv.from);
    // En passant lands on an empty square, hence the file test for pawns
    let captures = board.piece_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = match piece_letter(piece) {
        Some(letter) => format!("{letter}{}", disambiguation(board, mv, piece, &origin)),
        None if captures => origin[..1].to_string(),
        None => String::new(),
    };
    if captures {
        san.push('x');
    }
    san.push_str(&format_square(mv.to));
    if let Some(letter) = mv.promotion.and_then(piece_letter) {
        san.push('=');
        san.push(letter);
    }
    san
}

/// Pawns have no letter in SAN.
fn piece_letter(piece: Piece) -> Option<char> {
    match piece {
        Piece::Pawn => None,
        Piece::Knight => Some('N'),
        Piece::Bishop => Some('B'),
        Piece::Rook => Some('R'),
        Piece::Queen => Some('Q'),
        Piece::King => Some('K'),
    }
}

/// Minimal origin hint when another piece of the same kind can reach the
/// same square: file first, then rank, then both.
fn disambiguation(board: &Board, mv: Move, piece: Piece, origin: &str) -> String {
    let mut rivals = Vec::new();
    board.generate_moves(|mvs| {
        if mvs.piece == piece {
            rivals.extend(mvs.into_iter().filter(|m| m.to == mv.to && m.from != mv.from));
        }
        false
    });

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|m| m.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|m| m.from.rank() == mv.from.rank());

    let hint = match (shares_file, shares_rank) {
        (false, _) => &origin[..1],
        (true, false) => &origin[1..],
        (true, true) => origin,
    };
    hint.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::START_FEN;
    use crate::uci::parse_uci_move;

    fn san(fen: &str, uci: &str) -> String {
        let board: Board = fen.parse().unwrap();
        format_san(&board, parse_uci_move(uci).unwrap())
    }

    #[test]
    fn test_pawn_push() {
        assert_eq!(san(START_FEN, "e2e4"), "e4");
    }

    #[test]
    fn test_knight() {
        assert_eq!(san(START_FEN, "g1f3"), "Nf3");
    }

    #[test]
    fn test_pawn_capture() {
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        assert_eq!(san(fen, "e4d5"), "exd5");
    }

    #[test]
    fn test_castling_kingside() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1";
        assert_eq!(san(fen, "e1h1"), "O-O");
    }

    #[test]
    fn test_castling_queenside() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/R3KBNR w KQkq - 0 1";
        assert_eq!(san(fen, "e1a1"), "O-O-O");
    }

    #[test]
    fn test_promotion() {
        let fen = "8/P7/8/8/8/7k/8/4K3 w - - 0 1";
        assert_eq!(san(fen, "a7a8q"), "a8=Q");
        assert_eq!(san(fen, "a7a8n"), "a8=N");
    }

    #[test]
    fn test_promotion_with_check() {
        // New queen on a8 sees h1 along the long diagonal
        let fen = "8/P7/8/8/8/8/8/4K2k w - - 0 1";
        assert_eq!(san(fen, "a7a8q"), "a8=Q+");
    }

    #[test]
    fn test_file_disambiguation() {
        // Knights on b1 and f1 can both reach d2
        let fen = "4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1";
        assert_eq!(san(fen, "b1d2"), "Nbd2");
    }

    #[test]
    fn test_rank_disambiguation() {
        // Rooks on a1 and a5 can both reach a3
        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san(fen, "a1a3"), "R1a3");
    }

    #[test]
    fn test_check_and_mate_suffix() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(san(fen, "d8h4"), "Qh4#");

        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san(fen, "a1a8"), "Ra8+");
    }
}
