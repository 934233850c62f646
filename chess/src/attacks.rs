//! Per-color attack-set computation.
//!
//! "Attacks" here means squares a piece controls, not moves it can legally
//! make: pinned pieces still attack, pawns only count their capture
//! diagonals, and occupancy of the target square is irrelevant.

use cozy_chess::{BitBoard, Board, Color, Piece, Square};

/// The union of all squares attacked by `color`'s pieces.
pub fn attacked_squares(board: &Board, color: Color) -> BitBoard {
    let mut attacks = BitBoard::EMPTY;
    for piece in Piece::ALL {
        for sq in board.pieces(piece) & board.colors(color) {
            attacks |= piece_attacks(board, sq, piece, color);
        }
    }
    attacks
}

/// Attack bitboard for a single piece standing on `sq`.
pub fn piece_attacks(board: &Board, sq: Square, piece: Piece, color: Color) -> BitBoard {
    let occupied = board.occupied();
    match piece {
        Piece::Pawn => cozy_chess::get_pawn_attacks(sq, color),
        Piece::Knight => cozy_chess::get_knight_moves(sq),
        Piece::Bishop => cozy_chess::get_bishop_moves(sq, occupied),
        Piece::Rook => cozy_chess::get_rook_moves(sq, occupied),
        Piece::Queen => {
            cozy_chess::get_bishop_moves(sq, occupied) | cozy_chess::get_rook_moves(sq, occupied)
        }
        Piece::King => cozy_chess::get_king_moves(sq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_attacks_third_rank() {
        let board = Board::default();
        let attacks = attacked_squares(&board, Color::White);
        assert!(attacks.has(Square::E3));
        assert!(attacks.has(Square::A3));
        // Nothing reaches past the fourth rank from the start.
        assert!(!attacks.has(Square::E5));
    }

    #[test]
    fn sliders_are_blocked_by_occupancy() {
        let board: Board = "4k3/8/8/8/8/8/4P3/4R2K w - - 0 1".parse().unwrap();
        let attacks = attacked_squares(&board, Color::White);
        // The rook sees up to its own pawn but not through it.
        assert!(attacks.has(Square::E2));
        assert!(!attacks.has(Square::E4));
    }

    #[test]
    fn pawns_attack_diagonals_only() {
        let board: Board = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1".parse().unwrap();
        let attacks = piece_attacks(&board, Square::E2, Piece::Pawn, Color::White);
        assert!(attacks.has(Square::D3));
        assert!(attacks.has(Square::F3));
        assert!(!attacks.has(Square::E3));
    }
}
