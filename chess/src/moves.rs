//! Move-token (long algebraic) encoding and decoding.
//!
//! The wire format is the usual `e2e4` / `e7e8q` shape. One wrinkle:
//! cozy-chess represents castling as king-takes-own-rook (`e1h1`), while
//! engines speak the two-square king hop (`e1g1`). The helpers here convert
//! in both directions.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::position::{Position, PositionError};

/// Decode a move token like `e2e4` or `e7e8q`.
///
/// Returns `None` for anything that is not a well-formed token, including
/// the `(none)` an engine emits when it has no move.
pub fn parse_move_token(token: &str) -> Option<Move> {
    if !token.is_ascii() || !(4..=5).contains(&token.len()) {
        return None;
    }
    let from = parse_square(&token[0..2])?;
    let to = parse_square(&token[2..4])?;
    let promotion = match token.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return None,
    };
    Some(Move {
        from,
        to,
        promotion,
    })
}

fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    let file = File::try_index(bytes[0].checked_sub(b'a')? as usize)?;
    let rank = Rank::try_index(bytes[1].checked_sub(b'1')? as usize)?;
    Some(Square::new(file, rank))
}

/// Encode a move as a token, taking the move at face value (no castling
/// translation).
pub fn format_move_token(mv: Move) -> String {
    let mut token = String::with_capacity(5);
    push_square(&mut token, mv.from);
    push_square(&mut token, mv.to);
    if let Some(promotion) = mv.promotion {
        token.push(match promotion {
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            _ => 'q',
        });
    }
    token
}

fn push_square(out: &mut String, sq: Square) {
    out.push((b'a' + sq.file() as u8) as char);
    out.push((b'1' + sq.rank() as u8) as char);
}

/// Encode a move the way an engine expects it, translating cozy-chess's
/// king-takes-rook castling into the standard two-square king move.
pub fn standard_move_token(board: &Board, mv: Move) -> String {
    let is_castling = board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.from) == board.color_on(mv.to);

    if is_castling {
        let file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
            File::G
        } else {
            File::C
        };
        return format_move_token(Move {
            from: mv.from,
            to: Square::new(file, mv.from.rank()),
            promotion: None,
        });
    }
    format_move_token(mv)
}

/// Map an externally-supplied move onto the legal-move list, translating a
/// standard castling token (`e1g1`) into cozy-chess's king-takes-rook form
/// (`e1h1`) when that is what makes it legal.
pub fn normalize_castling(mv: Move, legal_moves: &[Move]) -> Move {
    if legal_moves.contains(&mv) {
        return mv;
    }

    let king_hop = mv.from.file() == File::E
        && matches!(mv.from.rank(), Rank::First | Rank::Eighth)
        && matches!(mv.to.file(), File::G | File::C)
        && mv.to.rank() == mv.from.rank()
        && mv.promotion.is_none();
    if !king_hop {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        _ => File::A,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };
    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}

/// Render a move history as the token sequence an engine's `position`
/// command wants, replaying from the starting position so castling moves
/// pick up the standard encoding.
pub fn history_tokens(moves: &[Move]) -> Result<Vec<String>, PositionError> {
    let mut position = Position::starting();
    let mut tokens = Vec::with_capacity(moves.len());
    for &mv in moves {
        tokens.push(standard_move_token(position.board(), mv));
        position.apply(mv)?;
    }
    Ok(tokens)
}
