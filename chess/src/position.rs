//! Game-facing position wrapper around the cozy-chess board.

use cozy_chess::{Board, Color, GameStatus, Move, Piece};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::moves::format_move_token;

/// A live chess position. Moves are validated before they are applied; the
/// wrapped board never holds an unreachable state.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PositionError {
    #[error("illegal move {0}")]
    IllegalMove(String),
    #[error(transparent)]
    Fen(#[from] FenError),
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub checkmate: bool,
    pub stalemate: bool,
    pub winner: Option<Color>,
}

impl Position {
    /// The standard starting position.
    pub fn starting() -> Self {
        Self {
            board: Board::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self {
            board: parse_fen(fen)?,
        })
    }

    pub fn fen(&self) -> String {
        format_fen(&self.board)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|batch| {
            moves.extend(batch);
            false
        });
        moves
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.legal_moves().contains(&mv)
    }

    /// Play a move, rejecting it if it is not legal here.
    pub fn apply(&mut self, mv: Move) -> Result<(), PositionError> {
        if !self.is_legal(mv) {
            return Err(PositionError::IllegalMove(format_move_token(mv)));
        }
        self.board.play_unchecked(mv);
        Ok(())
    }

    /// Whether the game is over in this position.
    pub fn is_terminal(&self) -> bool {
        self.board.status() != GameStatus::Ongoing
    }

    /// The result of the game, if it is over.
    pub fn outcome(&self) -> Option<GameOutcome> {
        match self.board.status() {
            GameStatus::Ongoing => None,
            GameStatus::Won => Some(GameOutcome {
                checkmate: true,
                stalemate: false,
                winner: Some(!self.board.side_to_move()),
            }),
            GameStatus::Drawn => Some(GameOutcome {
                checkmate: false,
                // Drawn also covers the fifty-move rule; stalemate is the
                // no-moves-and-no-check case.
                stalemate: !self.is_check() && self.legal_moves().is_empty(),
                winner: None,
            }),
        }
    }

    /// Standard algebraic notation for a move in this position, rendered
    /// before the move is played. Falls back to the raw token for moves
    /// that are not legal here. Disambiguation beyond the pawn-capture
    /// file is not emitted.
    pub fn san(&self, mv: Move) -> String {
        if !self.is_legal(mv) {
            return format_move_token(mv);
        }
        let Some(piece) = self.board.piece_on(mv.from) else {
            return format_move_token(mv);
        };

        let castling = piece == Piece::King
            && self.board.piece_on(mv.to) == Some(Piece::Rook)
            && self.board.color_on(mv.to) == self.board.color_on(mv.from);

        let mut san = if castling {
            if (mv.to.file() as u8) > (mv.from.file() as u8) {
                "O-O".to_string()
            } else {
                "O-O-O".to_string()
            }
        } else {
            let capture = self.board.piece_on(mv.to).is_some()
                && self.board.color_on(mv.to) != self.board.color_on(mv.from);
            let mut san = String::new();
            match piece {
                Piece::Pawn => {
                    if capture {
                        san.push((b'a' + mv.from.file() as u8) as char);
                    }
                }
                other => san.push(piece_letter(other)),
            }
            if capture {
                san.push('x');
            }
            san.push((b'a' + mv.to.file() as u8) as char);
            san.push((b'1' + mv.to.rank() as u8) as char);
            if let Some(promotion) = mv.promotion {
                san.push('=');
                san.push(piece_letter(promotion));
            }
            san
        };

        let mut after = self.board.clone();
        after.play_unchecked(mv);
        if !after.checkers().is_empty() {
            san.push(if after.status() == GameStatus::Won {
                '#'
            } else {
                '+'
            });
        }
        san
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
        Piece::Pawn => 'P',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::parse_move_token;

    fn mv(token: &str) -> Move {
        parse_move_token(token).unwrap()
    }

    #[test]
    fn apply_rejects_illegal_moves_and_keeps_state() {
        let mut position = Position::starting();
        let fen_before = position.fen();
        assert!(position.apply(mv("e2e5")).is_err());
        assert_eq!(position.fen(), fen_before);
    }

    #[test]
    fn apply_plays_legal_moves() {
        let mut position = Position::starting();
        position.apply(mv("e2e4")).unwrap();
        assert_eq!(position.side_to_move(), Color::Black);
        assert!(position.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/"));
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let mut position = Position::starting();
        for token in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            position.apply(mv(token)).unwrap();
        }
        assert!(position.is_terminal());
        let outcome = position.outcome().unwrap();
        assert!(outcome.checkmate);
        assert!(!outcome.stalemate);
        assert_eq!(outcome.winner, Some(Color::Black));
    }

    #[test]
    fn stalemate_has_no_winner() {
        // Black king in the corner, no moves, not in check.
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(position.is_terminal());
        let outcome = position.outcome().unwrap();
        assert!(outcome.stalemate);
        assert!(!outcome.checkmate);
        assert_eq!(outcome.winner, None);
    }

    #[test]
    fn ongoing_game_has_no_outcome() {
        assert_eq!(Position::starting().outcome(), None);
        assert!(!Position::starting().is_terminal());
    }

    #[test]
    fn san_covers_the_common_shapes() {
        let position = Position::starting();
        assert_eq!(position.san(mv("e2e4")), "e4");
        assert_eq!(position.san(mv("g1f3")), "Nf3");

        // Pawn capture includes the source file.
        let mut position = Position::starting();
        position.apply(mv("e2e4")).unwrap();
        position.apply(mv("d7d5")).unwrap();
        assert_eq!(position.san(mv("e4d5")), "exd5");
    }

    #[test]
    fn san_renders_castling_and_mate() {
        let position =
            Position::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(position.san(mv("e1h1")), "O-O");
        assert_eq!(position.san(mv("e1a1")), "O-O-O");

        let mut position = Position::starting();
        for token in ["f2f3", "e7e5", "g2g4"] {
            position.apply(mv(token)).unwrap();
        }
        assert_eq!(position.san(mv("d8h4")), "Qh4#");
    }
}
