use cozy_chess::Board;

/// Decode a FEN string into a board.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    fen.trim()
        .parse()
        .map_err(|_| FenError::Invalid(fen.to_string()))
}

/// Encode a board as a FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FenError {
    #[error("invalid FEN: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn round_trips_the_starting_position() {
        let board = parse_fen(STARTPOS).unwrap();
        assert_eq!(format_fen(&board), STARTPOS);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_fen("not a position").is_err());
        assert!(parse_fen("").is_err());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert!(parse_fen(&format!("  {STARTPOS}\n")).is_ok());
    }
}
