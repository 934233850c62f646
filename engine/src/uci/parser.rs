use cozy_chess::Move;

use super::options::EngineOption;

/// One line of engine output, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum UciEvent {
    /// An `option name <N> type <T> ...` advertisement.
    Option(EngineOption),
    /// An `id name ...` or `id author ...` identity pair.
    Id { key: String, value: String },
    /// A `bestmove <token>` announcement. `None` when the token does not
    /// decode to a move (including the literal `(none)`).
    BestMove(Option<Move>),
    /// `readyok`.
    ReadyAck,
    /// `uciok`.
    UciAck,
    /// Anything else. Callers drop these silently.
    Unrecognized,
}

/// Classify a single line of engine output.
///
/// Never fails: malformed or unknown lines come back as
/// [`UciEvent::Unrecognized`] and it is the caller's job to ignore them.
pub fn parse_line(line: &str) -> UciEvent {
    let line = line.trim_end_matches(['\r', '\n']);

    match line {
        "uciok" => return UciEvent::UciAck,
        "readyok" => return UciEvent::ReadyAck,
        _ => {}
    }

    if let Some(option) = EngineOption::parse(line) {
        return UciEvent::Option(option);
    }

    if let Some(rest) = line.strip_prefix("id ") {
        if let Some((key, value)) = rest.split_once(' ') {
            let value = value.trim();
            if !value.is_empty() {
                return UciEvent::Id {
                    key: key.to_string(),
                    value: value.to_string(),
                };
            }
        }
        return UciEvent::Unrecognized;
    }

    if let Some(rest) = line.strip_prefix("bestmove ") {
        let token = rest.split_whitespace().next().unwrap_or_default();
        return UciEvent::BestMove(chess::parse_move_token(token));
    }

    UciEvent::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::format_move_token;

    #[test]
    fn classifies_acks() {
        assert_eq!(parse_line("uciok"), UciEvent::UciAck);
        assert_eq!(parse_line("readyok"), UciEvent::ReadyAck);
    }

    #[test]
    fn parses_identity_pairs() {
        assert_eq!(
            parse_line("id name Fairy-Stockfish 260425"),
            UciEvent::Id {
                key: "name".to_string(),
                value: "Fairy-Stockfish 260425".to_string(),
            }
        );
        assert_eq!(
            parse_line("id author Fabian Fichter"),
            UciEvent::Id {
                key: "author".to_string(),
                value: "Fabian Fichter".to_string(),
            }
        );
        // A key with no value is not an identity pair.
        assert_eq!(parse_line("id name"), UciEvent::Unrecognized);
    }

    #[test]
    fn parses_bestmove_with_and_without_ponder() {
        match parse_line("bestmove e2e4 ponder e7e5") {
            UciEvent::BestMove(Some(mv)) => assert_eq!(format_move_token(mv), "e2e4"),
            other => panic!("unexpected event: {other:?}"),
        }
        match parse_line("bestmove e7e8q") {
            UciEvent::BestMove(Some(mv)) => assert_eq!(format_move_token(mv), "e7e8q"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn undecodable_bestmove_means_no_move() {
        assert_eq!(parse_line("bestmove (none)"), UciEvent::BestMove(None));
        assert_eq!(parse_line("bestmove garbage"), UciEvent::BestMove(None));
    }

    #[test]
    fn everything_else_is_unrecognized() {
        for line in [
            "",
            "info depth 12 score cp 35",
            "bestmove",
            "Stockfish 16 by the Stockfish developers",
            "option name Broken type spin default x min 1 max 2",
        ] {
            assert_eq!(parse_line(line), UciEvent::Unrecognized, "line: {line:?}");
        }
    }

    #[test]
    fn option_lines_become_option_events() {
        assert!(matches!(
            parse_line("option name Threads type spin default 1 min 1 max 512"),
            UciEvent::Option(_)
        ));
    }
}
