//! Derived per-square threat highlighting.
//!
//! Recomputed from scratch on every position change; the map carries no
//! identity across positions.

use std::collections::HashMap;

use chess::attacks::attacked_squares;
use cozy_chess::{BitBoard, Board, Color, Square};
use serde::{Deserialize, Serialize};

/// Hint switches for one color's pieces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorHints {
    /// Highlight this color's pieces that the opponent attacks.
    pub attacked: bool,
    /// Highlight this color's pieces that are attacked and not defended.
    pub at_risk: bool,
}

/// Per-color hint configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintConfig {
    pub white: ColorHints,
    pub black: ColorHints,
}

impl HintConfig {
    /// The default policy for a human/engine split: the human side sees
    /// everything, the engine side nothing.
    pub fn for_human_side(side: Color) -> Self {
        let full = ColorHints {
            attacked: true,
            at_risk: true,
        };
        match side {
            Color::White => Self {
                white: full,
                black: ColorHints::default(),
            },
            Color::Black => Self {
                white: ColorHints::default(),
                black: full,
            },
        }
    }
}

/// Highlight tag for a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatTag {
    Attacked,
    AtRisk,
}

/// Compute the square → tag map for a position.
///
/// Kings never appear in the map (check has its own signal). Writes happen
/// in a fixed order (attacked before at-risk, white before black), so a
/// square both attacked and undefended ends up tagged `AtRisk`.
pub fn compute(board: &Board, hints: &HintConfig) -> HashMap<Square, ThreatTag> {
    let white = board.colors(Color::White);
    let black = board.colors(Color::Black);

    let white_attacks = attacked_squares(board, Color::White);
    let black_attacks = attacked_squares(board, Color::Black);

    // A color "defends" its own pieces that sit inside its attack set.
    let white_defends = white_attacks & white;
    let black_defends = black_attacks & black;

    let white_king = BitBoard::from(board.king(Color::White));
    let black_king = BitBoard::from(board.king(Color::Black));
    let black_on_white = black_attacks & white & !white_king;
    let white_on_black = white_attacks & black & !black_king;

    let mut tags = HashMap::new();
    if hints.white.attacked {
        for sq in black_on_white {
            tags.insert(sq, ThreatTag::Attacked);
        }
    }
    if hints.white.at_risk {
        for sq in black_on_white & !white_defends {
            tags.insert(sq, ThreatTag::AtRisk);
        }
    }
    if hints.black.attacked {
        for sq in white_on_black {
            tags.insert(sq, ThreatTag::Attacked);
        }
    }
    if hints.black.at_risk {
        for sq in white_on_black & !black_defends {
            tags.insert(sq, ThreatTag::AtRisk);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().expect("valid fen")
    }

    fn white_hints(attacked: bool, at_risk: bool) -> HintConfig {
        HintConfig {
            white: ColorHints { attacked, at_risk },
            black: ColorHints::default(),
        }
    }

    // Black knight on e3 attacks the undefended white pawn on c2; the
    // white king on a1 is too far away to defend it.
    const KNIGHT_FORKS_PAWN: &str = "4k3/8/8/8/8/4n3/2P5/K7 w - - 0 1";

    #[test]
    fn undefended_pawn_is_at_risk_but_not_attacked() {
        let tags = compute(&board(KNIGHT_FORKS_PAWN), &white_hints(false, true));
        assert_eq!(tags.get(&Square::C2), Some(&ThreatTag::AtRisk));
        assert!(!tags.values().any(|t| *t == ThreatTag::Attacked));
    }

    #[test]
    fn at_risk_wins_when_both_switches_are_on() {
        let tags = compute(&board(KNIGHT_FORKS_PAWN), &white_hints(true, true));
        assert_eq!(tags.get(&Square::C2), Some(&ThreatTag::AtRisk));
    }

    #[test]
    fn defended_pawn_is_only_attacked() {
        // Same shape plus a white knight on a3 covering c2.
        let tags = compute(
            &board("4k3/8/8/8/8/N3n3/2P5/K7 w - - 0 1"),
            &white_hints(true, true),
        );
        assert_eq!(tags.get(&Square::C2), Some(&ThreatTag::Attacked));
    }

    #[test]
    fn kings_are_never_tagged() {
        // Black knight on b3 gives check; the king square stays untagged.
        let tags = compute(
            &board("4k3/8/8/8/8/1n6/2P5/K7 w - - 0 1"),
            &white_hints(true, true),
        );
        assert_eq!(tags.get(&Square::A1), None);
    }

    #[test]
    fn switches_off_means_no_tags() {
        let tags = compute(&board(KNIGHT_FORKS_PAWN), &HintConfig::default());
        assert!(tags.is_empty());
    }

    #[test]
    fn hints_apply_per_color() {
        // No white piece attacks a black piece here, so turning on only the
        // black-side hints yields nothing.
        let hints = HintConfig {
            white: ColorHints::default(),
            black: ColorHints {
                attacked: true,
                at_risk: true,
            },
        };
        let tags = compute(&board(KNIGHT_FORKS_PAWN), &hints);
        assert!(tags.is_empty());
    }
}
