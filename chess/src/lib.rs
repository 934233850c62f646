//! Chess rules capability: position state, legality, notation, FEN and
//! move-token codecs, and attack-set computation.
//!
//! Everything rule-related is delegated to cozy-chess; this crate wraps it
//! in the game-facing API the controller and engine client consume.

pub mod attacks;
pub mod fen;
pub mod moves;
pub mod position;

pub use fen::{format_fen, parse_fen, FenError};
pub use moves::{
    format_move_token, history_tokens, normalize_castling, parse_move_token, standard_move_token,
};
pub use position::{GameOutcome, Position, PositionError};
