//! UCI engine client.
//!
//! [`uci`] is the line-level codec, [`session`] the lifecycle state machine
//! that owns a conversation with one engine, and [`process`] the child
//! process transport the session talks through.

pub mod process;
pub mod session;
pub mod uci;

pub use process::{EngineProcess, ProcessError};
pub use session::{EngineIo, EngineSession, SessionConfig, SessionError, SessionState};
pub use uci::{parse_line, EngineOption, OptionKind, UciEvent};

use serde::{Deserialize, Serialize};

/// Normalized engine strength, `0.0` (weakest) through `1.0` (strongest).
///
/// The engine advertises its own skill range; this value is projected onto
/// it when applied, so callers never deal in engine-specific units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillLevel(f64);

impl SkillLevel {
    pub const MIN: SkillLevel = SkillLevel(0.0);
    pub const MAX: SkillLevel = SkillLevel(1.0);

    pub fn new(level: f64) -> Self {
        Self(level.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Project onto an advertised spin range: `min + round(range * level)`.
    pub fn scale_to(self, min: i64, max: i64) -> i64 {
        min + (((max - min) as f64) * self.0).round() as i64
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        Self(0.5)
    }
}
