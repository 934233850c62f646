//! Runtime configuration.
//!
//! Every tunable has a compile-time default and an environment-variable
//! override; per-game options (side, skill, search limits) come from the
//! CLI instead.

use std::path::PathBuf;
use std::time::Duration;

/// Default wait for a single engine move.
const DEFAULT_MOVE_TIMEOUT_SECS: u64 = 30;

/// Default wait for engine initialization and game setup.
const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 5;

/// Where game records live when `CHESSDESK_DATA_DIR` is unset.
const DEFAULT_DATA_DIR_NAME: &str = ".chessdesk";

/// Directory holding saved games.
///
/// Priority:
/// 1. `CHESSDESK_DATA_DIR` env variable if set
/// 2. `$HOME/.chessdesk`
/// 3. `./.chessdesk` when no home directory exists
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSDESK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(DEFAULT_DATA_DIR_NAME),
        Err(_) => PathBuf::from(DEFAULT_DATA_DIR_NAME),
    }
}

/// Explicit engine binary path, if one was configured.
///
/// Priority:
/// 1. `CHESSDESK_ENGINE_PATH` env variable if set
/// 2. None, in which case the process layer probes the usual install locations
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("CHESSDESK_ENGINE_PATH").ok().map(PathBuf::from)
}

/// How long one engine move may take before the caller's wait is abandoned.
///
/// Priority:
/// 1. `CHESSDESK_MOVE_TIMEOUT_SECS` env variable if set (falls back to the
///    default if the value does not parse as a `u64`)
/// 2. 30 seconds
pub fn get_move_timeout() -> Duration {
    let secs = match std::env::var("CHESSDESK_MOVE_TIMEOUT_SECS") {
        Ok(value) => value.parse().unwrap_or(DEFAULT_MOVE_TIMEOUT_SECS),
        Err(_) => DEFAULT_MOVE_TIMEOUT_SECS,
    };
    Duration::from_secs(secs)
}

/// How long engine initialization and new-game setup may take.
pub fn get_setup_timeout() -> Duration {
    Duration::from_secs(DEFAULT_SETUP_TIMEOUT_SECS)
}
