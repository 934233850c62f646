//! Saved-game persistence: one JSON file per record under the data
//! directory. A record exists exactly while its game is unfinished.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::game::GameMode;
use crate::overlay::HintConfig;
use engine::SkillLevel;

/// The persisted shape of an in-progress game: created at game start,
/// rewritten after every applied move (and after rollbacks), deleted when
/// the game reaches a terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub mode: GameMode,
    pub hints: HintConfig,
    pub skill: SkillLevel,
    /// Space-separated move tokens from the starting position.
    pub moves: String,
    pub created_at: u64,
}

impl GameRecord {
    pub fn new(mode: GameMode, hints: HintConfig, skill: SkillLevel) -> Self {
        Self {
            game_id: uuid::Uuid::new_v4().to_string(),
            mode,
            hints,
            skill,
            moves: String::new(),
            created_at: now_timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON-file-per-record store rooted at `<data_dir>/games`.
pub struct GameStore {
    dir: PathBuf,
}

impl GameStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            dir: data_dir.join("games"),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write (or rewrite) a record.
    pub fn save(&self, record: &GameRecord) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(self.path_for(&record.game_id), json)?;
        Ok(())
    }

    /// Load a record by id; None when no such game was saved.
    pub fn load(&self, id: &str) -> Result<Option<GameRecord>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&std::fs::read_to_string(path)?)?))
    }

    /// Every readable record, most recent first. Malformed entries are
    /// skipped with a warning, not surfaced as errors.
    pub fn list(&self) -> Result<Vec<GameRecord>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|contents| Ok(serde_json::from_str::<GameRecord>(&contents)?));
            match parsed {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(?path, "skipping unreadable game record: {err}"),
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Remove a record. Deleting a record that is already gone is fine.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
