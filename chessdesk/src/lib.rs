//! Game controller: the move ledger, rollback coordination, threat
//! overlay, the move-provider contract, and saved-game persistence.

pub mod config;
pub mod game;
pub mod ledger;
pub mod overlay;
pub mod players;
pub mod store;

pub use game::{Game, GameDetails, GameError, GameHandle, GameMode, RollbackError};
pub use ledger::MoveLedger;
pub use overlay::{ColorHints, HintConfig, ThreatTag};
pub use players::{EngineProvider, HumanInput, HumanProvider, MoveProvider, ProviderError};
pub use store::{GameRecord, GameStore, StoreError};
