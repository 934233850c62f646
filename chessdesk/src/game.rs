//! The game controller: alternates the two move providers, applies moves to
//! the ledger, recomputes the threat overlay, and handles rollback.
//!
//! The loop is single-threaded cooperative: all ledger mutation happens
//! inside [`Game::play`], so no locks are involved. Rollback requests from
//! other tasks arrive on a control channel and are executed by the loop
//! itself between (or instead of) move waits.

use std::collections::HashMap;
use std::time::Duration;

use chess::{GameOutcome, Position};
use cozy_chess::{Color, Move, Square};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::ledger::MoveLedger;
use crate::overlay::{self, HintConfig, ThreatTag};
use crate::players::{MoveProvider, ProviderError};
use crate::store::{GameRecord, GameStore};
use engine::SkillLevel;

/// Who plays which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    HumanWhiteEngineBlack,
    EngineWhiteHumanBlack,
}

impl GameMode {
    /// The side the human plays in this mode.
    pub fn human_side(self) -> Color {
        match self {
            GameMode::HumanWhiteEngineBlack => Color::White,
            GameMode::EngineWhiteHumanBlack => Color::Black,
        }
    }
}

/// Everything needed to set up a new game.
#[derive(Debug, Clone)]
pub struct GameDetails {
    pub mode: GameMode,
    pub hints: HintConfig,
    pub skill: SkillLevel,
}

impl GameDetails {
    /// Details with the original default policy: the human side gets both
    /// hint switches, the engine side none.
    pub fn new(mode: GameMode, skill: SkillLevel) -> Self {
        Self {
            mode,
            hints: HintConfig::for_human_side(mode.human_side()),
            skill,
        }
    }
}

/// Fatal game failures. Routine control-flow signals (timeouts,
/// cancellations) are handled inside the loop and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("{0} is an illegal move, aborting game")]
    IllegalMove(String),
    #[error(transparent)]
    Rollback(RollbackError),
    #[error("move provider failed: {0}")]
    Provider(ProviderError),
}

/// Rollback failures, reported back through [`GameHandle::rollback_to`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum RollbackError {
    #[error("rollback index {index} out of range (ledger has {len} moves)")]
    OutOfRange { index: usize, len: usize },
    #[error("stored position snapshot failed to decode")]
    CorruptState,
    #[error("the game is no longer running")]
    GameOver,
}

enum ControlRequest {
    Rollback {
        index: usize,
        reply: oneshot::Sender<Result<(), RollbackError>>,
    },
}

/// Cloneable handle for interrupting a running game loop from another task.
#[derive(Clone)]
pub struct GameHandle {
    control_tx: mpsc::Sender<ControlRequest>,
}

impl GameHandle {
    /// Roll the game back so `index` is the last played move. Resolves once
    /// the loop has cancelled the providers, truncated the ledger, and
    /// rebuilt the live position.
    pub async fn rollback_to(&self, index: usize) -> Result<(), RollbackError> {
        let (reply, rx) = oneshot::channel();
        if self
            .control_tx
            .send(ControlRequest::Rollback { index, reply })
            .await
            .is_err()
        {
            return Err(RollbackError::GameOver);
        }
        rx.await.map_err(|_| RollbackError::GameOver)?
    }
}

type MoveObserver = Box<dyn FnMut(&Position, Move) + Send>;

pub struct Game {
    position: Position,
    ledger: MoveLedger,
    white: Box<dyn MoveProvider>,
    black: Box<dyn MoveProvider>,
    hints: HintConfig,
    overlay: HashMap<Square, ThreatTag>,
    observers: Vec<MoveObserver>,
    /// Raised by a rollback, consumed by the loop when it discards the
    /// stale in-flight result.
    state_changed: bool,
    store: Option<GameStore>,
    record: GameRecord,
    move_timeout: Duration,
    control_tx: mpsc::Sender<ControlRequest>,
    control_rx: mpsc::Receiver<ControlRequest>,
}

enum LoopEvent {
    Move(Result<Move, ProviderError>),
    Control(ControlRequest),
}

impl Game {
    /// Build a game from its parts. `white` and `black` are whatever mix of
    /// human and engine providers the mode calls for; `store` is where the
    /// in-progress record lives (None disables persistence).
    pub fn new(
        details: GameDetails,
        white: Box<dyn MoveProvider>,
        black: Box<dyn MoveProvider>,
        store: Option<GameStore>,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::channel(4);
        let position = Position::starting();
        let overlay = overlay::compute(position.board(), &details.hints);
        let record = GameRecord::new(details.mode, details.hints, details.skill);
        Self {
            position,
            ledger: MoveLedger::new(),
            white,
            black,
            hints: details.hints,
            overlay,
            observers: Vec::new(),
            state_changed: false,
            store,
            record,
            move_timeout: crate::config::get_move_timeout(),
            control_tx,
            control_rx,
        }
    }

    /// Handle for rollback requests from other tasks.
    pub fn handle(&self) -> GameHandle {
        GameHandle {
            control_tx: self.control_tx.clone(),
        }
    }

    /// Register a post-move observer (move list display, logging, ...).
    pub fn on_move(&mut self, observer: impl FnMut(&Position, Move) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn ledger(&self) -> &MoveLedger {
        &self.ledger
    }

    /// The current threat overlay, recomputed on every position change.
    pub fn overlay(&self) -> &HashMap<Square, ThreatTag> {
        &self.overlay
    }

    /// Identity of the persisted record for this game.
    pub fn record_id(&self) -> &str {
        &self.record.game_id
    }

    /// Run the game to completion, alternating providers by side to move.
    ///
    /// Routine provider failures are absorbed: `Cancelled` means a rollback
    /// interrupted the wait (re-poll), `Timeout` re-polls the same provider
    /// (an engine's re-issued request joins the computation still in
    /// flight). Anything else ends the game with an error.
    pub async fn play(&mut self) -> Result<GameOutcome, GameError> {
        // Save the empty record up front so the game is on disk from move
        // zero.
        self.persist();

        loop {
            // Rollbacks that arrived while nobody was waiting on a move.
            while let Ok(request) = self.control_rx.try_recv() {
                self.apply_control(request)?;
            }
            self.state_changed = false;

            let turn = self.position.side_to_move();
            let provider = match turn {
                Color::White => self.white.as_mut(),
                Color::Black => self.black.as_mut(),
            };

            let event = tokio::select! {
                biased;

                Some(request) = self.control_rx.recv() => LoopEvent::Control(request),
                result = provider.request_move(
                    self.ledger.moves(),
                    &self.position,
                    Some(self.move_timeout),
                ) => LoopEvent::Move(result),
            };

            match event {
                LoopEvent::Control(request) => {
                    self.apply_control(request)?;
                    continue;
                }
                LoopEvent::Move(result) => {
                    // The consumption contract: a rollback that landed
                    // between resolution and here makes this result stale.
                    if self.state_changed {
                        self.state_changed = false;
                        continue;
                    }
                    match result {
                        Ok(mv) => {
                            if let Some(outcome) = self.apply_move(mv)? {
                                tracing::info!(?outcome, "game over");
                                return Ok(outcome);
                            }
                        }
                        Err(ProviderError::Cancelled) => {
                            self.state_changed = false;
                            continue;
                        }
                        Err(ProviderError::Timeout) => {
                            tracing::warn!(?turn, "move request timed out, re-polling");
                            continue;
                        }
                        Err(err) => return Err(GameError::Provider(err)),
                    }
                }
            }
        }
    }

    /// Validate and apply one move. Returns the outcome when the move ends
    /// the game, in which case the persisted record is deleted.
    fn apply_move(&mut self, mv: Move) -> Result<Option<GameOutcome>, GameError> {
        // Accept standard castling tokens from either provider kind.
        let mv = chess::normalize_castling(mv, &self.position.legal_moves());

        let san = self.position.san(mv);
        self.position
            .apply(mv)
            .map_err(|_| GameError::IllegalMove(san.clone()))?;

        let fen = self.position.fen();
        self.ledger.push(mv, fen);
        self.persist();

        for observer in &mut self.observers {
            observer(&self.position, mv);
        }
        self.refresh_overlay();
        tracing::info!(%san, ply = self.ledger.len(), "move played");

        if self.position.is_terminal() {
            if let Some(store) = &self.store {
                if let Err(err) = store.delete(&self.record.game_id) {
                    tracing::warn!("failed to delete finished game record: {err}");
                }
            }
            return Ok(self.position.outcome());
        }
        Ok(None)
    }

    fn apply_control(&mut self, request: ControlRequest) -> Result<(), GameError> {
        match request {
            ControlRequest::Rollback { index, reply } => {
                match self.execute_rollback(index) {
                    Ok(()) => {
                        let _ = reply.send(Ok(()));
                        Ok(())
                    }
                    Err(err @ RollbackError::OutOfRange { .. }) => {
                        // Routine: report it and keep playing.
                        let _ = reply.send(Err(err));
                        Ok(())
                    }
                    Err(err) => {
                        // A snapshot that fails to decode is fatal.
                        let _ = reply.send(Err(err.clone()));
                        Err(GameError::Rollback(err))
                    }
                }
            }
        }
    }

    /// Rollback, in order: validate the index, cancel both providers, raise
    /// the state-changed flag, truncate the ledger, rebuild the live
    /// position from the retained snapshot.
    fn execute_rollback(&mut self, index: usize) -> Result<(), RollbackError> {
        if index >= self.ledger.len() {
            return Err(RollbackError::OutOfRange {
                index,
                len: self.ledger.len(),
            });
        }

        // Fail the pending waits first so neither provider can resolve
        // against the truncated history.
        self.white.cancel_move();
        self.black.cancel_move();
        self.state_changed = true;

        self.ledger.truncate_to(index);
        let Some(fen) = self.ledger.fen_at(index).map(str::to_string) else {
            return Err(RollbackError::OutOfRange {
                index,
                len: self.ledger.len(),
            });
        };
        self.position = Position::from_fen(&fen).map_err(|err| {
            tracing::error!(%fen, "rollback snapshot failed to decode: {err}");
            RollbackError::CorruptState
        })?;

        self.refresh_overlay();
        self.persist();
        tracing::info!(index, %fen, "rolled back");
        Ok(())
    }

    fn refresh_overlay(&mut self) {
        self.overlay = overlay::compute(self.position.board(), &self.hints);
    }

    /// Rewrite the persisted record to match the ledger. Persistence
    /// failures are logged, not fatal; the game stays playable.
    fn persist(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        match chess::history_tokens(self.ledger.moves()) {
            Ok(tokens) => {
                self.record.moves = tokens.join(" ");
                if let Err(err) = store.save(&self.record) {
                    tracing::warn!("failed to persist game record: {err}");
                }
            }
            Err(err) => tracing::warn!("failed to encode move history: {err}"),
        }
    }
}
