//! The move-provider contract and its two implementations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chess::Position;
use cozy_chess::Move;
use engine::{EngineSession, SessionError};
use tokio::sync::{mpsc, Notify};

/// Why a move request produced no move.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// A rollback (or the front end) cancelled the pending wait. The game
    /// loop swallows this and re-polls; it never reaches the user.
    #[error("move request cancelled")]
    Cancelled,
    #[error("timed out waiting for a move")]
    Timeout,
    #[error("engine error: {0}")]
    Engine(SessionError),
    #[error("move history failed to replay: {0}")]
    History(String),
    #[error("move source closed")]
    Closed,
}

/// A source of moves for one side of the board.
#[async_trait]
pub trait MoveProvider: Send {
    /// Produce the next move for `position`. `history` is every move played
    /// so far from the starting position. Implementations may ignore the
    /// timeout (a human takes as long as they take).
    async fn request_move(
        &mut self,
        history: &[Move],
        position: &Position,
        timeout: Option<Duration>,
    ) -> Result<Move, ProviderError>;

    /// Abort a pending `request_move`, if any, making it fail fast with
    /// [`ProviderError::Cancelled`]. Idempotent; safe when nothing is
    /// pending.
    fn cancel_move(&mut self);
}

/// Bridges an interactive front end: moves arrive on a channel, and either
/// side can fail a pending wait immediately.
pub struct HumanProvider {
    moves_rx: mpsc::Receiver<Move>,
    cancelled: Arc<Notify>,
}

/// Front-end handle for a [`HumanProvider`]. Clone freely.
#[derive(Clone)]
pub struct HumanInput {
    moves_tx: mpsc::Sender<Move>,
    cancelled: Arc<Notify>,
}

impl HumanProvider {
    pub fn new() -> (Self, HumanInput) {
        let (moves_tx, moves_rx) = mpsc::channel(4);
        let cancelled = Arc::new(Notify::new());
        (
            Self {
                moves_rx,
                cancelled: cancelled.clone(),
            },
            HumanInput {
                moves_tx,
                cancelled,
            },
        )
    }
}

impl HumanInput {
    /// Submit a move. Returns false once the provider is gone.
    pub async fn submit(&self, mv: Move) -> bool {
        self.moves_tx.send(mv).await.is_ok()
    }

    /// Abort the provider's pending wait from the front-end side.
    pub fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}

#[async_trait]
impl MoveProvider for HumanProvider {
    async fn request_move(
        &mut self,
        _history: &[Move],
        _position: &Position,
        _timeout: Option<Duration>,
    ) -> Result<Move, ProviderError> {
        tokio::select! {
            mv = self.moves_rx.recv() => mv.ok_or(ProviderError::Closed),
            _ = self.cancelled.notified() => Err(ProviderError::Cancelled),
        }
    }

    fn cancel_move(&mut self) {
        // Drop anything queued for the abandoned position, then fail the
        // pending wait if there is one. notify_waiters stores no permit,
        // which is what makes this idempotent and safe while idle.
        while self.moves_rx.try_recv().is_ok() {}
        self.cancelled.notify_waiters();
    }
}

/// Plays the moves an engine session computes.
pub struct EngineProvider {
    session: EngineSession,
    default_timeout: Duration,
}

impl EngineProvider {
    pub fn new(session: EngineSession, default_timeout: Duration) -> Self {
        Self {
            session,
            default_timeout,
        }
    }
}

#[async_trait]
impl MoveProvider for EngineProvider {
    async fn request_move(
        &mut self,
        history: &[Move],
        position: &Position,
        timeout: Option<Duration>,
    ) -> Result<Move, ProviderError> {
        let tokens =
            chess::history_tokens(history).map_err(|err| ProviderError::History(err.to_string()))?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        let raw = match self.session.request_move(&tokens, timeout).await {
            Ok(mv) => mv,
            Err(SessionError::Timeout) => return Err(ProviderError::Timeout),
            Err(err) => return Err(ProviderError::Engine(err)),
        };
        // Engines announce castling as the two-square king hop; map it onto
        // the rules library's king-takes-rook form.
        Ok(chess::normalize_castling(raw, &position.legal_moves()))
    }

    fn cancel_move(&mut self) {
        // Deliberate no-op. The in-flight computation finishes in the
        // background; its result is discarded by the session's staleness
        // guard and the game loop's state-changed check, never applied.
    }
}
