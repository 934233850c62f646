//! Engine session lifecycle.
//!
//! One [`EngineSession`] owns one conversation with one engine process. All
//! mutable state lives in an actor task: caller operations arrive as
//! commands carrying oneshot replies, engine output arrives as lines on a
//! second channel, and the actor processes both sequentially so there is
//! never a lock.
//!
//! Callers that need to wait for a lifecycle transition register a one-shot
//! waiter on the target state; the waiter queue for a state is drained in
//! registration order the moment the state is entered, then forgotten. A
//! caller that gave up (timed out) is simply a dropped receiver, so the drain
//! notifies nobody, which is exactly the semantics a late `bestmove` wants.

use std::collections::HashMap;

use cozy_chess::Move;
use tokio::sync::{mpsc, oneshot};

use crate::uci::{self, EngineOption, OptionKind, UciEvent};
use crate::SkillLevel;

/// Lifecycle states, ordered: "past Initialized" means a game is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    SettingUp,
    Initialized,
    StartingGame,
    GameReady,
    ComputingMove,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("operation not valid while the session is {0:?}")]
    StateConflict(SessionState),
    #[error("engine reported no best move")]
    NoMoveFound,
    #[error("timed out waiting for the engine")]
    Timeout,
    #[error("unknown engine option {0:?}")]
    UnknownOption(String),
    #[error(transparent)]
    InvalidValue(#[from] uci::OptionValueError),
    #[error("engine session closed")]
    Closed,
}

/// Session tunables. `parallelism` is injectable so tests can pin it; it
/// defaults to what the host reports.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub parallelism: usize,
    /// Never ask for more threads than this, whatever the host has.
    pub thread_ceiling: i64,
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub skill: SkillLevel,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            thread_ceiling: 12,
            depth: Some(22),
            movetime_ms: Some(1500),
            skill: SkillLevel::default(),
        }
    }
}

/// Line transport to the engine: `incoming` carries engine output,
/// `outgoing` the commands we send. [`crate::process`] wires these to a
/// child process; tests drive them directly.
pub struct EngineIo {
    pub incoming: mpsc::Receiver<String>,
    pub outgoing: mpsc::Sender<String>,
}

type Reply = oneshot::Sender<Result<Option<Move>, SessionError>>;

enum Command {
    Initialize {
        reply: Reply,
    },
    StartGame {
        reply: Reply,
    },
    EndGame {
        reply: oneshot::Sender<()>,
    },
    RequestMove {
        history: Vec<String>,
        reply: Reply,
    },
    SetOption {
        name: String,
        value: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SetSkill {
        level: SkillLevel,
        reply: oneshot::Sender<()>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    Quit,
}

/// Handle to a running session actor. Cheap to clone.
#[derive(Clone)]
pub struct EngineSession {
    cmd_tx: mpsc::Sender<Command>,
}

impl EngineSession {
    /// Start the session actor over the given transport.
    pub fn new(io: EngineIo, config: SessionConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = SessionActor {
            state: SessionState::SettingUp,
            options: HashMap::new(),
            identity: Vec::new(),
            best_move: None,
            waiters: HashMap::new(),
            outgoing: io.outgoing,
            config,
        };
        tokio::spawn(actor.run(io.incoming, cmd_rx));
        Self { cmd_tx }
    }

    /// Send `uci` and wait for the engine to finish advertising itself.
    /// Resolves immediately if the session is already initialized.
    pub async fn initialize(&self, timeout: std::time::Duration) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Initialize { reply }).await?;
        Self::await_ack(rx, timeout).await
    }

    /// Begin a new game: `ucinewgame` + `isready`, resolving on `readyok`.
    /// Fails fast with [`SessionError::StateConflict`] if a game is already
    /// active.
    pub async fn start_game(&self, timeout: std::time::Duration) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::StartGame { reply }).await?;
        Self::await_ack(rx, timeout).await
    }

    /// Drop back to the initialized state, discarding any stored move.
    pub async fn end_game(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::EndGame { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Ask the engine for the best move after `history` (move tokens from
    /// the starting position).
    ///
    /// Exactly one of four things happens: a move comes back; the engine
    /// finishes without a move ([`SessionError::NoMoveFound`]); the session
    /// is in the wrong state ([`SessionError::StateConflict`]); or `timeout`
    /// elapses first ([`SessionError::Timeout`]). A timeout abandons only
    /// this wait; the computation keeps running and the session stays in
    /// [`SessionState::ComputingMove`] until its `bestmove` arrives.
    pub async fn request_move(
        &self,
        history: &[String],
        timeout: std::time::Duration,
    ) -> Result<Move, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::RequestMove {
            history: history.to_vec(),
            reply,
        })
        .await?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(Some(mv)))) => Ok(mv),
            Ok(Ok(Ok(None))) => Err(SessionError::NoMoveFound),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => Err(SessionError::Timeout),
        }
    }

    /// Send a raw option assignment. The option must have been advertised.
    pub async fn set_option(&self, name: &str, value: &str) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetOption {
            name: name.to_string(),
            value: value.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Re-apply the skill mapping with a new level.
    pub async fn set_skill(&self, level: SkillLevel) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetSkill { level, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Current lifecycle state, for callers that need to re-check before
    /// trusting a stored result.
    pub async fn state(&self) -> Result<SessionState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::State { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Tell the engine to quit and shut the actor down.
    pub async fn quit(&self) {
        let _ = self.cmd_tx.send(Command::Quit).await;
    }

    async fn send(&self, cmd: Command) -> Result<(), SessionError> {
        self.cmd_tx.send(cmd).await.map_err(|_| SessionError::Closed)
    }

    async fn await_ack(
        rx: oneshot::Receiver<Result<Option<Move>, SessionError>>,
        timeout: std::time::Duration,
    ) -> Result<(), SessionError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result.map(|_| ()),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => Err(SessionError::Timeout),
        }
    }
}

struct SessionActor {
    state: SessionState,
    options: HashMap<String, EngineOption>,
    identity: Vec<(String, String)>,
    best_move: Option<Move>,
    waiters: HashMap<SessionState, Vec<Reply>>,
    outgoing: mpsc::Sender<String>,
    config: SessionConfig,
}

impl SessionActor {
    async fn run(mut self, mut incoming: mpsc::Receiver<String>, mut cmd_rx: mpsc::Receiver<Command>) {
        tracing::debug!("engine session actor started");
        loop {
            tokio::select! {
                // Protocol events first: a command observing the state sees
                // every line that arrived before it.
                biased;

                line = incoming.recv() => match line {
                    Some(line) => self.handle_line(line.trim()).await,
                    None => {
                        tracing::warn!("engine output closed");
                        break;
                    }
                },

                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Quit) | None => {
                        self.send("quit").await;
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },
            }
        }
        // Dropping the waiters here fails any still-pending caller with
        // `Closed` through its dead receiver.
        tracing::debug!("engine session actor exited");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Initialize { reply } => {
                self.send("uci").await;
                if self.state >= SessionState::Initialized {
                    let _ = reply.send(Ok(None));
                } else {
                    self.wait_for(SessionState::Initialized, reply);
                }
            }
            Command::StartGame { reply } => {
                if self.state > SessionState::Initialized {
                    let _ = reply.send(Err(SessionError::StateConflict(self.state)));
                    return;
                }
                self.transition(SessionState::StartingGame);
                self.send("ucinewgame").await;
                self.send("isready").await;
                self.wait_for(SessionState::GameReady, reply);
            }
            Command::EndGame { reply } => {
                self.best_move = None;
                self.transition(SessionState::Initialized);
                let _ = reply.send(());
            }
            Command::RequestMove { history, reply } => match self.state {
                SessionState::GameReady => {
                    // Stale move from a wait nobody consumed; a fresh
                    // request must never resolve against it.
                    self.best_move = None;
                    self.transition(SessionState::ComputingMove);
                    self.send(&position_command(&history)).await;
                    self.send(&self.go_command()).await;
                    self.wait_for(SessionState::GameReady, reply);
                }
                SessionState::ComputingMove => {
                    // A computation is already in flight; join it rather
                    // than issuing a second `go`.
                    self.wait_for(SessionState::GameReady, reply);
                }
                state => {
                    let _ = reply.send(Err(SessionError::StateConflict(state)));
                }
            },
            Command::SetOption { name, value, reply } => {
                let result = match self.options.get(&name) {
                    Some(option) => match option.set_command(&value) {
                        Ok(cmd) => {
                            self.send(&cmd).await;
                            Ok(())
                        }
                        Err(err) => Err(SessionError::InvalidValue(err)),
                    },
                    None => Err(SessionError::UnknownOption(name)),
                };
                let _ = reply.send(result);
            }
            Command::SetSkill { level, reply } => {
                self.apply_skill(level).await;
                let _ = reply.send(());
            }
            Command::State { reply } => {
                let _ = reply.send(self.state);
            }
            Command::Quit => unreachable!("handled by the actor loop"),
        }
    }

    async fn handle_line(&mut self, line: &str) {
        tracing::trace!("uci << {line}");
        match (self.state, uci::parse_line(line)) {
            (SessionState::SettingUp, UciEvent::Option(option)) => {
                self.options.insert(option.name.clone(), option);
            }
            (SessionState::SettingUp, UciEvent::Id { key, value }) => {
                self.identity.push((key, value));
            }
            (SessionState::SettingUp, UciEvent::UciAck) => {
                if let Some((_, name)) = self.identity.iter().find(|(key, _)| key == "name") {
                    tracing::info!(engine = %name, options = self.options.len(), "engine identified");
                }
                self.apply_default_tuning().await;
                self.transition(SessionState::Initialized);
            }
            (SessionState::StartingGame, UciEvent::ReadyAck) => {
                self.transition(SessionState::GameReady);
            }
            (SessionState::ComputingMove, UciEvent::BestMove(mv)) => {
                self.best_move = mv;
                self.transition(SessionState::GameReady);
            }
            // Out-of-state and unrecognized lines are dropped, not errors.
            _ => {}
        }
    }

    /// One-time tuning once the option advertisement is complete: leave a
    /// core for the rest of the program, never exceed the ceiling or the
    /// advertised bounds, and scale the hash budget with the thread count.
    async fn apply_default_tuning(&mut self) {
        let threads_spin = match self.options.get("Threads") {
            Some(EngineOption {
                kind: OptionKind::Spin { default, min, max },
                ..
            }) => Some((*default, *min, *max)),
            _ => None,
        };
        let hash_default = match self.options.get("Hash") {
            Some(EngineOption {
                kind: OptionKind::Spin { default, .. },
                ..
            }) => Some(*default),
            _ => None,
        };

        if let (Some((default, min, max)), Some(hash_default)) = (threads_spin, hash_default) {
            let threads = (self.config.parallelism.saturating_sub(1) as i64)
                .min(self.config.thread_ceiling)
                .min(max)
                .max(min);
            if threads != default {
                self.set_advertised("Threads", &threads.to_string()).await;
                self.set_advertised("Hash", &(hash_default * threads).to_string())
                    .await;
            }
        }

        if matches!(
            self.options.get("Use NNUE"),
            Some(EngineOption {
                kind: OptionKind::Check { .. },
                ..
            })
        ) {
            self.set_advertised("Use NNUE", "true").await;
        }

        self.apply_skill(self.config.skill).await;
    }

    async fn apply_skill(&self, level: SkillLevel) {
        let Some(option) = self.options.get("Skill Level") else {
            return;
        };
        let OptionKind::Spin { min, max, .. } = option.kind else {
            return;
        };
        self.set_advertised("Skill Level", &level.scale_to(min, max).to_string())
            .await;
    }

    async fn set_advertised(&self, name: &str, value: &str) {
        if let Some(option) = self.options.get(name) {
            match option.set_command(value) {
                Ok(cmd) => self.send(&cmd).await,
                Err(err) => tracing::warn!("skipping option assignment: {err}"),
            }
        }
    }

    fn wait_for(&mut self, target: SessionState, reply: Reply) {
        self.waiters.entry(target).or_default().push(reply);
    }

    /// Enter `next`, then notify and forget everyone waiting on it, in
    /// registration order. Entering the current state is a no-op.
    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        let prev = self.state;
        self.state = next;
        tracing::debug!(?prev, ?next, "session state change");
        if let Some(waiters) = self.waiters.remove(&next) {
            for waiter in waiters {
                let _ = waiter.send(Ok(self.best_move));
            }
        }
    }

    fn go_command(&self) -> String {
        let mut cmd = String::from("go");
        if let Some(depth) = self.config.depth {
            cmd.push_str(&format!(" depth {depth}"));
        }
        if let Some(movetime) = self.config.movetime_ms {
            cmd.push_str(&format!(" movetime {movetime}"));
        }
        cmd
    }

    async fn send(&self, command: &str) {
        tracing::trace!("uci >> {command}");
        if self.outgoing.send(command.to_string()).await.is_err() {
            tracing::error!("engine input closed, dropping command: {command}");
        }
    }
}

fn position_command(history: &[String]) -> String {
    let mut cmd = String::from("position startpos");
    if !history.is_empty() {
        cmd.push_str(" moves ");
        cmd.push_str(&history.join(" "));
    }
    cmd
}
