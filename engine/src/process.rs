//! Child-process transport: spawn the engine binary and bridge its stdio to
//! the line channels the session actor speaks.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::session::EngineIo;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("no engine binary found; install stockfish or point the engine path at one")]
    NotFound,
    #[error("engine process is missing a stdio pipe")]
    MissingPipe,
    #[error("failed to spawn engine: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A running engine child process. Dropping it does not kill the child;
/// call [`EngineProcess::shutdown`] after quitting the session.
pub struct EngineProcess {
    child: Child,
}

impl EngineProcess {
    /// Spawn the engine at `path` and return the process handle plus the
    /// line transport for an [`crate::EngineSession`].
    pub fn spawn(path: &Path) -> Result<(Self, EngineIo), ProcessError> {
        tracing::info!(?path, "spawning engine");
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let mut stdin = child.stdin.take().ok_or(ProcessError::MissingPipe)?;
        let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe)?;

        let (line_tx, incoming) = mpsc::channel(64);
        let (outgoing, mut command_rx) = mpsc::channel::<String>(64);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line_tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::warn!("engine stdout reached EOF");
                        break;
                    }
                    Err(err) => {
                        tracing::error!("engine stdout read failed: {err}");
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let write = async {
                    stdin.write_all(command.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                };
                if let Err(err) = write.await {
                    tracing::error!("engine stdin write failed: {err}");
                    break;
                }
            }
        });

        Ok((Self { child }, EngineIo { incoming, outgoing }))
    }

    /// Locate an engine binary: an explicitly configured path wins,
    /// otherwise probe the usual install locations and finally `PATH`.
    pub fn find_binary(configured: Option<&Path>) -> Result<PathBuf, ProcessError> {
        if let Some(path) = configured {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(ProcessError::NotFound);
        }

        let candidates = [
            "/usr/local/bin/stockfish",
            "/usr/bin/stockfish",
            "/opt/homebrew/bin/stockfish",
            "/usr/games/stockfish",
        ];
        for candidate in candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok(path.to_path_buf());
            }
        }

        // Last resort: rely on PATH lookup at spawn time.
        if std::process::Command::new("stockfish")
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
        {
            return Ok(PathBuf::from("stockfish"));
        }

        Err(ProcessError::NotFound)
    }

    /// Give the engine a moment to exit after `quit`, then make sure.
    pub async fn shutdown(mut self) {
        let _ = tokio::time::timeout(Duration::from_secs(1), self.child.wait()).await;
        let _ = self.child.kill().await;
    }
}
