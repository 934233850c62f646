//! chessdesk CLI: play against a UCI engine in the terminal.
//!
//! The default invocation spawns the engine, starts a game, and reads moves
//! from stdin as long-algebraic tokens (`e2e4`, `e7e8q`). Two extra
//! commands work mid-game: `rollback <n>` truncates the game so move `n`
//! (0-based) is the last one played, and `quit` exits.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncBufReadExt;

use chessdesk::{
    config, EngineProvider, Game, GameDetails, GameMode, GameStore, HumanInput, HumanProvider,
};
use engine::{EngineProcess, EngineSession, SessionConfig, SkillLevel};

#[derive(Parser)]
#[command(name = "chessdesk", about = "Play chess against a UCI engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Side the human plays.
    #[arg(long, value_enum, default_value = "white")]
    side: Side,

    /// Engine strength, 0.0 (weakest) through 1.0 (strongest).
    #[arg(long, default_value_t = 0.5)]
    skill: f64,

    /// Engine search depth. Omit to use the engine session default.
    #[arg(long)]
    depth: Option<u32>,

    /// Engine think time per move, in milliseconds.
    #[arg(long)]
    movetime: Option<u64>,

    /// Disable threat highlighting for the human side.
    #[arg(long)]
    no_hints: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List unfinished saved games.
    Games,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    White,
    Black,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chessdesk=info,engine=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Games) => list_games(),
        None => run_game(cli).await,
    }
}

fn list_games() -> anyhow::Result<()> {
    let store = GameStore::new(config::get_data_dir());
    let records = store.list().context("failed to list saved games")?;
    if records.is_empty() {
        println!("No unfinished games.");
        return Ok(());
    }
    for record in records {
        let ply = record.moves.split_whitespace().count();
        println!("{}  {:?}  {} plies", record.game_id, record.mode, ply);
    }
    Ok(())
}

async fn run_game(cli: Cli) -> anyhow::Result<()> {
    let mode = match cli.side {
        Side::White => GameMode::HumanWhiteEngineBlack,
        Side::Black => GameMode::EngineWhiteHumanBlack,
    };
    let skill = SkillLevel::new(cli.skill);

    // Bring the engine session up before building the game.
    let engine_path = EngineProcess::find_binary(config::get_engine_path().as_deref())
        .context("no usable engine binary")?;
    let (process, io) = EngineProcess::spawn(&engine_path).context("failed to spawn the engine")?;

    let mut session_config = SessionConfig::default();
    if cli.depth.is_some() {
        session_config.depth = cli.depth;
    }
    if cli.movetime.is_some() {
        session_config.movetime_ms = cli.movetime;
    }

    let session = EngineSession::new(io, session_config);
    session
        .initialize(config::get_setup_timeout())
        .await
        .context("engine initialization failed")?;
    session
        .set_skill(skill)
        .await
        .context("engine session closed")?;
    session
        .start_game(config::get_setup_timeout())
        .await
        .context("engine refused to start a game")?;

    let mut details = GameDetails::new(mode, skill);
    if cli.no_hints {
        details.hints = Default::default();
    }

    let (human, input) = HumanProvider::new();
    let engine_side = EngineProvider::new(session.clone(), config::get_move_timeout());
    let (white, black): (Box<dyn chessdesk::MoveProvider>, Box<dyn chessdesk::MoveProvider>) =
        match mode {
            GameMode::HumanWhiteEngineBlack => (Box::new(human), Box::new(engine_side)),
            GameMode::EngineWhiteHumanBlack => (Box::new(engine_side), Box::new(human)),
        };

    let store = GameStore::new(config::get_data_dir());
    let mut game = Game::new(details, white, black, Some(store));
    game.on_move(|position, mv| {
        println!("  {}  {}", chess::format_move_token(mv), position.fen());
    });

    let handle = game.handle();
    tokio::spawn(pump_stdin(input, handle));

    println!("You play {:?}. Enter moves like e2e4; `rollback <n>` and `quit` also work.",
        mode.human_side());

    let outcome = game.play().await.context("game failed")?;
    if outcome.checkmate {
        match outcome.winner {
            Some(winner) => println!("Checkmate! {winner:?} wins."),
            None => println!("Checkmate."),
        }
    } else if outcome.stalemate {
        println!("Stalemate! The game is a draw.");
    } else {
        println!("Game over - draw.");
    }

    session.quit().await;
    process.shutdown().await;
    Ok(())
}

/// Translate stdin lines into move submissions and rollback requests.
async fn pump_stdin(input: HumanInput, handle: chessdesk::GameHandle) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            std::process::exit(0);
        }
        if let Some(rest) = line.strip_prefix("rollback ") {
            match rest.trim().parse::<usize>() {
                Ok(index) => {
                    if let Err(err) = handle.rollback_to(index).await {
                        eprintln!("rollback failed: {err}");
                    }
                }
                Err(_) => eprintln!("usage: rollback <move-index>"),
            }
            continue;
        }
        match chess::parse_move_token(line) {
            Some(mv) => {
                if !input.submit(mv).await {
                    break;
                }
            }
            None => eprintln!("unrecognized input {line:?} (expected a move like e2e4)"),
        }
    }
    // EOF on stdin: dropping the input handle closes the move channel, and
    // the provider reports the closure to the loop.
}
