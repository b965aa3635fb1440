use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::config::ClientConfig;
use client::engine::EngineEvent;
use client::input::Brush;
use client::registry::RegistryClient;
use client::session::{Command as SessionCommand, SessionEvent, SessionHandle, spawn_session};
use client::surface::HeadlessSurface;
use client::viewport::{PixelPoint, Viewport};
use frames::Rgba;
use serde::Serialize;
use uuid::Uuid;

/// Pixel size of the headless surface the CLI draws on.
const CANVAS: Viewport = Viewport::new(1000.0, 1000.0);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Registry(#[from] client::registry::RegistryError),
    #[error(transparent)]
    Session(#[from] client::session::SessionError),
    #[error("server returned {syscall} error: {message}")]
    ServerError { syscall: String, message: String },
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("session ended unexpectedly")]
    SessionEnded,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sketch", about = "Shared sketch board API and realtime CLI")]
struct Cli {
    #[arg(long, global = true, env = "SKETCH_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, global = true, env = "SKETCH_DISPLAY_NAME", default_value = "sketch-cli")]
    name: String,

    #[arg(long, global = true, default_value_t = 10, help = "Seconds to wait for each server reply")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Boards(BoardsCommand),
    /// Join a board and print every event until interrupted.
    Watch { board_id: Uuid },
    /// Draw a zigzag stroke on a board.
    Scribble(ScribbleArgs),
    /// Clear a board for everyone.
    Clear { board_id: Uuid },
}

#[derive(Args, Debug)]
struct BoardsCommand {
    #[command(subcommand)]
    command: BoardsSubcommand,
}

#[derive(Subcommand, Debug)]
enum BoardsSubcommand {
    List,
    Read {
        board_id: Uuid,
    },
    Create {
        #[arg(long, default_value = "Untitled Board")]
        name: String,
    },
}

#[derive(Args, Debug)]
struct ScribbleArgs {
    board_id: Uuid,

    #[arg(long, default_value = "#000000")]
    color: Rgba,

    #[arg(long, default_value_t = 5.0)]
    width: f64,

    #[arg(long, default_value_t = 20, help = "Number of points in the stroke")]
    points: u32,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = ClientConfig { base_url: cli.base_url.trim_end_matches('/').to_owned(), ..ClientConfig::from_env() };
    let wait = Duration::from_secs(cli.timeout_secs.max(1));

    match cli.command {
        Command::Ping => run_ping(&config).await,
        Command::Boards(boards) => run_boards(&config, boards).await,
        Command::Watch { board_id } => run_watch(config, board_id, &cli.name).await,
        Command::Scribble(args) => run_scribble(config, &cli.name, args, wait).await,
        Command::Clear { board_id } => run_clear(config, board_id, &cli.name, wait).await,
    }
}

async fn run_ping(config: &ClientConfig) -> Result<(), CliError> {
    let url = format!("{}/healthz", config.base_url);
    let status = reqwest::Client::new().get(url).send().await?.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_boards(config: &ClientConfig, boards: BoardsCommand) -> Result<(), CliError> {
    let registry = RegistryClient::new(config);
    match boards.command {
        BoardsSubcommand::List => print_json(&registry.list_boards().await?),
        BoardsSubcommand::Read { board_id } => print_json(&registry.get_board(board_id).await?),
        BoardsSubcommand::Create { name } => {
            let board = registry.create_board(&name).await?;
            eprintln!("created board: {}", board.id);
            print_json(&board)
        }
    }
}

async fn run_watch(config: ClientConfig, board_id: Uuid, name: &str) -> Result<(), CliError> {
    let mut session = spawn_session(config, board_id, name, HeadlessSurface::new(CANVAS));
    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    session.leave().await?;
    Ok(())
}

async fn run_scribble(config: ClientConfig, name: &str, args: ScribbleArgs, wait: Duration) -> Result<(), CliError> {
    let mut session = spawn_session(config, args.board_id, name, HeadlessSurface::new(CANVAS));
    next_matching(&mut session, wait, "snapshot", |e| matches!(e, EngineEvent::Synced { .. })).await?;

    let points = args.points.max(2);
    session.send(SessionCommand::SetBrush(Brush::new(args.color, args.width))).await?;
    session.send(SessionCommand::PointerDown(zigzag(0, points))).await?;
    for i in 1..points {
        session.send(SessionCommand::PointerMove(zigzag(i, points))).await?;
    }
    session.send(SessionCommand::PointerUp).await?;

    let expected = points - 1;
    let (mut acked, mut rejected) = (0u32, 0u32);
    while acked + rejected < expected {
        match next_matching(&mut session, wait, "draw acks", |e| {
            matches!(e, EngineEvent::Applied { local: true, .. } | EngineEvent::Rejected { .. })
        })
        .await?
        {
            EngineEvent::Applied { .. } => acked += 1,
            other => {
                print_event(&SessionEvent::Engine(other));
                rejected += 1;
            }
        }
    }
    eprintln!("scribble complete: board_id={} acked={acked} rejected={rejected}", args.board_id);
    session.leave().await?;
    Ok(())
}

async fn run_clear(config: ClientConfig, board_id: Uuid, name: &str, wait: Duration) -> Result<(), CliError> {
    let mut session = spawn_session(config, board_id, name, HeadlessSurface::new(CANVAS));
    next_matching(&mut session, wait, "snapshot", |e| matches!(e, EngineEvent::Synced { .. })).await?;
    session.clear().await?;
    let event = next_matching(&mut session, wait, "clear", |e| {
        matches!(e, EngineEvent::Cleared { .. } | EngineEvent::Rejected { .. })
    })
    .await?;
    session.leave().await?;

    match event {
        EngineEvent::Rejected { syscall, message, .. } => Err(CliError::ServerError { syscall, message }),
        EngineEvent::Cleared { epoch } => {
            eprintln!("cleared board: {board_id} epoch={epoch}");
            Ok(())
        }
        _ => Err(CliError::SessionEnded),
    }
}

/// Wait for the first engine event accepted by `wanted`, printing the rest.
async fn next_matching(
    session: &mut SessionHandle,
    wait: Duration,
    what: &'static str,
    wanted: impl Fn(&EngineEvent) -> bool,
) -> Result<EngineEvent, CliError> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let event = tokio::time::timeout_at(deadline, session.next_event())
            .await
            .map_err(|_| CliError::Timeout(what))?
            .ok_or(CliError::SessionEnded)?;
        match event {
            SessionEvent::Engine(event) if wanted(&event) => return Ok(event),
            other => print_event(&other),
        }
    }
}

/// Point `i` of `count` on a zigzag across the canvas.
fn zigzag(i: u32, count: u32) -> PixelPoint {
    let x = 100.0 + 800.0 * f64::from(i) / f64::from(count - 1);
    let y = if i % 2 == 0 { 400.0 } else { 600.0 };
    PixelPoint::new(x, y)
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Connected { client_id } => eprintln!("connected: client_id={client_id}"),
        SessionEvent::Disconnected => eprintln!("disconnected; reconnecting"),
        SessionEvent::Engine(event) => println!("{event:?}"),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
