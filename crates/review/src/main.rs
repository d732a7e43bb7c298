//! Terminal game review.
//!
//! Uploads a PGN to the analysis service and steps through it from stdin
//! line commands, printing the review panel after every change.

use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use review::{
    AnalysisClient, AnalysisService, Lookup, NavCommand, NavigationError, Orchestrator,
    ReviewConfig, ViewMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Nav(NavCommand),
    Alternate,
    Back,
    Summary,
    Help,
    Quit,
}

const HELP: &str = "Commands: n(ext) p(rev) s(tart) e(nd) g <ply> alt back summary help q(uit)";

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let cmd = match parts.next()? {
        "n" | "next" => Command::Nav(NavCommand::Forward),
        "p" | "prev" => Command::Nav(NavCommand::Back),
        "s" | "start" => Command::Nav(NavCommand::Start),
        "e" | "end" => Command::Nav(NavCommand::End),
        "g" | "goto" => Command::Nav(NavCommand::Goto(parts.next()?.parse().ok()?)),
        "alt" => Command::Alternate,
        "back" => Command::Back,
        "summary" => Command::Summary,
        "h" | "help" => Command::Help,
        "q" | "quit" => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

fn run_command<S: AnalysisService>(
    review: &mut Orchestrator<S>,
    cmd: Command,
) -> Result<(), NavigationError> {
    match cmd {
        Command::Nav(nav) => review.navigate(nav),
        Command::Alternate => {
            let ply = match review.view() {
                ViewMode::Main { ply } => *ply,
                ViewMode::Alternate(line) => line.anchor(),
            };
            review.explore_alternate(ply)
        }
        Command::Back => review.back_to_main(),
        Command::Summary => {
            if let Lookup::Unavailable = review.request_summary() {
                return Err(NavigationError::NoSession);
            }
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

fn print_panel<S: AnalysisService>(review: &Orchestrator<S>) {
    println!("\n{}", review.panel());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so they don't interleave with the panel
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: game-review <file.pgn>");
        std::process::exit(2);
    };

    let config = ReviewConfig::from_env()?;
    let pgn = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;
    let file_name = Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("game.pgn")
        .to_string();

    tracing::info!(base_url = %config.base_url, "Uploading {file_name}");
    let client = AnalysisClient::new(&config)?;
    let mut review = Orchestrator::new(client, config);
    review.load_pgn(&file_name, &pgn).await?;
    review.request_summary();

    print_panel(&review);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(cmd) => {
                        if let Err(e) = run_command(&mut review, cmd) {
                            println!("! {e}");
                        }
                        print_panel(&review);
                    }
                    None => println!("{HELP}"),
                }
            }
            Some(event) = review.next_event(), if review.is_busy() => {
                debug!(?event, "Review event");
                print_panel(&review);
            }
        }
    }

    Ok(())
}
