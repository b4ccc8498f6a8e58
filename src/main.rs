//! Strictly Arena - Unified CLI
//!
//! Terminal play against an automated opponent, and bulk simulation.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Command};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use strictly_arena::{
    ArenaConfig, ArenaError, GameHub, Outcome, ParticipantId, ParticipantKind, Phase, Position,
    Session, SessionEvent, SessionId,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_arena=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            name,
            ai_first,
        } => run_play(&config, &name, ai_first).await,
        Command::Simulate {
            config,
            games,
            json,
        } => run_simulate(&config, games, json).await,
    }
}

fn load_hub(path: &Path) -> Result<GameHub> {
    let config = ArenaConfig::load_or_default(path).context("Failed to load arena config")?;
    Ok(GameHub::in_memory(config))
}

/// Interactive game: the human types a cell number or label.
#[instrument(skip(config_path))]
async fn run_play(config_path: &Path, name: &str, ai_first: bool) -> Result<()> {
    let hub = load_hub(config_path)?;
    let sweeper = hub.spawn_sweeper();
    let mut events = hub.subscribe();

    let human = hub.participant_named(name, ParticipantKind::Human).await?;
    let human_id = *human.id();

    let session = if ai_first {
        let ai = hub
            .participant_named(hub.config().ai_name(), ParticipantKind::Automated)
            .await?;
        let session = hub.create_session(*ai.id()).await?;
        hub.join_session(&session.id(), human_id).await?
    } else {
        let session = hub.create_session(human_id).await?;
        hub.add_automated_opponent(&session.id()).await?
    };
    let session_id = session.id();
    info!(session_id = %session_id, "Game started");

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let session = hub.session(&session_id).await?;

        if session.phase() == Phase::Concluded {
            println!("\n{}", session.board().display());
            println!("{}", describe_outcome(&session, human_id));
            break;
        }

        if session.turn() != human_id {
            println!("Opponent is thinking...");
            wait_for_change(&mut events, session_id).await?;
            continue;
        }

        let mark = session
            .mark_of(&human_id)
            .map(|m| m.to_string())
            .unwrap_or_default();
        println!("\n{}", session.board().display());
        println!("Your move ({}). Enter 0-8 or a label like top-left, q to quit:", mark);

        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }

        let Some(position) = Position::from_label_or_number(line) else {
            println!("Unrecognized cell '{}'", line);
            continue;
        };

        match hub
            .apply_move(&session_id, human_id, position.to_index())
            .await
        {
            Ok(_) => {}
            Err(ArenaError::Move(rejection)) => println!("Move rejected: {}", rejection),
            Err(e) => return Err(e.into()),
        }
    }

    sweeper.abort();
    Ok(())
}

/// Plays `games` automated-vs-automated sessions concurrently.
#[instrument(skip(config_path))]
async fn run_simulate(config_path: &Path, games: usize, json: bool) -> Result<()> {
    if games == 0 {
        bail!("--games must be at least 1");
    }

    let hub = load_hub(config_path)?;
    let sweeper = hub.spawn_sweeper();
    let mut events = hub.subscribe();

    let ai_name = hub.config().ai_name().clone();
    let x = hub
        .create_participant(format!("{} X", ai_name), ParticipantKind::Automated)
        .await?;
    let o = hub
        .create_participant(format!("{} O", ai_name), ParticipantKind::Automated)
        .await?;

    let mut pending = HashSet::new();
    for _ in 0..games {
        let session = hub.create_session(x).await?;
        hub.join_session(&session.id(), o).await?;
        pending.insert(session.id());
    }
    info!(games, "Simulation started");

    let mut summary = SimulationSummary {
        games,
        ..Default::default()
    };
    while !pending.is_empty() {
        match events.recv().await {
            Ok(SessionEvent::Concluded {
                session_id,
                outcome,
            }) if pending.remove(&session_id) => summary.record(outcome, x),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                // Missed conclusions are recovered from the store below.
                debug!(skipped, "Event receiver lagged");
                for session in hub.list_sessions(Some(Phase::Concluded)).await? {
                    if pending.remove(&session.id()) {
                        summary.record(session.outcome(), x);
                    }
                }
            }
            Err(RecvError::Closed) => bail!("Event channel closed"),
        }
    }

    sweeper.abort();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Games: {}", summary.games);
        println!("X wins: {}", summary.x_wins);
        println!("O wins: {}", summary.o_wins);
        println!("Draws: {}", summary.draws);
    }
    Ok(())
}

/// Tally of a simulation run.
#[derive(Debug, Default, Serialize)]
struct SimulationSummary {
    games: usize,
    x_wins: usize,
    o_wins: usize,
    draws: usize,
}

impl SimulationSummary {
    fn record(&mut self, outcome: Outcome, x: ParticipantId) {
        match outcome {
            Outcome::Won(winner) if winner == x => self.x_wins += 1,
            Outcome::Won(_) => self.o_wins += 1,
            Outcome::Drawn => self.draws += 1,
            Outcome::Undecided => {}
        }
    }
}

/// Blocks until the session commits another move or concludes.
async fn wait_for_change(
    events: &mut broadcast::Receiver<SessionEvent>,
    session_id: SessionId,
) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::MoveApplied { session_id: id, .. })
            | Ok(SessionEvent::Concluded { session_id: id, .. })
                if id == session_id =>
            {
                return Ok(());
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => return Ok(()),
            Err(RecvError::Closed) => bail!("Event channel closed"),
        }
    }
}

fn describe_outcome(session: &Session, human: ParticipantId) -> &'static str {
    match session.outcome() {
        Outcome::Won(winner) if winner == human => "You win!",
        Outcome::Won(_) => "You lose.",
        Outcome::Drawn => "Draw.",
        Outcome::Undecided => "Game ended without a result.",
    }
}
