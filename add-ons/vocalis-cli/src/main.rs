//! Vocalis CLI: AI-vs-AI simulations, live training and saved sessions from a terminal.
//!
//! Usage:
//!   vocalis simulate [--query "..."] [--knowledge-url URL] [--save NAME | --no-save]
//!   vocalis train [--query "..."] [--knowledge-url URL] [--save NAME | --no-save]
//!   vocalis sessions list
//!   vocalis sessions show ID [--json]
//!   vocalis sessions delete ID
//!   vocalis sessions rename ID NAME
//!
//! Config: `config/vocalis.toml` (or `VOCALIS_CONFIG`) plus `VOCALIS__*` overrides.
//! Without an LLM API key the placeholder backends are used.

mod render;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocalis_core::{
    create_best_backends, Mode, RoleplayConfig, SessionRepository, Simulation, SimulationConfig,
    SimulatorConfig, SledSessionStore, SubmitOutcome, TrainingSession, TurnExecutor,
};
use vocalis_voice::create_best_tts;

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Flags shared by `simulate` and `train`.
#[derive(Debug, Default)]
struct RunArgs {
    query: Option<String>,
    knowledge_url: Option<String>,
    save_as: Option<String>,
    no_save: bool,
}

impl RunArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Self {
        let mut parsed = Self::default();
        while let Some(a) = args.next() {
            match a.as_str() {
                "--query" => parsed.query = args.next(),
                "--knowledge-url" => parsed.knowledge_url = args.next(),
                "--save" => parsed.save_as = args.next(),
                "--no-save" => parsed.no_save = true,
                other => warn!(arg = other, "ignoring unknown argument"),
            }
        }
        parsed
    }

    fn roleplay(&self, mode: Mode) -> RoleplayConfig {
        let mut roleplay = RoleplayConfig::defaults_for(mode);
        if let Some(query) = &self.query {
            roleplay = roleplay.with_query(query.as_str());
        }
        if let Some(url) = &self.knowledge_url {
            roleplay = roleplay.with_knowledge_url(url.as_str());
        }
        roleplay
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[vocalis] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next();
    if !matches!(command.as_deref(), Some("simulate" | "train" | "sessions")) {
        print_usage();
        return Ok(());
    }

    let config = SimulatorConfig::load()?;
    let store: Arc<dyn SessionRepository> =
        Arc::new(SledSessionStore::open_path(config.sessions_path())?);

    match command.as_deref() {
        Some("simulate") => simulate(&config, store, RunArgs::parse(args)).await,
        Some("train") => train(&config, store, RunArgs::parse(args)).await,
        _ => sessions(store.as_ref(), args.collect()),
    }
}

fn print_usage() {
    eprintln!("Vocalis: sales-training simulator");
    eprintln!("  simulate [--query \"...\"] [--knowledge-url URL] [--save NAME | --no-save]");
    eprintln!("                         Two AI agents role-play until a meeting is booked (Ctrl+C stops)");
    eprintln!("  train [--query \"...\"] [--knowledge-url URL] [--save NAME | --no-save]");
    eprintln!("                         You play the sales agent; type lines, /end to finish");
    #[cfg(feature = "microphone")]
    eprintln!("                         /rec starts and stops a microphone recording");
    eprintln!("  sessions list | show ID [--json] | delete ID | rename ID NAME");
    eprintln!();
    eprintln!("LLM key: VOCALIS_LLM_API_KEY or OPENROUTER_API_KEY (else placeholder backends).");
    eprintln!("TTS/STT: TTS_API_KEY / STT_API_KEY (else placeholder audio).");
}

async fn simulate(
    config: &SimulatorConfig,
    store: Arc<dyn SessionRepository>,
    args: RunArgs,
) -> CliResult<()> {
    let (generation, _) = create_best_backends(config);
    let executor = TurnExecutor::new(generation, create_best_tts());
    let (simulation, rx) = Simulation::new(executor, SimulationConfig::from(config));
    let simulation = simulation.with_sessions(store);
    let printer = tokio::spawn(render::print_events(rx, Mode::AiVsAi));

    simulation.start(args.roleplay(Mode::AiVsAi)).await?;
    let status = tokio::select! {
        status = simulation.join() => status,
        _ = tokio::signal::ctrl_c() => {
            info!("CTRL-C received; stopping after the current round");
            simulation.stop();
            simulation.join().await
        }
    };
    info!(status = %status, "simulation finished");

    simulation.wait_for_audio().await;
    let state = simulation.snapshot().await;
    render::print_metrics(&state.metrics());

    if !args.no_save && state.persistence_offer().is_some() {
        let session = simulation.save_session(args.save_as).await?;
        println!("Saved \"{}\" as {}", session.name, session.id);
    }

    drop(simulation);
    let _ = printer.await;
    Ok(())
}

async fn train(
    config: &SimulatorConfig,
    store: Arc<dyn SessionRepository>,
    args: RunArgs,
) -> CliResult<()> {
    let (generation, analysis) = create_best_backends(config);
    let executor = TurnExecutor::new(generation, create_best_tts());
    let (session, rx) = TrainingSession::new(executor, analysis);
    let session = Arc::new(session.with_sessions(store));
    let printer = tokio::spawn(render::print_events(rx, Mode::LiveTraining));

    #[cfg(feature = "microphone")]
    let recorder = vocalis_core::RecordingBridge::new(
        Arc::new(vocalis_voice::MicrophoneSource::new()),
        vocalis_voice::create_best_stt(),
        Arc::clone(&session),
    );

    session.start(args.roleplay(Mode::LiveTraining)).await?;
    println!("Type your lines as the sales agent. /end finishes the session.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let outcome = match line.trim() {
            "" => continue,
            "/end" => break,
            #[cfg(feature = "microphone")]
            "/rec" => match toggle_recording(&recorder).await {
                Some(outcome) => outcome,
                None => continue,
            },
            text => match session.submit(text).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("  {}", e);
                    continue;
                }
            },
        };
        if matches!(outcome, SubmitOutcome::Replied { ended: Some(_) }) {
            break;
        }
    }

    if session.is_running().await {
        session.end().await?;
    }
    session.wait_for_audio().await;

    let offered = session.snapshot().await.persistence_offer().is_some();
    if !args.no_save && offered {
        let saved = session.save_session(args.save_as).await?;
        println!("Saved \"{}\" as {}", saved.name, saved.id);
    }

    #[cfg(feature = "microphone")]
    drop(recorder);
    drop(session);
    let _ = printer.await;
    Ok(())
}

/// Start a recording, or stop the active one and submit its transcript.
#[cfg(feature = "microphone")]
async fn toggle_recording(recorder: &vocalis_core::RecordingBridge) -> Option<SubmitOutcome> {
    use vocalis_core::RecordingOutcome;

    if !recorder.is_recording() {
        match recorder.start().await {
            Ok(()) => println!("  🎙️ Recording... /rec again to stop"),
            Err(e) => eprintln!("  {}", e),
        }
        return None;
    }
    match recorder.stop().await {
        Ok(RecordingOutcome::Submitted { text, outcome }) => {
            println!("  📝 {}", text);
            Some(outcome)
        }
        Ok(RecordingOutcome::Unsent { text, .. }) => {
            println!("  ↩️ Not sent, type it again: {}", text);
            None
        }
        Ok(_) => None,
        Err(e) => {
            eprintln!("  {}", e);
            None
        }
    }
}

fn sessions(store: &dyn SessionRepository, args: Vec<String>) -> CliResult<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["list"] | [] => {
            let sessions = store.list()?;
            if sessions.is_empty() {
                println!("No saved sessions.");
            }
            for session in &sessions {
                println!("{}", render::session_row(session));
            }
        }
        ["show", id, rest @ ..] => {
            let Some(session) = store.get(id)? else {
                eprintln!("No session {}", id);
                return Ok(());
            };
            if rest.contains(&"--json") {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                render::print_session(&session);
            }
        }
        ["delete", id] => {
            if store.delete(id)? {
                println!("Deleted {}", id);
            } else {
                eprintln!("No session {}", id);
            }
        }
        ["rename", id, name @ ..] if !name.is_empty() => {
            let name = name.join(" ");
            if store.rename(id, &name)? {
                println!("Renamed {} to \"{}\"", id, name.trim());
            } else {
                eprintln!("No session {}", id);
            }
        }
        _ => print_usage(),
    }
    Ok(())
}
