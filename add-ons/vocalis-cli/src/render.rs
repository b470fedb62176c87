//! Terminal rendering of engine events, metrics, analyses and saved sessions.

use chrono::Local;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use vocalis_core::{
    AnalysisResult, EngineEvent, Metrics, Mode, NoticeLevel, Session, Turn,
};

/// Print events until every sender is gone.
pub async fn print_events(mut rx: UnboundedReceiver<EngineEvent>, mode: Mode) {
    while let Some(event) = rx.recv().await {
        print_event(&event, mode);
    }
}

fn print_event(event: &EngineEvent, mode: Mode) {
    match event {
        EngineEvent::TurnAdded { turn, .. } => println!("{}", format_turn(turn, mode)),
        EngineEvent::StatusChanged { status, .. } => println!("  [{}]", status),
        EngineEvent::Notice { notice, .. } => {
            let tag = match notice.level {
                NoticeLevel::Info => "ℹ️",
                NoticeLevel::Warning => "⚠️",
                NoticeLevel::Error => "❌",
            };
            println!("  {} {}: {}", tag, notice.title, notice.message);
        }
        EngineEvent::AudioReady {
            turn_id,
            duration_secs,
            ..
        } => debug!(turn_id = %turn_id, secs = ?duration_secs, "audio ready"),
        // The matching notice is printed.
        EngineEvent::AudioFailed { .. } => {}
        EngineEvent::PersistenceOffered { default_name, .. } => {
            println!("  💾 Session can be saved as \"{}\"", default_name)
        }
        EngineEvent::AnalysisReady { result, .. } => print_analysis(result),
    }
}

/// `Label [tone]: text`, or `Label: text` without a tone.
pub fn format_turn(turn: &Turn, mode: Mode) -> String {
    let label = mode.label(turn.speaker);
    match &turn.tone {
        Some(tone) => format!("{} [{}]: {}", label, tone, turn.text),
        None => format!("{}: {}", label, turn.text),
    }
}

pub fn print_metrics(metrics: &Metrics) {
    println!("── Metrics ──");
    println!("  messages:        {}", metrics.total_messages);
    println!(
        "  meeting booked:  {}",
        if metrics.meeting_booked { "yes" } else { "no" }
    );
    println!("  length:          {:.1}s", metrics.conversation_length_secs);
    println!("  audio:           {:.1}s", metrics.total_audio_secs);
}

pub fn print_analysis(result: &AnalysisResult) {
    println!("── Performance Analysis ──");
    println!("  score: {:.0}/100", result.overall_score);
    if !result.feedback.is_empty() {
        println!();
        for line in result.feedback.lines() {
            println!("  {}", line);
        }
    }
    print_list("Strengths", &result.strengths);
    print_list("Areas for improvement", &result.areas_for_improvement);
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("  {}:", title);
    for item in items {
        println!("   • {}", item);
    }
}

/// One line per session for `sessions list`.
pub fn session_row(session: &Session) -> String {
    format!(
        "{}  {}  {:<13}  {:>3} turns  {}",
        session.id,
        session.saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        session.mode.as_str(),
        session.turns.len(),
        session.name
    )
}

pub fn print_session(session: &Session) {
    println!("{} ({})", session.name, session.id);
    println!(
        "{} · saved {}",
        session.mode,
        session.saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    for turn in &session.turns {
        println!("{}", format_turn(turn, session.mode));
    }
    println!();
    if let Some(metrics) = &session.metrics {
        print_metrics(metrics);
    }
    if let Some(analysis) = &session.analysis {
        print_analysis(analysis);
    }
}
