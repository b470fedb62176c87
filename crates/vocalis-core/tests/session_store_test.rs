//! Sled-backed session store on a temporary directory.

use chrono::{Duration, Utc};
use vocalis_core::{
    AudioStatus, Metrics, Mode, Session, SessionRepository, SledSessionStore, Speaker, Turn,
};
use vocalis_voice::{pcm_f32_to_wav, AudioPayload};

fn session(name: &str, age_minutes: i64) -> Session {
    let mut sales = Turn::generated(Speaker::SalesAgent, "*confident* Hi, got a minute?");
    sales.audio_status = AudioStatus::Ready;
    sales.audio = Some(AudioPayload::wav(pcm_f32_to_wav(&[0.0; 800], 16000).unwrap()));
    let consumer = Turn::generated(Speaker::ConsumerAgent, "*skeptical* Not really. TERMINATE");
    Session {
        id: format!("session-{}", name.to_lowercase().replace(' ', "-")),
        name: name.to_string(),
        mode: Mode::AiVsAi,
        saved_at: Utc::now() - Duration::minutes(age_minutes),
        turns: vec![sales, consumer],
        metrics: Some(Metrics {
            total_messages: 2,
            meeting_booked: true,
            conversation_length_secs: 3.5,
            total_audio_secs: 0.05,
        }),
        analysis: None,
        transcript: "Sales Agent: Hi, got a minute?\nConsumer Agent: Not really.".to_string(),
    }
}

#[test]
fn sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let saved = session("Monday pitch", 0);
    {
        let store = SledSessionStore::open_path(dir.path()).unwrap();
        store.create(&saved).unwrap();
    }

    let store = SledSessionStore::open_path(dir.path()).unwrap();
    let loaded = store.get(&saved.id).unwrap().expect("session persisted");
    assert_eq!(loaded, saved);
    assert_eq!(loaded.turns[0].audio, saved.turns[0].audio);
    assert_eq!(loaded.turns[1].raw_text, "*skeptical* Not really. TERMINATE");
}

#[test]
fn list_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledSessionStore::open_path(dir.path()).unwrap();
    store.create(&session("Oldest", 30)).unwrap();
    store.create(&session("Newest", 1)).unwrap();
    store.create(&session("Middle", 10)).unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Newest", "Middle", "Oldest"]);
}

#[test]
fn rename_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledSessionStore::open_path(dir.path()).unwrap();
    let saved = session("Draft", 0);
    store.create(&saved).unwrap();

    assert!(store.rename(&saved.id, "  Final cut ").unwrap());
    assert_eq!(store.get(&saved.id).unwrap().unwrap().name, "Final cut");
    assert!(!store.rename("session-missing", "x").unwrap());
    assert!(store.rename(&saved.id, "").is_err());

    assert!(store.delete(&saved.id).unwrap());
    assert!(store.get(&saved.id).unwrap().is_none());
    assert!(!store.delete(&saved.id).unwrap());
    assert!(store.list().unwrap().is_empty());
}
