//! # Vocalis Voice - speech I/O for the sales-training simulator
//!
//! Everything that turns text into audio or audio into text lives here, behind
//! backend traits so the orchestration engine never talks to an HTTP API or an
//! audio device directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Vocalis Voice                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ AudioSource  │→ │ CaptureStream│→ │ CapturedAudio│       │
//! │  │ (cpal/buffer)│  │ (scoped)     │  │  (PCM f32)   │       │
//! │  └──────────────┘  └──────────────┘  └──────┬───────┘       │
//! │                                             ↓               │
//! │  ┌──────────────┐                   ┌──────────────┐        │
//! │  │SynthesisBack │ → AudioPayload    │TranscriptionB│ → text │
//! │  │ (tts, WAV)   │   (data URI)      │ (stt)        │        │
//! │  └──────────────┘                   └──────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod capture;
pub mod error;
pub mod stt;
pub mod tts;

pub use audio::{pcm_f32_to_wav, wav_duration_secs, AudioPayload, CapturedAudio};
pub use capture::{AudioSource, BufferedSource, CaptureConfig, CaptureStream};
#[cfg(feature = "microphone")]
pub use capture::MicrophoneSource;
pub use error::{VoiceError, VoiceResult};
pub use stt::{create_best_stt, OpenAiStt, PlaceholderStt, TranscriptionBackend};
#[cfg(feature = "whisper")]
pub use stt::WhisperStt;
pub use tts::{
    create_best_tts, voice_for, OpenAiTts, PlaceholderTts, SpeechRequest, SynthesisBackend,
    VoiceRole,
};
