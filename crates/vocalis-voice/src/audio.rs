//! Audio payloads exchanged with the speech backends.
//!
//! Captured microphone audio travels as normalized f32 PCM ([`CapturedAudio`]);
//! synthesized speech travels as an encoded, playable blob ([`AudioPayload`]).

use crate::error::VoiceResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

/// A finished capture: buffered PCM from start until stop.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    /// PCM samples (f32, -1.0..1.0), mono.
    pub samples: Vec<f32>,
    /// Sample rate (e.g. 16000).
    pub sample_rate: u32,
    /// When the capture was stopped.
    pub timestamp: DateTime<Utc>,
}

impl CapturedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            timestamp: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the capture derived from sample count and rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Encode as 16-bit mono WAV for upload.
    pub fn to_wav(&self) -> VoiceResult<Vec<u8>> {
        pcm_f32_to_wav(&self.samples, self.sample_rate)
    }
}

/// Synthesized speech, encoded as a playable blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPayload {
    /// MIME type of `bytes` (e.g. `audio/wav`, `audio/mpeg`).
    pub mime: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl AudioPayload {
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            mime: "audio/wav".to_string(),
            bytes,
        }
    }

    /// `data:<mime>;base64,<payload>` for a browser `<audio>` element.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Playback length in seconds when the payload is WAV; `None` for other encodings
    /// or malformed data.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.mime != "audio/wav" {
            return None;
        }
        wav_duration_secs(&self.bytes)
    }
}

/// Encode f32 PCM (mono) to 16-bit WAV bytes.
pub fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> VoiceResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            writer.write_sample((clamped * 32767.0).round() as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Duration of a WAV blob in seconds, or `None` if it cannot be parsed.
pub fn wav_duration_secs(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / rate as f64)
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_duration_matches_sample_count() {
        let wav = pcm_f32_to_wav(&vec![0.0; 16000], 16000).unwrap();
        let secs = wav_duration_secs(&wav).unwrap();
        assert!((secs - 1.0).abs() < 1e-6);
    }

    #[test]
    fn data_uri_has_mime_prefix() {
        let payload = AudioPayload::wav(vec![1, 2, 3]);
        assert_eq!(payload.to_data_uri(), "data:audio/wav;base64,AQID");
    }

    #[test]
    fn non_wav_payload_has_no_duration() {
        let payload = AudioPayload {
            mime: "audio/mpeg".to_string(),
            bytes: vec![0xff, 0xfb],
        };
        assert!(payload.duration_secs().is_none());
    }

    #[test]
    fn garbage_is_not_a_wav() {
        assert!(wav_duration_secs(b"not a wav").is_none());
    }

    #[test]
    fn captured_duration() {
        let audio = CapturedAudio::new(vec![0.0; 8000], 16000);
        assert_eq!(audio.duration(), Duration::from_millis(500));
    }

    #[test]
    fn payload_serializes_bytes_as_base64() {
        let payload = AudioPayload::wav(vec![1, 2, 3]);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"AQID\""));
        let back: AudioPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
