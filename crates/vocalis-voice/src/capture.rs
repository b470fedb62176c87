//! Audio capture sources.
//!
//! A capture is a scoped acquisition: [`AudioSource::open`] hands out a
//! [`CaptureStream`] that owns the device, and dropping the stream (including on an
//! error path) releases it. [`CaptureStream::finish`] stops the device and returns
//! everything accumulated since `open`.

use crate::audio::CapturedAudio;
use crate::error::{VoiceError, VoiceResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz (default: 16000)
    pub sample_rate: u32,

    /// Number of channels (default: 1 for mono)
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Something that can be opened for recording (microphone, pre-recorded buffer, ...).
pub trait AudioSource: Send + Sync {
    /// Acquire the device and start accumulating audio.
    fn open(&self, config: &CaptureConfig) -> VoiceResult<Box<dyn CaptureStream>>;
}

/// An open capture. Dropping it releases the underlying device.
pub trait CaptureStream: Send {
    /// Stop capturing and assemble everything captured into one payload.
    fn finish(self: Box<Self>) -> VoiceResult<CapturedAudio>;
}

/// In-memory source that "records" a fixed set of samples. Useful for replaying
/// prepared audio through the transcription path and for tests.
#[derive(Debug, Clone, Default)]
pub struct BufferedSource {
    samples: Arc<Mutex<Vec<f32>>>,
    unavailable: Option<String>,
    open_streams: Arc<AtomicUsize>,
}

impl BufferedSource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: Arc::new(Mutex::new(samples)),
            ..Default::default()
        }
    }

    /// A source whose `open` always fails (e.g. permission denied).
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Replace the samples the next capture will return.
    pub fn set_samples(&self, samples: Vec<f32>) {
        if let Ok(mut guard) = self.samples.lock() {
            *guard = samples;
        }
    }

    /// Number of streams currently holding the source.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

impl AudioSource for BufferedSource {
    fn open(&self, config: &CaptureConfig) -> VoiceResult<Box<dyn CaptureStream>> {
        if let Some(reason) = &self.unavailable {
            return Err(VoiceError::Capture(reason.clone()));
        }
        let samples = self
            .samples
            .lock()
            .map_err(|e| VoiceError::Capture(format!("buffer lock poisoned: {}", e)))?
            .clone();
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        debug!(samples = samples.len(), "buffered capture opened");
        Ok(Box::new(BufferedStream {
            samples,
            sample_rate: config.sample_rate,
            open_streams: Arc::clone(&self.open_streams),
        }))
    }
}

struct BufferedStream {
    samples: Vec<f32>,
    sample_rate: u32,
    open_streams: Arc<AtomicUsize>,
}

impl CaptureStream for BufferedStream {
    fn finish(mut self: Box<Self>) -> VoiceResult<CapturedAudio> {
        let samples = std::mem::take(&mut self.samples);
        Ok(CapturedAudio::new(samples, self.sample_rate))
    }
}

impl Drop for BufferedStream {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

// -----------------------------------------------------------------------------
// Microphone capture via CPAL (optional feature).
// -----------------------------------------------------------------------------
#[cfg(feature = "microphone")]
mod microphone {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::StreamConfig;
    use std::sync::mpsc;
    use std::thread;
    use tracing::{info, warn};

    /// Default input device. The CPAL stream lives on a dedicated thread
    /// (cpal `Stream` is !Send on some platforms); samples are shared through a buffer.
    #[derive(Debug, Default, Clone)]
    pub struct MicrophoneSource;

    impl MicrophoneSource {
        pub fn new() -> Self {
            Self
        }

        /// List available input devices
        pub fn list_input_devices() -> VoiceResult<Vec<String>> {
            let host = cpal::default_host();
            let devices = host
                .input_devices()
                .map_err(|e| VoiceError::Capture(e.to_string()))?;
            Ok(devices.filter_map(|d| d.name().ok()).collect())
        }
    }

    fn build_stream(config: &CaptureConfig, buffer: Arc<Mutex<Vec<f32>>>) -> VoiceResult<cpal::Stream> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::Capture("No input device available".to_string()))?;
        info!(
            "🎤 Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        let default_config = device.default_input_config()?;
        debug!("Default input config: {:?}", default_config);

        let channels = config.channels.max(1) as usize;
        let stream_config = StreamConfig {
            channels: config.channels.max(1),
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    if channels == 1 {
                        buf.extend_from_slice(data);
                    } else {
                        buf.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                        );
                    }
                }
            },
            move |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }

    impl AudioSource for MicrophoneSource {
        fn open(&self, config: &CaptureConfig) -> VoiceResult<Box<dyn CaptureStream>> {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            let (stop_tx, stop_rx) = mpsc::channel::<()>();
            let (ready_tx, ready_rx) = mpsc::channel::<VoiceResult<()>>();
            let thread_config = config.clone();
            let thread_buffer = Arc::clone(&buffer);

            let handle = thread::spawn(move || {
                let stream = match build_stream(&thread_config, thread_buffer) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Block until finish() or drop signals (or the sender goes away).
                let _ = stop_rx.recv();
                drop(stream);
                debug!("microphone stream released");
            });

            ready_rx
                .recv()
                .map_err(|_| VoiceError::Capture("capture thread exited".to_string()))??;
            info!("✅ Microphone capture started");

            Ok(Box::new(MicrophoneStream {
                buffer,
                sample_rate: config.sample_rate,
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            }))
        }
    }

    struct MicrophoneStream {
        buffer: Arc<Mutex<Vec<f32>>>,
        sample_rate: u32,
        stop_tx: Option<mpsc::Sender<()>>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl MicrophoneStream {
        fn release(&mut self) {
            if let Some(tx) = self.stop_tx.take() {
                let _ = tx.send(());
            }
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    impl CaptureStream for MicrophoneStream {
        fn finish(mut self: Box<Self>) -> VoiceResult<CapturedAudio> {
            self.release();
            let samples = self
                .buffer
                .lock()
                .map(|mut b| std::mem::take(&mut *b))
                .map_err(|e| VoiceError::Capture(format!("buffer lock poisoned: {}", e)))?;
            info!("🛑 Microphone capture stopped ({} samples)", samples.len());
            Ok(CapturedAudio::new(samples, self.sample_rate))
        }
    }

    impl Drop for MicrophoneStream {
        fn drop(&mut self) {
            self.release();
        }
    }
}

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneSource;
