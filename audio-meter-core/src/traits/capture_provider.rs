use std::sync::Arc;

use crate::models::error::MeterError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples, `[-1.0, 1.0]`.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Interface for platform-specific audio capture sources.
///
/// Implemented by:
/// - `WasapiCapture` (Windows; direct for capture endpoints, loopback
///   for render endpoints)
/// - Future: Core Audio / AVFoundation providers (macOS)
pub trait CaptureProvider: Send {
    /// Start capturing audio, delivering buffers via `callback`.
    ///
    /// The callback fires on a dedicated audio thread — keep processing
    /// minimal. Starting a provider that is already delivering is a
    /// no-op success, not an error.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), MeterError>;

    /// Stop capturing and release delivery resources. Idempotent.
    fn stop(&mut self) -> Result<(), MeterError>;

    /// Whether delivery is currently active. A provider whose
    /// connection broke mid-stream reports `false` until restarted.
    fn is_active(&self) -> bool;
}
