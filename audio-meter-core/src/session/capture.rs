use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::endpoint::AudioEndpointRef;
use crate::models::error::MeterError;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

/// One live audio connection and its "peak since last read" accumulator.
///
/// The delivery callback runs on the provider's audio thread and folds
/// each buffer's maximum into `running_max`; the polling thread drains
/// the accumulator once per tick via [`CaptureSession::measure_peak`].
/// The buffer scan happens outside the lock, so the critical section is
/// a single compare-and-store regardless of buffer size.
pub struct CaptureSession {
    endpoint: AudioEndpointRef,
    provider: Box<dyn CaptureProvider>,
    running_max: Arc<Mutex<f32>>,
    callback: AudioBufferCallback,
}

impl CaptureSession {
    /// Open a session on a resolved endpoint and start delivery.
    ///
    /// The registry guarantees at most one live session per endpoint by
    /// closing any predecessor before calling this.
    pub fn open(
        endpoint: AudioEndpointRef,
        mut provider: Box<dyn CaptureProvider>,
    ) -> Result<Self, MeterError> {
        let running_max = Arc::new(Mutex::new(0.0f32));

        let accumulator = Arc::clone(&running_max);
        let callback: AudioBufferCallback =
            Arc::new(move |samples: &[f32], _sample_rate: f64, _channels: u16| {
                let mut buffer_max = 0.0f32;
                for &sample in samples {
                    buffer_max = buffer_max.max(sample.abs());
                }

                let mut running = accumulator.lock();
                *running = running.max(buffer_max);
            });

        provider.start(Arc::clone(&callback))?;

        Ok(Self {
            endpoint,
            provider,
            running_max,
            callback,
        })
    }

    /// Read and reset the running maximum: "the peak since I last asked".
    ///
    /// Never fails — a dead connection simply stops feeding the
    /// accumulator, so the source reads as silence until the registry
    /// rebuilds.
    pub fn measure_peak(&self) -> f32 {
        let mut running = self.running_max.lock();
        std::mem::replace(&mut *running, 0.0)
    }

    /// Suspend delivery without releasing the session.
    pub fn pause(&mut self) -> Result<(), MeterError> {
        self.provider.stop()
    }

    /// Resume delivery after [`CaptureSession::pause`].
    pub fn resume(&mut self) -> Result<(), MeterError> {
        self.provider.start(Arc::clone(&self.callback))
    }

    /// Stop delivery and release the connection. Idempotent.
    pub fn close(&mut self) {
        if let Err(e) = self.provider.stop() {
            log::warn!("Error closing capture session for '{}': {}", self.endpoint.name, e);
        }
    }

    pub fn endpoint(&self) -> &AudioEndpointRef {
        &self.endpoint
    }

    pub fn is_active(&self) -> bool {
        self.provider.is_active()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::endpoint::Direction;
    use crate::testing::FakeProvider;

    fn endpoint() -> AudioEndpointRef {
        AudioEndpointRef {
            id: "dev-1".into(),
            name: "Test Mic".into(),
            direction: Direction::Capture,
            is_default: true,
        }
    }

    #[test]
    fn measure_peak_returns_buffer_maximum_magnitude() {
        let provider = FakeProvider::new();
        let feed = provider.handle();
        let session = CaptureSession::open(endpoint(), Box::new(provider)).unwrap();

        feed.deliver(&[0.1, -0.6, 0.3]);
        assert_eq!(session.measure_peak(), 0.6);
    }

    #[test]
    fn measure_peak_resets_on_read() {
        let provider = FakeProvider::new();
        let feed = provider.handle();
        let session = CaptureSession::open(endpoint(), Box::new(provider)).unwrap();

        feed.deliver(&[0.5]);
        assert_eq!(session.measure_peak(), 0.5);
        assert_eq!(session.measure_peak(), 0.0);
    }

    #[test]
    fn peaks_fold_across_deliveries_between_polls() {
        let provider = FakeProvider::new();
        let feed = provider.handle();
        let session = CaptureSession::open(endpoint(), Box::new(provider)).unwrap();

        feed.deliver(&[0.2]);
        feed.deliver(&[0.9, 0.1]);
        feed.deliver(&[0.4]);
        assert_eq!(session.measure_peak(), 0.9);
    }

    #[test]
    fn pause_and_resume_toggle_delivery() {
        let provider = FakeProvider::new();
        let feed = provider.handle();
        let mut session = CaptureSession::open(endpoint(), Box::new(provider)).unwrap();
        assert!(session.is_active());

        session.pause().unwrap();
        assert!(!session.is_active());
        feed.deliver(&[0.8]); // dropped while paused
        assert_eq!(session.measure_peak(), 0.0);

        session.resume().unwrap();
        assert!(session.is_active());
        feed.deliver(&[0.8]);
        assert_eq!(session.measure_peak(), 0.8);
    }

    #[test]
    fn close_is_idempotent() {
        let provider = FakeProvider::new();
        let mut session = CaptureSession::open(endpoint(), Box::new(provider)).unwrap();

        session.close();
        session.close();
        assert!(!session.is_active());
    }

    #[test]
    fn dead_delivery_reads_as_silence() {
        let provider = FakeProvider::new();
        let feed = provider.handle();
        let session = CaptureSession::open(endpoint(), Box::new(provider)).unwrap();

        feed.deliver(&[0.7]);
        assert_eq!(session.measure_peak(), 0.7);

        feed.kill(); // connection breaks mid-stream
        feed.deliver(&[0.9]);
        assert_eq!(session.measure_peak(), 0.0);
    }
}
