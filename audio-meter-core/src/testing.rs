//! Hand-written fakes shared by the unit tests: an in-process capture
//! provider driven synchronously from the test thread, and a device
//! catalog whose topology can change mid-test.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::endpoint::{AudioEndpointRef, DeviceEvent, Direction};
use crate::models::error::MeterError;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};
use crate::traits::device_catalog::{DeviceCatalog, DeviceChangeObserver};

struct FeedShared {
    active: AtomicBool,
    dead: AtomicBool,
    callback: Mutex<Option<AudioBufferCallback>>,
    starts: AtomicUsize,
}

/// Test stand-in for a platform capture provider. Buffers are pushed
/// from the test thread through the [`FeedHandle`], standing in for the
/// OS delivery thread.
pub(crate) struct FakeProvider {
    shared: Arc<FeedShared>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(FeedShared {
                active: AtomicBool::new(false),
                dead: AtomicBool::new(false),
                callback: Mutex::new(None),
                starts: AtomicUsize::new(0),
            }),
        }
    }

    pub fn handle(&self) -> FeedHandle {
        FeedHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl CaptureProvider for FakeProvider {
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), MeterError> {
        if self.shared.dead.load(Ordering::SeqCst) {
            return Err(MeterError::CaptureFailure("connection lost".into()));
        }
        if self.shared.active.load(Ordering::SeqCst) {
            return Ok(());
        }
        *self.shared.callback.lock() = Some(callback);
        self.shared.active.store(true, Ordering::SeqCst);
        self.shared.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MeterError> {
        self.shared.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst) && !self.shared.dead.load(Ordering::SeqCst)
    }
}

/// Feeds audio into a [`FakeProvider`] and inspects its delivery state.
#[derive(Clone)]
pub(crate) struct FeedHandle {
    shared: Arc<FeedShared>,
}

impl FeedHandle {
    /// Deliver one buffer, as the OS audio thread would. Dropped while
    /// the provider is stopped or dead.
    pub fn deliver(&self, samples: &[f32]) {
        if !self.shared.active.load(Ordering::SeqCst) || self.shared.dead.load(Ordering::SeqCst) {
            return;
        }
        let callback = self.shared.callback.lock().clone();
        if let Some(callback) = callback {
            callback(samples, 48_000.0, 1);
        }
    }

    /// Simulate the connection breaking mid-stream.
    pub fn kill(&self) {
        self.shared.dead.store(true, Ordering::SeqCst);
        self.shared.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst) && !self.shared.dead.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn start_count(&self) -> usize {
        self.shared.starts.load(Ordering::SeqCst)
    }
}

struct MockState {
    endpoints: Vec<AudioEndpointRef>,
    observers: Vec<DeviceChangeObserver>,
    handles: Vec<(String, FeedHandle)>,
}

/// Test stand-in for the platform device catalog.
pub(crate) struct MockCatalog {
    state: Mutex<MockState>,
}

impl MockCatalog {
    pub fn new(endpoints: Vec<AudioEndpointRef>) -> Self {
        Self {
            state: Mutex::new(MockState {
                endpoints,
                observers: Vec::new(),
                handles: Vec::new(),
            }),
        }
    }

    /// Replace the visible topology, as a hot-plug would.
    pub fn set_endpoints(&self, endpoints: Vec<AudioEndpointRef>) {
        self.state.lock().endpoints = endpoints;
    }

    /// Deliver a device event to every subscribed observer.
    pub fn fire(&self, event: &DeviceEvent) {
        let observers = self.state.lock().observers.clone();
        for observer in observers {
            observer(event);
        }
    }

    /// The most recently opened feed for an endpoint id.
    pub fn last_handle(&self, endpoint_id: &str) -> Option<FeedHandle> {
        self.state
            .lock()
            .handles
            .iter()
            .rev()
            .find(|(id, _)| id == endpoint_id)
            .map(|(_, handle)| handle.clone())
    }
}

impl DeviceCatalog for MockCatalog {
    fn endpoints(&self, direction: Direction) -> Result<Vec<AudioEndpointRef>, MeterError> {
        Ok(self
            .state
            .lock()
            .endpoints
            .iter()
            .filter(|endpoint| endpoint.direction == direction)
            .cloned()
            .collect())
    }

    fn default_endpoint(&self, direction: Direction) -> Result<AudioEndpointRef, MeterError> {
        self.state
            .lock()
            .endpoints
            .iter()
            .find(|endpoint| endpoint.direction == direction && endpoint.is_default)
            .cloned()
            .ok_or_else(|| MeterError::DeviceUnavailable("no default endpoint".into()))
    }

    fn open_capture(
        &self,
        endpoint: &AudioEndpointRef,
    ) -> Result<Box<dyn CaptureProvider>, MeterError> {
        let provider = FakeProvider::new();
        self.state
            .lock()
            .handles
            .push((endpoint.id.clone(), provider.handle()));
        Ok(Box::new(provider))
    }

    fn subscribe_changes(&self, observer: DeviceChangeObserver) -> Result<(), MeterError> {
        self.state.lock().observers.push(observer);
        Ok(())
    }
}
