use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::models::config::MonitorConfig;
use crate::models::endpoint::DeviceEvent;
use crate::models::error::MeterError;
use crate::models::source::SourceConfig;
use crate::models::state::MonitorState;
use crate::session::registry::SourceRegistry;
use crate::traits::device_catalog::DeviceCatalog;
use crate::traits::monitor_delegate::MonitorDelegate;

/// Control block shared between the polling thread and command callers.
struct Control {
    state: MonitorState,
    reset_pending: bool,
    configs: Vec<SourceConfig>,
    update_interval: Duration,
    device_offset: isize,
}

struct Shared {
    control: Mutex<Control>,
    /// Wakes the polling thread out of its tick sleep, so stop, pause,
    /// resume, and dirty-marking all take effect without waiting out a
    /// full interval.
    wake: Condvar,
    /// Deferred-rebuild marker. Set from notification threads, consumed
    /// once per tick; bursts of device events coalesce into one rebuild.
    dirty: AtomicBool,
    delegate: Mutex<Option<Arc<dyn MonitorDelegate>>>,
}

impl Shared {
    fn delegate(&self) -> Option<Arc<dyn MonitorDelegate>> {
        self.delegate.lock().clone()
    }

    fn mark_dirty_and_wake(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.wake.notify_all();
    }
}

/// The polling scheduler: one background thread that rebuilds the
/// registry when dirty, drains every session's peak accumulator, steps
/// every meter, and publishes a snapshot per tick.
///
/// The registry lives entirely on the polling thread. Everything
/// external — commands, config changes, device notifications — goes
/// through the shared control block and is applied at tick boundaries.
pub struct MonitorLoop {
    catalog: Arc<dyn DeviceCatalog>,
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
    subscribed: bool,
}

impl MonitorLoop {
    pub fn new(catalog: Arc<dyn DeviceCatalog>, config: MonitorConfig) -> Result<Self, MeterError> {
        config.validate().map_err(MeterError::ConfigurationInvalid)?;

        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                state: MonitorState::Stopped,
                reset_pending: false,
                configs: config.sources,
                update_interval: Duration::from_millis(config.update_interval_ms),
                device_offset: 0,
            }),
            wake: Condvar::new(),
            // Dirty from the start so the first tick resolves sources.
            dirty: AtomicBool::new(true),
            delegate: Mutex::new(None),
        });

        Ok(Self {
            catalog,
            shared,
            thread: None,
            subscribed: false,
        })
    }

    /// Install the snapshot consumer. Call before `start`.
    pub fn set_delegate(&self, delegate: Arc<dyn MonitorDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    /// Transition to `Running`: spawn the tick loop, or resume it if it
    /// is alive and paused.
    pub fn start(&mut self) -> Result<(), MeterError> {
        if !self.subscribed {
            let shared = Arc::clone(&self.shared);
            let observer: Arc<dyn Fn(&DeviceEvent) + Send + Sync> =
                Arc::new(move |event: &DeviceEvent| {
                    log::debug!("Device event: {:?}", event);
                    match event {
                        DeviceEvent::Added { .. }
                        | DeviceEvent::Removed { .. }
                        | DeviceEvent::DefaultChanged { .. } => shared.mark_dirty_and_wake(),
                        DeviceEvent::StateChanged { active, .. } => {
                            if *active {
                                shared.mark_dirty_and_wake();
                            }
                        }
                    }
                });
            match self.catalog.subscribe_changes(observer) {
                Ok(()) => self.subscribed = true,
                Err(e) => {
                    // Hot-plug detection degrades to manual mark_dirty.
                    log::warn!("Device change subscription unavailable: {}", e);
                }
            }
        }

        {
            let mut control = self.shared.control.lock();
            if control.state.is_running() {
                return Ok(());
            }
            control.state = MonitorState::Running;
            self.shared.wake.notify_all();
        }
        self.notify_state(MonitorState::Running);

        if self.thread.is_none() {
            // A fresh thread starts with an empty registry.
            self.shared.dirty.store(true, Ordering::SeqCst);
            let shared = Arc::clone(&self.shared);
            let catalog = Arc::clone(&self.catalog);
            let handle = thread::Builder::new()
                .name("meter-monitor".into())
                .spawn(move || run_loop(shared, catalog))
                .map_err(|e| MeterError::Backend(format!("failed to spawn monitor thread: {}", e)))?;
            self.thread = Some(handle);
        }

        Ok(())
    }

    /// Suspend ticking and session delivery without tearing anything down.
    pub fn pause(&self) {
        let transitioned = {
            let mut control = self.shared.control.lock();
            if !control.state.is_running() {
                false
            } else {
                control.state = MonitorState::Paused;
                self.shared.wake.notify_all();
                true
            }
        };
        if transitioned {
            self.notify_state(MonitorState::Paused);
        }
    }

    /// Resume ticking and session delivery after `pause`.
    pub fn resume(&self) {
        let transitioned = {
            let mut control = self.shared.control.lock();
            if !control.state.is_paused() {
                false
            } else {
                control.state = MonitorState::Running;
                self.shared.wake.notify_all();
                true
            }
        };
        if transitioned {
            self.notify_state(MonitorState::Running);
        }
    }

    /// Flip between `Running` and `Paused`. Two toggles restore the
    /// original per-session delivery state.
    pub fn toggle_monitoring(&self) {
        let state = self.state();
        match state {
            MonitorState::Running => self.pause(),
            MonitorState::Paused => self.resume(),
            MonitorState::Stopped => {}
        }
    }

    /// Mute/clear: floor every meter at the next tick boundary without
    /// touching capture sessions.
    pub fn reset_meters(&self) {
        self.shared.control.lock().reset_pending = true;
        self.shared.wake.notify_all();
    }

    /// Step through devices sharing a name substring: `+1`/`-1` shift
    /// the match offset, `0` resets it. Takes effect on the next tick's
    /// rebuild.
    pub fn cycle_device(&self, delta: isize) {
        {
            let mut control = self.shared.control.lock();
            if delta == 0 {
                control.device_offset = 0;
            } else {
                control.device_offset += delta;
            }
        }
        self.shared.mark_dirty_and_wake();
    }

    /// Replace the source list and poll interval at runtime.
    pub fn update_config(&self, config: MonitorConfig) -> Result<(), MeterError> {
        config.validate().map_err(MeterError::ConfigurationInvalid)?;

        {
            let mut control = self.shared.control.lock();
            control.configs = config.sources;
            control.update_interval = Duration::from_millis(config.update_interval_ms);
        }
        self.shared.mark_dirty_and_wake();
        Ok(())
    }

    /// Request a rebuild at the next tick. Safe from any thread; used
    /// by host configuration-change notifications.
    pub fn mark_dirty(&self) {
        self.shared.mark_dirty_and_wake();
    }

    pub fn state(&self) -> MonitorState {
        self.shared.control.lock().state
    }

    /// Tear down the loop and close every session. Idempotent.
    pub fn stop(&mut self) {
        let transitioned = {
            let mut control = self.shared.control.lock();
            if control.state.is_stopped() {
                false
            } else {
                control.state = MonitorState::Stopped;
                self.shared.wake.notify_all();
                true
            }
        };

        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }

        if transitioned {
            self.notify_state(MonitorState::Stopped);
        }
    }

    fn notify_state(&self, state: MonitorState) {
        if let Some(delegate) = self.shared.delegate() {
            delegate.on_state_changed(state);
        }
    }
}

impl Drop for MonitorLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The tick loop body, running on the `meter-monitor` thread.
///
/// The thread is the sole owner of the registry and of every meter
/// state; per-source failures are logged (and forwarded to the
/// delegate) without ever escaping a tick.
fn run_loop(shared: Arc<Shared>, catalog: Arc<dyn DeviceCatalog>) {
    let mut registry = SourceRegistry::new(catalog);
    let mut sessions_paused = false;

    loop {
        enum Step {
            Tick(Duration),
            Pause,
            Stop,
        }

        let step = {
            let control = shared.control.lock();
            match control.state {
                MonitorState::Running => Step::Tick(control.update_interval),
                MonitorState::Paused => Step::Pause,
                MonitorState::Stopped => Step::Stop,
            }
        };

        match step {
            Step::Stop => {
                registry.close_all();
                return;
            }
            Step::Pause => {
                if !sessions_paused {
                    registry.pause_all();
                    sessions_paused = true;
                }
                let mut control = shared.control.lock();
                while control.state.is_paused() {
                    shared.wake.wait(&mut control);
                }
            }
            Step::Tick(interval) => {
                if sessions_paused {
                    registry.resume_all();
                    sessions_paused = false;
                }

                if shared.dirty.swap(false, Ordering::SeqCst) {
                    let (configs, offset) = {
                        let control = shared.control.lock();
                        (control.configs.clone(), control.device_offset)
                    };
                    let errors = registry.rebuild(&configs, offset);
                    if let Some(delegate) = shared.delegate() {
                        for error in &errors {
                            delegate.on_error(error);
                        }
                    }
                }

                let reset = {
                    let mut control = shared.control.lock();
                    std::mem::take(&mut control.reset_pending)
                };
                if reset {
                    registry.reset_meters();
                }

                // All sessions sampled and all meters stepped before the
                // snapshot goes out, so it is consistent as of this tick.
                for source in registry.sources_mut() {
                    if let Some(session) = source.session.as_ref() {
                        let sample = session.measure_peak();
                        source.meter.update(sample);
                    }
                }

                let snapshot = registry.snapshot();
                if let Some(delegate) = shared.delegate() {
                    delegate.on_snapshot(&snapshot);
                }

                let mut control = shared.control.lock();
                if control.state.is_running() {
                    let _ = shared.wake.wait_for(&mut control, interval);
                }
            }
        }
    }
}
