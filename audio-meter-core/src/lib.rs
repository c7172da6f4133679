//! # audio-meter-core
//!
//! Platform-agnostic audio level metering core library.
//!
//! Continuously reduces one or more audio endpoints to display-ready
//! level metrics (peak, peak-hold, peak-max) and republishes an
//! immutable snapshot on a fixed cadence. Platform-specific backends
//! (Windows WASAPI, macOS Core Audio) implement the `DeviceCatalog` and
//! `CaptureProvider` traits and plug into the generic `MonitorLoop`.
//!
//! ## Architecture
//!
//! ```text
//! audio-meter-core (this crate)
//! ├── traits/       ← DeviceCatalog, CaptureProvider, MonitorDelegate
//! ├── models/       ← MeterError, MonitorState, SourceConfig, MeterSnapshot, etc.
//! ├── metering/     ← MeterState (peak/hold/max machine), ScaleConverter
//! └── session/      ← CaptureSession, SourceRegistry, MonitorLoop
//! ```
//!
//! Data flows one direction: OS audio buffers → `CaptureSession` (raw
//! peak) → `MeterState` (decayed metrics) → `MonitorLoop` snapshot →
//! the embedding host's renderer.

pub mod metering;
pub mod models;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use metering::meter_state::MeterState;
pub use metering::scale::ScaleConverter;
pub use models::config::MonitorConfig;
pub use models::endpoint::{AudioEndpointRef, DeviceEvent, Direction};
pub use models::error::MeterError;
pub use models::snapshot::{MeterLevels, MeterSnapshot, SourceReading};
pub use models::source::{DisplayScale, SourceConfig};
pub use models::state::MonitorState;
pub use session::capture::CaptureSession;
pub use session::monitor::MonitorLoop;
pub use session::registry::SourceRegistry;
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
pub use traits::device_catalog::{DeviceCatalog, DeviceChangeObserver};
pub use traits::monitor_delegate::MonitorDelegate;
