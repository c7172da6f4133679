//! # audio-meter-windows
//!
//! Windows WASAPI backend for audio-meter-kit.
//!
//! Provides:
//! - `WasapiCapture` — peak capture via a WASAPI endpoint; capture
//!   devices are observed directly, render devices in loopback mode
//! - `DeviceEnumerator` — audio endpoint enumeration via the MMDevice API
//! - `EndpointNotifications` — device add/remove/default-change callbacks
//! - `WindowsDeviceCatalog` — the `DeviceCatalog` implementation tying
//!   them together
//!
//! ## Platform Requirements
//! - Windows 10 1703+ (build 15063) for event-driven loopback
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//!
//! use audio_meter_core::{MonitorConfig, MonitorLoop};
//! use audio_meter_windows::WindowsDeviceCatalog;
//!
//! let catalog = Arc::new(WindowsDeviceCatalog::new());
//! let mut monitor = MonitorLoop::new(catalog, MonitorConfig::default())?;
//! monitor.start()?;
//! ```

#[cfg(target_os = "windows")]
pub mod catalog;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod notifications;
#[cfg(target_os = "windows")]
pub mod wasapi_capture;

#[cfg(target_os = "windows")]
pub use catalog::WindowsDeviceCatalog;
#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use notifications::EndpointNotifications;
#[cfg(target_os = "windows")]
pub use wasapi_capture::WasapiCapture;
