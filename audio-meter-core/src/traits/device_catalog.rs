use std::sync::Arc;

use crate::models::endpoint::{AudioEndpointRef, DeviceEvent, Direction};
use crate::models::error::MeterError;
use crate::traits::capture_provider::CaptureProvider;

/// Callback invoked when the device topology changes.
///
/// Fires on an OS notification thread — implementations must only set
/// flags or enqueue work, never rebuild inline.
pub type DeviceChangeObserver = Arc<dyn Fn(&DeviceEvent) + Send + Sync + 'static>;

/// Platform seam for endpoint enumeration and session construction.
///
/// The registry and monitor loop consume this trait only, so the core
/// crate stays platform-free; `audio-meter-windows` implements it over
/// the MMDevice API.
pub trait DeviceCatalog: Send + Sync {
    /// Active endpoints for one direction, in OS enumeration order.
    fn endpoints(&self, direction: Direction) -> Result<Vec<AudioEndpointRef>, MeterError>;

    /// The OS default endpoint for one direction.
    fn default_endpoint(&self, direction: Direction) -> Result<AudioEndpointRef, MeterError>;

    /// Open a capture provider for a resolved endpoint. Render
    /// endpoints are opened in loopback mode.
    fn open_capture(
        &self,
        endpoint: &AudioEndpointRef,
    ) -> Result<Box<dyn CaptureProvider>, MeterError>;

    /// Register for device add/remove/state/default-change events.
    fn subscribe_changes(&self, observer: DeviceChangeObserver) -> Result<(), MeterError>;
}
