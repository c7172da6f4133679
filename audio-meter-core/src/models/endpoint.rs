use serde::{Deserialize, Serialize};

/// Data-flow direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// An input device (microphone). Observed directly.
    Capture,
    /// An output device (speakers/headphones). Observed in loopback mode.
    Render,
}

/// A resolved, OS-addressable audio endpoint.
///
/// Immutable once resolved; the registry re-resolves endpoints from
/// scratch whenever it rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEndpointRef {
    /// Opaque OS device id.
    pub id: String,
    /// Human-readable device name (e.g. "Chat Mic (TC-Helicon GoXLR)").
    pub name: String,
    pub direction: Direction,
    /// Whether this is the OS default endpoint for its direction.
    pub is_default: bool,
}

/// A device-topology change reported by the platform backend.
///
/// Every variant maps to "mark the registry dirty"; the rebuild itself
/// is deferred to the next poll tick so bursts of events coalesce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added { device_id: String },
    Removed { device_id: String },
    StateChanged { device_id: String, active: bool },
    DefaultChanged { direction: Direction },
}
