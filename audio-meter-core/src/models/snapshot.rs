use serde::{Deserialize, Serialize};

use super::source::DisplayScale;

/// Raw linear meter tracks for one source, all in `[0.0, 1.0]`.
///
/// Scale conversion is deferred to presentation; see
/// [`crate::metering::scale::ScaleConverter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterLevels {
    /// Amplitude observed at the most recent tick.
    pub peak: f32,
    /// Decaying secondary maximum (floors after 3 s without a new local peak).
    pub peak_hold: f32,
    /// Maximum since the last explicit reset; monotonic.
    pub peak_max: f32,
}

impl Default for MeterLevels {
    fn default() -> Self {
        Self {
            peak: 0.0,
            peak_hold: 0.0,
            peak_max: 0.0,
        }
    }
}

/// One source's entry in a snapshot.
///
/// `levels` is `None` when the configured pattern resolved to no live
/// endpoint — the renderer shows a "no device" placeholder instead of
/// dropping the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub label: String,
    pub scale: DisplayScale,
    pub levels: Option<MeterLevels>,
}

impl SourceReading {
    pub fn is_placeholder(&self) -> bool {
        self.levels.is_none()
    }
}

/// An ordered, immutable view of every visible source as of one tick.
///
/// Built once per tick after all sessions have been sampled and all
/// meters updated, then handed to the delegate; never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeterSnapshot {
    pub readings: Vec<SourceReading>,
}

impl MeterSnapshot {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }
}
