use crate::models::error::MeterError;
use crate::models::snapshot::MeterSnapshot;
use crate::models::state::MonitorState;

/// Event delegate for monitor loop notifications.
///
/// All methods are called synchronously from the polling thread.
/// Implementations must not block for long; a slow renderer should hand
/// the snapshot off and return.
pub trait MonitorDelegate: Send + Sync {
    /// Called once per tick with the freshly assembled snapshot.
    fn on_snapshot(&self, snapshot: &MeterSnapshot);

    /// Called when the loop transitions between Running/Paused/Stopped.
    fn on_state_changed(&self, state: MonitorState);

    /// Called when a per-source error is isolated and logged.
    fn on_error(&self, error: &MeterError);
}
