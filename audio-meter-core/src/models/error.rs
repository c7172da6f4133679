use thiserror::Error;

/// Errors that can occur while resolving devices or capturing audio.
///
/// All of these are per-source and non-fatal to the monitor loop: the
/// affected source reads as silence or a placeholder until the next
/// dirty rebuild.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeterError {
    /// A configured pattern matched no live endpoint.
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    /// An open session's connection broke mid-stream.
    #[error("capture failure: {0}")]
    CaptureFailure(String),

    /// A malformed source configuration entry.
    #[error("invalid source configuration: {0}")]
    ConfigurationInvalid(String),

    /// OS-level plumbing failure in the platform backend.
    #[error("backend error: {0}")]
    Backend(String),
}
