use std::time::{Duration, Instant};

use crate::models::snapshot::MeterLevels;

/// How long `peak_hold` survives without a new local maximum.
const HOLD_DURATION: Duration = Duration::from_secs(3);

/// Silence on all tracks.
const FLOOR: f32 = 0.0;

/// Per-source meter state: three interacting scalar tracks derived from
/// a stream of raw peak samples.
///
/// - `peak` — the amplitude seen at the most recent tick.
/// - `peak_hold` — a secondary maximum that floors after 3 s without a
///   new local peak, and immediately when a new absolute maximum lands
///   (a stale hold marker must never sit above the max).
/// - `peak_max` — the maximum since the last explicit reset; monotonic.
///
/// Owned and mutated exclusively by the polling tick for its source;
/// amplitudes stay raw linear, scale conversion happens at presentation.
#[derive(Debug, Clone)]
pub struct MeterState {
    peak: f32,
    peak_hold: f32,
    peak_max: f32,
    last_hold_update: Option<Instant>,
}

impl MeterState {
    pub fn new() -> Self {
        Self {
            peak: FLOOR,
            peak_hold: FLOOR,
            peak_max: FLOOR,
            last_hold_update: None,
        }
    }

    /// Feed one tick's sample through the transition function.
    pub fn update(&mut self, sample: f32) {
        self.apply(sample, Instant::now());
    }

    fn apply(&mut self, sample: f32, now: Instant) {
        if let Some(updated) = self.last_hold_update {
            if now.duration_since(updated) > HOLD_DURATION {
                self.peak_hold = FLOOR;
            }
        }

        if sample >= self.peak_max {
            self.peak_max = sample;
            self.peak_hold = FLOOR;
        } else if sample > self.peak_hold {
            self.peak_hold = sample;
            self.last_hold_update = Some(now);
        }

        self.peak = sample;
    }

    /// Floor all three tracks and forget the hold timestamp.
    pub fn reset(&mut self) {
        self.peak = FLOOR;
        self.peak_hold = FLOOR;
        self.peak_max = FLOOR;
        self.last_hold_update = None;
    }

    pub fn levels(&self) -> MeterLevels {
        MeterLevels {
            peak: self.peak,
            peak_hold: self.peak_hold,
            peak_max: self.peak_max,
        }
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn peak_hold(&self) -> f32 {
        self.peak_hold
    }

    pub fn peak_max(&self) -> f32 {
        self.peak_max
    }
}

impl Default for MeterState {
    fn default() -> Self {
        Self::new()
    }
}
