//! Paced playback of a computed trajectory.
//!
//! Computation happens once, up front; playback then walks the stored series
//! at a configurable number of frames per second. Wall-clock time between
//! calls is converted into a whole number of frames, and the fractional
//! remainder is carried to the next call so pacing does not drift.

use std::ops::Range;
use std::time::Duration;

use nalgebra::{Point3, Vector3};

use crate::error::AppResult;

/// Frames-per-second pacing over a trajectory index.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackClock {
    rate_hz: f64,
    /// Fraction of a frame owed from earlier ticks
    carry: f64,
    index: usize,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            carry: 0.0,
            index: 0,
        }
    }
}

impl PlaybackClock {
    /// Create a clock at `rate_hz` frames per second (0 pauses).
    pub fn new(rate_hz: f64) -> AppResult<Self> {
        fp_project::validate_playback_rate(rate_hz)?;
        Ok(Self {
            rate_hz,
            ..Self::default()
        })
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    /// Change the rate; takes effect on the next tick.
    pub fn set_rate(&mut self, rate_hz: f64) -> AppResult<()> {
        fp_project::validate_playback_rate(rate_hz)?;
        self.rate_hz = rate_hz;
        if rate_hz == 0.0 {
            self.carry = 0.0;
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.rate_hz == 0.0
    }

    /// Index of the next frame to emit.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Back to the first frame.
    pub fn reset(&mut self) {
        self.index = 0;
        self.carry = 0.0;
    }

    /// Number of frames owed after `elapsed` wall-clock time.
    pub fn frames_due(&mut self, elapsed: Duration) -> usize {
        if self.is_paused() {
            return 0;
        }
        let owed = self.carry + elapsed.as_secs_f64() * self.rate_hz;
        let whole = owed.floor();
        self.carry = owed - whole;
        whole as usize
    }

    /// Claim up to `n` frame indices, stopping at `len`.
    pub fn take(&mut self, n: usize, len: usize) -> Range<usize> {
        let start = self.index.min(len);
        let end = start.saturating_add(n).min(len);
        self.index = end;
        start..end
    }

    pub fn is_finished(&self, len: usize) -> bool {
        self.index >= len
    }

    /// Wall-clock time between frames, `None` while paused.
    pub fn frame_interval(&self) -> Option<Duration> {
        if self.is_paused() {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.rate_hz))
        }
    }
}

/// One rendered instant of the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub index: usize,
    /// Simulated time of the sample (seconds)
    pub time_s: f64,
    pub bob: Point3<f64>,
    /// Drawn rod, from the pivot towards the bob
    pub rod: Vector3<f64>,
    pub trail: bool,
    /// Set on the first frame after the trail was switched off
    pub clear_trail: bool,
}
