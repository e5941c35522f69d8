//! Shake gesture detection from accelerometer samples

use std::collections::VecDeque;

use crate::config::ShakeConfig;

/// One accelerometer reading, in g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerometerSample {
    /// X axis acceleration
    pub x: f64,
    /// Y axis acceleration
    pub y: f64,
    /// Z axis acceleration
    pub z: f64,
    /// Reading time, ms
    pub timestamp_ms: u64,
}

impl AccelerometerSample {
    /// Reading at `timestamp_ms`
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    /// Total acceleration magnitude
    pub fn magnitude_g(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Recognises a shake: `min_peaks` readings above `threshold_g` inside
/// `window_ms`, then stays quiet for `cooldown_ms`
#[derive(Debug, Clone)]
pub struct ShakeDetector {
    config: ShakeConfig,
    peaks: VecDeque<u64>,
    quiet_until: Option<u64>,
}

impl ShakeDetector {
    /// Detector with the given thresholds
    pub fn new(config: ShakeConfig) -> Self {
        Self {
            config,
            peaks: VecDeque::new(),
            quiet_until: None,
        }
    }

    /// Feed one reading; `true` when it completes a shake
    pub fn observe(&mut self, sample: AccelerometerSample) -> bool {
        let now = sample.timestamp_ms;
        if self.quiet_until.is_some_and(|until| now < until) {
            return false;
        }
        self.quiet_until = None;

        let window_start = now.saturating_sub(self.config.window_ms);
        while self.peaks.front().is_some_and(|&t| t < window_start) {
            self.peaks.pop_front();
        }
        if sample.magnitude_g() <= self.config.threshold_g {
            return false;
        }

        self.peaks.push_back(now);
        if self.peaks.len() < self.config.min_peaks {
            return false;
        }

        tracing::debug!(peaks = self.peaks.len(), "shake detected");
        self.peaks.clear();
        self.quiet_until = Some(now.saturating_add(self.config.cooldown_ms));
        true
    }

    /// Forget partial peaks and any cooldown
    pub fn reset(&mut self) {
        self.peaks.clear();
        self.quiet_until = None;
    }
}
