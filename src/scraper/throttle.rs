//! Randomised pacing between page interactions.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// Pacing primitive. Stateless apart from its source of randomness.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Suspend for a duration drawn uniformly from `[min_ms, max_ms]`.
    async fn wait(&self, min_ms: u64, max_ms: u64);

    /// Draw an integer uniformly from `[min, max]`.
    fn draw(&self, min: u64, max: u64) -> u64;
}

/// Real clock + thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct JitterThrottle;

#[async_trait]
impl Throttle for JitterThrottle {
    async fn wait(&self, min_ms: u64, max_ms: u64) {
        let ms = self.draw(min_ms, max_ms);
        trace!("pausing {} ms", ms);
        sleep(Duration::from_millis(ms)).await;
    }

    fn draw(&self, min: u64, max: u64) -> u64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        rand::rng().random_range(lo..=hi)
    }
}

// ── Test double ───────────────────────────────────────────────────────────────

/// Never sleeps; records every requested wait and always draws the lower bound.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingThrottle {
    waits: std::sync::Mutex<Vec<(u64, u64)>>,
}

#[cfg(test)]
impl RecordingThrottle {
    pub fn waits(&self) -> Vec<(u64, u64)> {
        self.waits.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Throttle for RecordingThrottle {
    async fn wait(&self, min_ms: u64, max_ms: u64) {
        self.waits.lock().unwrap().push((min_ms, max_ms));
    }

    fn draw(&self, min: u64, _max: u64) -> u64 {
        min
    }
}
