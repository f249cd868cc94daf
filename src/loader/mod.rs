//! Scroll-driven lazy loading and the stabilisation loop.

use tracing::debug;

use crate::scraper::throttle::Throttle;
use crate::scraper::{DriverError, PageDriver};

/// Scroll iterations per `load`, drawn per call.
pub const SCROLL_ITERATIONS: (u64, u64) = (10, 20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollProfile {
    /// Exploratory bulk loading.
    Slow,
    /// Light settle after UI actions.
    Fast,
}

impl ScrollProfile {
    /// Per-iteration pause bounds in ms.
    pub fn pause_ms(self) -> (u64, u64) {
        match self {
            ScrollProfile::Slow => (1000, 5000),
            ScrollProfile::Fast => (1000, 1040),
        }
    }
}

pub struct ScrollLoader<'a, P, T> {
    page: &'a P,
    throttle: &'a T,
}

impl<'a, P: PageDriver, T: Throttle> ScrollLoader<'a, P, T> {
    pub fn new(page: &'a P, throttle: &'a T) -> Self {
        Self { page, throttle }
    }

    /// Scroll to the bottom and pause, repeated a random number of times.
    pub async fn load(&self, profile: ScrollProfile) -> Result<(), DriverError> {
        let (lo, hi) = SCROLL_ITERATIONS;
        let rounds = self.throttle.draw(lo, hi);
        let (min_ms, max_ms) = profile.pause_ms();
        for _ in 0..rounds {
            self.page.scroll_to_bottom().await?;
            self.throttle.wait(min_ms, max_ms).await;
        }
        Ok(())
    }

    /// Keep loading while the number of `selector` matches grows.
    ///
    /// With a `bound`, stops once the count is at least `bound` (inclusive:
    /// exactly `bound` rendered items is enough), after one extra fast
    /// settle. Without one, a feed that never stops growing keeps this
    /// looping.
    pub async fn load_until_stable(
        &self,
        selector: &str,
        bound: Option<usize>,
    ) -> Result<Stabilised, DriverError> {
        let mut count = self.page.query_all(selector, None).await?.len();
        let mut rounds = 0usize;

        loop {
            if let Some(b) = bound
                && count >= b
            {
                debug!("upper bound {} reached with {} items", b, count);
                self.load(ScrollProfile::Fast).await?;
                return Ok(Stabilised { count, rounds, bounded: true });
            }

            debug!("found {} items so far, loading more", count);
            self.load(ScrollProfile::Slow).await?;
            rounds += 1;

            let next = self.page.query_all(selector, None).await?.len();
            debug!("{} to {}", count, next);
            let grew = next > count;
            count = next;
            if !grew {
                return Ok(Stabilised { count, rounds, bounded: false });
            }
        }
    }
}

/// Outcome of the stabilisation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stabilised {
    /// Items rendered when the loop exited.
    pub count: usize,
    /// Slow `load` calls issued.
    pub rounds: usize,
    pub bounded: bool,
}
