//! Politeness delays between fetches.
//!
//! Every fetch waits `min_delay + base + jitter`, with jitter uniform in
//! `[-base/4, +base/4)`.

use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Applies the per-fetch delay. Stateless apart from its floor.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    min_delay: Duration,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self { min_delay }
    }

    /// Sample a delay for a fetch whose page kind has jitter base `base`.
    pub fn delay(&self, base: Duration) -> Duration {
        let quarter = jitter_bound(base);
        let offset = if quarter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(-quarter..quarter)
        };
        jittered(self.min_delay, base, offset)
    }

    /// Sleep before a fetch.
    pub async fn pause(&self, base: Duration) {
        let delay = self.delay(base);
        trace!(delay_ms = delay.as_millis() as u64, "Pacing");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Largest jitter magnitude, in milliseconds.
fn jitter_bound(base: Duration) -> i64 {
    i64::try_from(base.as_millis() / 4).unwrap_or(i64::MAX)
}

/// `min + base + offset_ms`, never below `min`.
pub fn jittered(min: Duration, base: Duration, offset_ms: i64) -> Duration {
    let base_ms = i64::try_from(base.as_millis()).unwrap_or(i64::MAX);
    let extra = base_ms.saturating_add(offset_ms).max(0);
    min + Duration::from_millis(extra as u64)
}
