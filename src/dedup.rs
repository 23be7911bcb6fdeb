use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::DEFAULT_DEDUP_THRESHOLD_SECONDS;
use crate::error::Result;
use crate::session::{DuplicateReason, SessionId, SessionStore, Touch};

/// Collapses hook invocations that land on the same session within
/// `threshold` seconds of each other into a single notification decision.
pub struct DedupGuard {
    threshold: f64,
    clock: fn() -> f64,
}

impl DedupGuard {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            clock: unix_now,
        }
    }

    pub fn with_clock(threshold: f64, clock: fn() -> f64) -> Self {
        Self { threshold, clock }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(&self, store: &SessionStore, id: &SessionId) -> Result<Touch> {
        let now = (self.clock)();
        let touch = store.compare_and_touch(id, now, self.threshold)?;
        match &touch {
            Touch::Proceed(_) => debug!(session = %id, now, "dedup: proceeding"),
            Touch::Duplicate(DuplicateReason::LockContended) => {
                debug!(session = %id, "dedup: session locked by another invocation, skipping")
            }
            Touch::Duplicate(DuplicateReason::WithinThreshold { elapsed }) => {
                debug!(session = %id, elapsed, threshold = self.threshold, "dedup: duplicate within threshold, skipping")
            }
        }
        Ok(touch)
    }
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_THRESHOLD_SECONDS)
    }
}

pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
