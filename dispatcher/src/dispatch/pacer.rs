use crate::cancellation::instant_after;
use crate::common::LimitsError;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// RAII periodic timer pacing chunk submission.
///
/// The first tick fires one full period after acquisition, never immediately.
/// Missed ticks are delayed rather than bursted, so a slow downstream call is
/// followed by at most one tick and the next one is a full period later.
/// The timer is released when the pacer is dropped, whichever way the owning
/// dispatch ends.
pub struct Pacer {
    interval: Interval,
    period: Duration,
    ticks: u64,
    release_hook: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("period", &self.period)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Pacer {
    /// Acquire a pacer ticking every `period`. Must be called within a tokio runtime.
    pub fn start(period: Duration) -> Result<Self, LimitsError> {
        if period.is_zero() {
            return Err(LimitsError::ZeroInterval);
        }

        let mut interval = time::interval_at(instant_after(period), period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::debug!("Pacer acquired with period {period:?}");

        Ok(Self {
            interval,
            period,
            ticks: 0,
            release_hook: None,
        })
    }

    /// Run `hook` once when the pacer is released.
    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release_hook = Some(Box::new(hook));
        self
    }

    /// Wait for the next tick. Cancel safe.
    pub async fn tick(&mut self) -> Instant {
        let at = self.interval.tick().await;
        self.ticks += 1;
        at
    }

    /// Number of ticks observed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Explicitly stop the timer.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        if let Some(hook) = self.release_hook.take() {
            hook();
        }

        log::debug!("Pacer released after {} ticks", self.ticks);
    }
}
