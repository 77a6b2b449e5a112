use crate::dispatch::Limits;
use governor::{
    InsufficientCapacity, Quota, RateLimiter as GovernorRateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Fraction of the interval (1/20th) a caller may run early without being rejected.
const JITTER_ALLOWANCE_DIVISOR: u32 = 20;

/// Item-based rate limiter enforcing a downstream `items per interval` policy.
///
/// Every item consumes one cell of a GCRA bucket whose burst equals the chunk
/// size, so a full chunk may be accepted once per interval. The replenish
/// period is shortened by a small jitter allowance so a caller pacing itself
/// on a timer is not rejected for firing a millisecond early.
pub struct RateLimiter {
    inner: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    capacity: NonZeroU32,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter admitting `limits.chunk_size` items per `limits.interval`.
    ///
    /// Returns `None` when the limits are disabled, when the chunk size does
    /// not fit a governor quota, or when the interval is too short to express.
    pub fn for_limits(limits: &Limits) -> Option<Self> {
        let capacity = u32::try_from(limits.chunk_size)
            .ok()
            .and_then(NonZeroU32::new)?;

        let allowance = limits.interval / JITTER_ALLOWANCE_DIVISOR;
        let cell_period = limits.interval.saturating_sub(allowance) / capacity.get();
        let quota = Quota::with_period(cell_period)?.allow_burst(capacity);

        Some(Self {
            inner: Arc::new(GovernorRateLimiter::direct(quota)),
            capacity,
        })
    }

    /// Maximum number of items admitted in a single burst.
    pub fn capacity(&self) -> u32 {
        self.capacity.get()
    }

    /// Check whether `items` items may be accepted right now, consuming
    /// capacity when they are.
    pub fn check_n(&self, items: usize) -> Result<(), RateLimitError> {
        let Ok(requested) = u32::try_from(items) else {
            return Err(RateLimitError::ExceedsCapacity {
                requested: items,
                capacity: self.capacity.get(),
            });
        };
        let Some(requested) = NonZeroU32::new(requested) else {
            return Ok(());
        };

        match self.inner.check_n(requested) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(not_until)) => {
                let wait_duration = not_until.wait_time_from(DefaultClock::default().now());
                Err(RateLimitError::TooManyRequests {
                    retry_after: wait_duration,
                })
            }
            Err(InsufficientCapacity(capacity)) => Err(RateLimitError::ExceedsCapacity {
                requested: items,
                capacity,
            }),
        }
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            capacity: self.capacity,
        }
    }
}

/// Rate limiting errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Too many items, retry after {retry_after:?}")]
    TooManyRequests { retry_after: Duration },
    #[error("Chunk of {requested} items exceeds the per-interval capacity of {capacity}")]
    ExceedsCapacity { requested: usize, capacity: u32 },
}
