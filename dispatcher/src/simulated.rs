//! In-memory downstream service.
//!
//! [`SimulatedService`] stands in for a real rate-limited downstream. It can
//! enforce its advertised limits with a [`RateLimiter`], add per-call latency,
//! and fail a chosen chunk, and it records every invocation so callers can
//! inspect exactly what was delivered and when.

use crate::cancellation::Cancellation;
use crate::common::{CancelReason, RateLimitError, RateLimiter};
use crate::dispatch::Limits;
use crate::service::BatchService;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Behaviour of a [`SimulatedService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedServiceConfig {
    /// Limits advertised to the dispatcher
    pub limits: Limits,
    /// Time each `process` call takes before it completes
    pub latency: Duration,
    /// Zero-based chunk index whose processing fails
    pub fail_at_chunk: Option<usize>,
    /// Reject chunks arriving faster than `limits` allow
    pub enforce_quota: bool,
}

impl SimulatedServiceConfig {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            latency: Duration::ZERO,
            fail_at_chunk: None,
            enforce_quota: false,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_at(mut self, chunk: usize) -> Self {
        self.fail_at_chunk = Some(chunk);
        self
    }

    pub fn enforcing_quota(mut self) -> Self {
        self.enforce_quota = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatedError {
    #[error("Chunk {chunk} rejected by downstream rate limit: {source}")]
    RateLimited {
        chunk: usize,
        #[source]
        source: RateLimitError,
    },
    #[error("Chunk {chunk} failed: injected downstream failure")]
    Injected { chunk: usize },
    #[error("Chunk {chunk} interrupted: {reason}")]
    Interrupted { chunk: usize, reason: CancelReason },
}

/// One call to [`SimulatedService::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<T> {
    pub at: Instant,
    pub items: Vec<T>,
    /// Whether the call completed successfully
    pub accepted: bool,
}

/// Recording downstream service.
pub struct SimulatedService<T> {
    config: SimulatedServiceConfig,
    limiter: Option<RateLimiter>,
    invocations: Mutex<Vec<Invocation<T>>>,
}

impl<T> std::fmt::Debug for SimulatedService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedService")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> SimulatedService<T> {
    pub fn new(config: SimulatedServiceConfig) -> Self {
        let limiter = if config.enforce_quota {
            RateLimiter::for_limits(&config.limits)
        } else {
            None
        };

        Self {
            config,
            limiter,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SimulatedServiceConfig {
        &self.config
    }

    /// Number of `process` calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.lock().len()
    }

    /// Every call in arrival order, including failed ones.
    pub fn invocations(&self) -> Vec<Invocation<T>> {
        self.lock().clone()
    }

    /// Chunks that were accepted, in arrival order.
    pub fn received(&self) -> Vec<Vec<T>> {
        self.lock()
            .iter()
            .filter(|invocation| invocation.accepted)
            .map(|invocation| invocation.items.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Invocation<T>>> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, chunk: &[T]) -> usize {
        let mut invocations = self.lock();
        invocations.push(Invocation {
            at: Instant::now(),
            items: chunk.to_vec(),
            accepted: false,
        });
        invocations.len() - 1
    }

    fn accept(&self, index: usize) {
        if let Some(invocation) = self.lock().get_mut(index) {
            invocation.accepted = true;
        }
    }
}

#[async_trait]
impl<T> BatchService for SimulatedService<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;
    type Error = SimulatedError;

    fn limits(&self) -> Limits {
        self.config.limits
    }

    async fn process(&self, ctx: &Cancellation, chunk: &[T]) -> Result<(), SimulatedError> {
        let index = self.record(chunk);

        if let Some(limiter) = &self.limiter {
            limiter
                .check_n(chunk.len())
                .map_err(|source| SimulatedError::RateLimited {
                    chunk: index,
                    source,
                })?;
        }

        if !self.config.latency.is_zero() {
            tokio::select! {
                biased;
                reason = ctx.cancelled() => {
                    return Err(SimulatedError::Interrupted { chunk: index, reason });
                }
                () = sleep(self.config.latency) => {}
            }
        }

        if self.config.fail_at_chunk == Some(index) {
            return Err(SimulatedError::Injected { chunk: index });
        }

        self.accept(index);
        log::trace!("Simulated downstream accepted chunk {index} ({} items)", chunk.len());
        Ok(())
    }
}
