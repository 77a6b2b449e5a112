//! Types shared across the dispatch components.

use crate::common::{DispatchError, LimitsError};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Downstream delivery limits: at most `chunk_size` items per `interval`.
///
/// A `chunk_size` of zero means the downstream has disabled delivery. This
/// is not an error: a dispatch against disabled limits succeeds without
/// sending anything.
///
/// # Examples
///
/// ```no_run
/// use dispatcher::Limits;
/// use std::time::Duration;
///
/// let limits = Limits::new(13, Duration::from_secs(1));
/// assert_eq!(limits.chunk_count(100), 8);
/// assert!(Limits::disabled().is_disabled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Limits {
    /// Maximum number of items per chunk (0 disables dispatch)
    pub chunk_size: usize,
    /// Minimum time between two consecutive chunks
    pub interval: Duration,
}

impl Limits {
    pub const fn new(chunk_size: usize, interval: Duration) -> Self {
        Self {
            chunk_size,
            interval,
        }
    }

    pub const fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.chunk_size == 0
    }

    /// The chunk size, or `None` when dispatch is disabled.
    pub fn chunk_size(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.chunk_size)
    }

    /// Number of chunks a batch of `len` items is split into.
    pub fn chunk_count(&self, len: usize) -> usize {
        self.chunk_size()
            .map_or(0, |chunk_size| len.div_ceil(chunk_size.get()))
    }

    /// Checks the limits can be paced. Disabled limits are always valid.
    pub fn validate(&self) -> Result<(), LimitsError> {
        if !self.is_disabled() && self.interval.is_zero() {
            return Err(LimitsError::ZeroInterval);
        }
        Ok(())
    }
}

/// Lifecycle of a single dispatch call.
///
/// `Idle -> Running -> {Succeeded, Failed, Cancelled}`; the last three are
/// terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl DispatchState {
    /// Terminal state corresponding to a dispatch outcome.
    pub fn of<E>(outcome: &Result<(), DispatchError<E>>) -> Self
    where
        E: std::error::Error + 'static,
    {
        match outcome {
            Ok(()) => DispatchState::Succeeded,
            Err(DispatchError::Cancelled(_)) => DispatchState::Cancelled,
            Err(_) => DispatchState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchState::Succeeded | DispatchState::Failed | DispatchState::Cancelled
        )
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Idle => "idle",
            DispatchState::Running => "running",
            DispatchState::Succeeded => "succeeded",
            DispatchState::Failed => "failed",
            DispatchState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
