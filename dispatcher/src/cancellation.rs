//! Cancellable dispatch context.
//!
//! A [`Cancellation`] pairs a [`CancellationToken`] with an optional deadline.
//! It supports the two distinct kinds of checks the dispatcher performs: a
//! non-blocking [`is_cancelled`](Cancellation::is_cancelled) probe, and an
//! awaitable [`cancelled`](Cancellation::cancelled) future that can be raced
//! against other work.

use crate::common::CancelReason;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Stand-in for "never" when a delay does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, saturating to roughly thirty years out on overflow.
pub(crate) fn instant_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Cancellation token with an optional deadline.
///
/// Cloning shares the underlying token: cancelling any clone cancels all of
/// them. Use [`child`](Cancellation::child) for a scope that can be cancelled
/// on its own without affecting its parent.
///
/// # Examples
///
/// ```no_run
/// use dispatcher::Cancellation;
/// use std::time::Duration;
///
/// let ctx = Cancellation::with_timeout(Duration::from_secs(30));
/// let shutdown = ctx.clone();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A context that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::new().deadline_at(deadline)
    }

    /// A context that expires `timeout` from now. Timeouts too large to
    /// represent saturate to a far-future deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(instant_after(timeout))
    }

    /// Sets the deadline, keeping the earlier one if a deadline already exists.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// A context cancelled whenever this one is, that inherits the deadline
    /// and can additionally be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Why the context is no longer live, or `None` while it still is.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    ///
    /// Cancel safe; an already cancelled token wins over a passed deadline.
    pub async fn cancelled(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => CancelReason::Cancelled,
                    () = sleep_until(deadline) => CancelReason::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }
}
