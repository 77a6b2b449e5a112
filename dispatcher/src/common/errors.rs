use std::fmt;
use thiserror::Error;

/// Why a dispatch context stopped being live.
///
/// Explicit cancellation takes precedence: when a context has been cancelled
/// and its deadline has also passed, the reason is [`CancelReason::Cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The cancellation token was triggered.
    Cancelled,
    /// The context deadline passed before the dispatch completed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "context cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

/// Limits supplied by a downstream service that the dispatcher cannot honour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    /// A non-zero chunk size was paired with a zero pacing interval.
    #[error("Pacing interval must be greater than zero when dispatch is enabled")]
    ZeroInterval,
}

/// Errors produced by a single dispatch call.
///
/// A dispatch terminates on the first error it observes. Exactly one of these
/// is returned per failed call, and none of them carry information about how
/// many chunks were delivered before the failure.
///
/// # Error Categories
///
/// ## Context Errors
/// - [`Cancelled`] - The dispatch context was cancelled or its deadline passed
///
/// ## Downstream Errors
/// - [`Process`] - The downstream service rejected a chunk; carries its error verbatim
/// - [`InvalidLimits`] - The downstream service supplied unusable limits
///
/// ## Runtime Errors
/// - [`WorkerLost`] - The background dispatch task ended without a result
///
/// # Examples
///
/// ```no_run
/// use dispatcher::{BatchDispatcher, Cancellation, DispatchError};
///
/// async fn deliver<S: dispatcher::BatchService>(
///     dispatcher: &BatchDispatcher<S>,
///     batch: Vec<S::Item>,
/// ) {
///     match dispatcher.dispatch(&Cancellation::new(), batch).await {
///         Ok(()) => log::info!("Batch delivered"),
///         Err(DispatchError::Cancelled(reason)) => log::warn!("Stopped early: {reason}"),
///         Err(DispatchError::Process { chunk, source }) => {
///             log::error!("Chunk {chunk} rejected: {source}");
///         }
///         Err(other) => log::error!("Dispatch failed: {other}"),
///     }
/// }
/// ```
///
/// [`Cancelled`]: DispatchError::Cancelled
/// [`Process`]: DispatchError::Process
/// [`InvalidLimits`]: DispatchError::InvalidLimits
/// [`WorkerLost`]: DispatchError::WorkerLost
#[derive(Debug, Error)]
pub enum DispatchError<E>
where
    E: std::error::Error + 'static,
{
    /// The context was cancelled, either before waiting for the next pacing
    /// tick or while waiting for it. No further chunks were attempted.
    #[error("Dispatch stopped: {0}")]
    Cancelled(CancelReason),

    /// The downstream service failed to process the chunk at index `chunk`.
    /// Later chunks were never attempted.
    #[error("Processing chunk {chunk} failed: {source}")]
    Process {
        chunk: usize,
        #[source]
        source: E,
    },

    /// The downstream service supplied limits the dispatcher cannot pace.
    #[error("Invalid dispatch limits: {0}")]
    InvalidLimits(#[from] LimitsError),

    /// The background task driving the dispatch ended without reporting.
    #[error("Dispatch worker ended without reporting a result")]
    WorkerLost,
}

impl<E> DispatchError<E>
where
    E: std::error::Error + 'static,
{
    /// Returns `true` for context cancellation and deadline expiry.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled(_))
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            DispatchError::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Index of the chunk whose processing failed, if this is a processing error.
    pub fn failed_chunk(&self) -> Option<usize> {
        match self {
            DispatchError::Process { chunk, .. } => Some(*chunk),
            _ => None,
        }
    }

    pub fn process_error(&self) -> Option<&E> {
        match self {
            DispatchError::Process { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Consumes the error, returning the downstream error exactly as it was
    /// produced by the service.
    pub fn into_process_error(self) -> Option<E> {
        match self {
            DispatchError::Process { source, .. } => Some(source),
            _ => None,
        }
    }
}
