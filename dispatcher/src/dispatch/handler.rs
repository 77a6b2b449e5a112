use super::pacer::Pacer;
use super::planner::ChunkPlan;
use super::session::DispatchSession;
use super::types::DispatchState;
use crate::cancellation::Cancellation;
use crate::common::DispatchError;
use crate::service::BatchService;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Main coordinator for paced batch dispatch.
///
/// Each [`dispatch`](BatchDispatcher::dispatch) call queries the service's
/// limits once, then runs its chunking and pacing loop on a background task
/// and waits for that task's single result.
///
/// # Examples
///
/// ```no_run
/// use dispatcher::{BatchDispatcher, Cancellation, Limits};
/// use dispatcher::simulated::{SimulatedService, SimulatedServiceConfig};
/// use std::time::Duration;
///
/// # async fn run() {
/// let service = SimulatedService::<u32>::new(SimulatedServiceConfig::new(
///     Limits::new(13, Duration::from_secs(1)),
/// ));
/// let dispatcher = BatchDispatcher::new(service);
///
/// let batch: Vec<u32> = (0..100).collect();
/// let ctx = Cancellation::with_timeout(Duration::from_secs(30));
/// dispatcher.dispatch(&ctx, batch).await.expect("batch delivered");
/// # }
/// ```
pub struct BatchDispatcher<S: BatchService> {
    service: Arc<S>,
}

impl<S: BatchService> Clone for BatchDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: BatchService> std::fmt::Debug for BatchDispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher").finish_non_exhaustive()
    }
}

impl<S: BatchService> BatchDispatcher<S> {
    pub fn new(service: impl Into<Arc<S>>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Deliver `batch` to the service in paced chunks.
    ///
    /// Returns `Ok(())` when every chunk was processed, or when the service
    /// reports disabled limits (in which case nothing is sent). Otherwise
    /// returns the first error observed: a cancellation of `ctx`, or the
    /// service's error for the chunk that failed. No chunk after a failure is
    /// attempted.
    ///
    /// Dropping the returned future cancels the background task.
    pub async fn dispatch(
        &self,
        ctx: &Cancellation,
        batch: impl Into<Arc<[S::Item]>>,
    ) -> Result<(), DispatchError<S::Error>> {
        let batch: Arc<[S::Item]> = batch.into();
        let limits = self.service.limits();

        let Some(chunk_size) = limits.chunk_size() else {
            log::info!(
                "Dispatch disabled by downstream limits, {} items not sent",
                batch.len()
            );
            return Ok(());
        };
        limits.validate()?;

        let id = Uuid::new_v4();
        let plan = ChunkPlan::new(batch.len(), chunk_size);
        if plan.len() == 0 {
            log::debug!("Dispatch {id}: empty batch, nothing to send");
            return Ok(());
        }

        log::info!(
            "Dispatch {id}: starting delivery of {} items in {} chunks of up to {} every {:?}",
            batch.len(),
            plan.len(),
            chunk_size,
            limits.interval
        );
        log::debug!(
            "Dispatch {id}: {} -> {}",
            DispatchState::Idle,
            DispatchState::Running
        );

        let pacer = Pacer::start(limits.interval)?;
        let session_ctx = ctx.child();
        // Cancels the worker if this future is dropped before it reports.
        let worker_guard = session_ctx.token().clone().drop_guard();
        let session = DispatchSession::new(id, self.service.clone(), batch, session_ctx);

        let (result_tx, result_rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = session.run(plan, pacer).await;
            if result_tx.send(result).is_err() {
                log::debug!("Dispatch {id}: caller went away before the result was delivered");
            }
        });

        let result = match result_rx.await {
            Ok(result) => result,
            Err(_) => {
                log::error!("Dispatch {id}: worker ended without reporting a result");
                Err(DispatchError::WorkerLost)
            }
        };
        worker_guard.disarm();

        let state = DispatchState::of(&result);
        match &result {
            Ok(()) => log::info!("Dispatch {id}: {} -> {state}", DispatchState::Running),
            Err(e) => log::warn!("Dispatch {id}: {} -> {state}: {e}", DispatchState::Running),
        }
        result
    }
}
