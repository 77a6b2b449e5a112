//! The per-call chunking and pacing loop.

use super::pacer::Pacer;
use super::planner::{Chunk, ChunkKind, ChunkPlan};
use crate::cancellation::Cancellation;
use crate::common::DispatchError;
use crate::service::BatchService;
use std::sync::Arc;
use uuid::Uuid;

type SessionResult<S> = Result<(), DispatchError<<S as BatchService>::Error>>;

/// Ephemeral state of one dispatch call.
///
/// The offset cursor lives in the [`ChunkPlan`] handed to [`run`](DispatchSession::run)
/// and is advanced only after a chunk has been processed successfully.
pub struct DispatchSession<S: BatchService> {
    id: Uuid,
    service: Arc<S>,
    batch: Arc<[S::Item]>,
    ctx: Cancellation,
}

impl<S: BatchService> DispatchSession<S> {
    pub fn new(id: Uuid, service: Arc<S>, batch: Arc<[S::Item]>, ctx: Cancellation) -> Self {
        Self {
            id,
            service,
            batch,
            ctx,
        }
    }

    /// Deliver every window of `plan`, one per `pacer` tick.
    ///
    /// Consumes the pacer, so the timer is released on every return path.
    pub async fn run(self, mut plan: ChunkPlan, mut pacer: Pacer) -> SessionResult<S> {
        while let Some(chunk) = plan.current().filter(|c| c.kind == ChunkKind::Full) {
            // Skip the interval wait entirely when already cancelled.
            if let Some(reason) = self.ctx.reason() {
                log::warn!(
                    "Dispatch {}: cancelled before chunk {} ({reason})",
                    self.id,
                    chunk.index
                );
                return Err(DispatchError::Cancelled(reason));
            }

            self.wait_for_tick(&mut pacer, &chunk).await?;
            self.process(&chunk).await?;
            plan.advance();
        }

        if let Some(chunk) = plan.current() {
            self.wait_for_tick(&mut pacer, &chunk).await?;
            self.process(&chunk).await?;
            plan.advance();
        }

        log::debug!(
            "Dispatch {}: all {} items delivered after {} ticks",
            self.id,
            plan.offset(),
            pacer.ticks()
        );
        Ok(())
    }

    async fn wait_for_tick(&self, pacer: &mut Pacer, chunk: &Chunk) -> SessionResult<S> {
        tokio::select! {
            biased;
            reason = self.ctx.cancelled() => {
                log::warn!(
                    "Dispatch {}: cancelled while waiting to send chunk {} ({reason})",
                    self.id,
                    chunk.index
                );
                Err(DispatchError::Cancelled(reason))
            }
            _ = pacer.tick() => Ok(()),
        }
    }

    async fn process(&self, chunk: &Chunk) -> SessionResult<S> {
        log::debug!(
            "Dispatch {}: sending chunk {} (offset {}, {} items{})",
            self.id,
            chunk.index,
            chunk.offset(),
            chunk.len(),
            if chunk.is_remainder() { ", remainder" } else { "" }
        );

        self.service
            .process(&self.ctx, &self.batch[chunk.range.clone()])
            .await
            .map_err(|source| {
                log::error!(
                    "Dispatch {}: chunk {} at offset {} failed: {source}",
                    self.id,
                    chunk.index,
                    chunk.offset()
                );
                DispatchError::Process {
                    chunk: chunk.index,
                    source,
                }
            })
    }
}
