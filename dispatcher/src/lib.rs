//! # Paced Dispatcher Library
//!
//! Core library for delivering large ordered batches to downstream services
//! that enforce a maximum number of items per interval. A batch is split into
//! limit-sized chunks which are submitted one per pacing tick, with
//! cooperative cancellation and fail-fast error propagation.
//!
//! ## Modules
//!
//! - [`dispatch`] - Batch dispatcher, chunk planner, pacer and dispatch session
//! - [`cancellation`] - Cancellable dispatch context with optional deadline
//! - [`service`] - The downstream capability trait consumed by the dispatcher
//! - [`simulated`] - In-memory downstream used by tests and the simulator
//! - [`common`] - Error types and the item rate limiter

pub mod cancellation;
pub mod common;
pub mod dispatch;
pub mod service;
pub mod simulated;

pub use cancellation::Cancellation;
pub use common::{CancelReason, DispatchError, LimitsError};
pub use dispatch::{BatchDispatcher, Chunk, ChunkKind, ChunkPlan, DispatchState, Limits, Pacer};
pub use service::BatchService;
