//! Paced batch dispatch
//!
//! This module splits a batch into limit-sized chunks and hands them to a
//! downstream [`BatchService`](crate::service::BatchService) one pacing tick at a time.
//! It is organised into several components:
//!
//! - `types`: Downstream limits and dispatch lifecycle states
//! - `planner`: Pure computation of chunk boundaries
//! - `pacer`: Scoped periodic timer released on every exit path
//! - `session`: The per-call chunking and pacing loop
//! - `handler`: Main coordinator that queries limits and runs sessions

pub mod handler;
pub mod pacer;
pub mod planner;
pub mod session;
pub mod types;

pub use handler::BatchDispatcher;
pub use pacer::Pacer;
pub use planner::{Chunk, ChunkKind, ChunkPlan};
pub use types::{DispatchState, Limits};
