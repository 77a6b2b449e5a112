use crate::cancellation::Cancellation;
use crate::dispatch::Limits;
use async_trait::async_trait;

/// Downstream capability that receives paced chunks.
///
/// The service owns its own limit policy and transport; the dispatcher only
/// asks it for limits once per dispatch and then hands it chunks.
///
/// Within one dispatch, [`process`](BatchService::process) is called once per
/// chunk, in increasing offset order, never concurrently, and never retried.
/// Separate dispatches against the same service are not serialized: a service
/// that is not safe for concurrent use must not be dispatched to concurrently.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use dispatcher::{BatchService, Cancellation, Limits};
/// use std::time::Duration;
///
/// struct Webhook {
///     client: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl BatchService for Webhook {
///     type Item = String;
///     type Error = reqwest::Error;
///
///     fn limits(&self) -> Limits {
///         Limits::new(50, Duration::from_secs(1))
///     }
///
///     async fn process(
///         &self,
///         _ctx: &Cancellation,
///         chunk: &[String],
///     ) -> Result<(), reqwest::Error> {
///         self.client
///             .post("https://example.invalid/events")
///             .json(chunk)
///             .send()
///             .await?
///             .error_for_status()?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait BatchService: Send + Sync + 'static {
    /// Element type of the batches this service accepts.
    type Item: Send + Sync + 'static;

    /// Error reported for a rejected chunk. Returned to the dispatch caller unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current delivery limits. Queried exactly once per dispatch.
    fn limits(&self) -> Limits;

    /// Deliver one chunk.
    ///
    /// `ctx` is the dispatch context; implementations may use it to abandon
    /// long-running work early.
    async fn process(&self, ctx: &Cancellation, chunk: &[Self::Item]) -> Result<(), Self::Error>;
}
