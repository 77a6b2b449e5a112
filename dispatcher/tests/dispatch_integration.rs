use async_trait::async_trait;
use claims::*;
use dispatcher::simulated::{SimulatedError, SimulatedService, SimulatedServiceConfig};
use dispatcher::{BatchDispatcher, BatchService, CancelReason, Cancellation, DispatchError, Limits};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};

// Helper module for dispatch scenarios
mod dispatch_helpers {
    use super::*;

    pub fn dispatcher(config: SimulatedServiceConfig) -> BatchDispatcher<SimulatedService<u32>> {
        BatchDispatcher::new(SimulatedService::new(config))
    }

    pub fn limits(chunk_size: usize, interval: Duration) -> SimulatedServiceConfig {
        SimulatedServiceConfig::new(Limits::new(chunk_size, interval))
    }

    pub fn batch(len: u32) -> Vec<u32> {
        (0..len).collect()
    }

    /// Service counting how often its limits are queried.
    pub struct CountingLimits {
        pub queries: AtomicUsize,
        pub limits: Limits,
    }

    #[async_trait]
    impl BatchService for CountingLimits {
        type Item = u32;
        type Error = std::io::Error;

        fn limits(&self) -> Limits {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.limits
        }

        async fn process(&self, _ctx: &Cancellation, _chunk: &[u32]) -> Result<(), std::io::Error> {
            Ok(())
        }
    }

    /// Service that panics while processing.
    pub struct Panicking;

    #[async_trait]
    impl BatchService for Panicking {
        type Item = u32;
        type Error = std::io::Error;

        fn limits(&self) -> Limits {
            Limits::new(2, Duration::from_secs(1))
        }

        async fn process(&self, _ctx: &Cancellation, _chunk: &[u32]) -> Result<(), std::io::Error> {
            panic!("downstream exploded");
        }
    }
}

use dispatch_helpers::*;

mod scenarios {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_all_ok_thirteen_items_per_second() {
        let dispatcher = dispatcher(limits(13, Duration::from_secs(1)));
        let started = Instant::now();

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(100)).await);

        let service = dispatcher.service();
        assert_eq!(service.calls(), 8);

        let received = service.received();
        let sizes: Vec<usize> = received.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![13, 13, 13, 13, 13, 13, 13, 9]);

        let offsets: Vec<u32> = received.iter().map(|chunk| chunk[0]).collect();
        assert_eq!(offsets, vec![0, 13, 26, 39, 52, 65, 78, 91]);

        let flattened: Vec<u32> = received.into_iter().flatten().collect();
        assert_eq!(flattened, batch(100));

        // One tick per chunk, the first one a full interval after start.
        assert!(started.elapsed() >= Duration::from_secs(8));
        assert!(started.elapsed() < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_chunk_size_disables_dispatch() {
        let dispatcher = dispatcher(limits(0, Duration::from_secs(120)));
        let started = Instant::now();

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(66)).await);

        assert_eq!(dispatcher.service().calls(), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_before_first_tick() {
        let dispatcher = dispatcher(limits(12, Duration::from_secs(120)));
        let ctx = Cancellation::with_timeout(Duration::from_secs(1));
        let started = Instant::now();

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(100)).await);

        assert_matches!(error, DispatchError::Cancelled(CancelReason::DeadlineExceeded));
        assert_eq!(dispatcher.service().calls(), 0);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_error_on_fifth_chunk() {
        let dispatcher = dispatcher(limits(13, Duration::from_secs(1)).failing_at(4));

        let error = assert_err!(dispatcher.dispatch(&Cancellation::new(), batch(100)).await);

        assert_eq!(error.failed_chunk(), Some(4));
        assert_eq!(
            error.into_process_error(),
            Some(SimulatedError::Injected { chunk: 4 })
        );
        assert_eq!(dispatcher.service().calls(), 5);
        assert_eq!(dispatcher.service().received().len(), 4);
    }
}

mod edge_cases {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_short_batch_sent_as_remainder_after_one_tick() {
        let dispatcher = dispatcher(limits(13, Duration::from_secs(3)));
        let started = Instant::now();

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(5)).await);

        assert_eq!(dispatcher.service().received(), vec![batch(5)]);
        let invocations = dispatcher.service().invocations();
        assert_eq!(invocations[0].at - started, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_multiple_sends_no_empty_remainder() {
        let dispatcher = dispatcher(limits(10, Duration::from_secs(1)));

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(30)).await);

        let sizes: Vec<usize> = dispatcher.service().received().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_returns_without_waiting() {
        let dispatcher = dispatcher(limits(10, Duration::from_secs(60)));
        let started = Instant::now();

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), Vec::<u32>::new()).await);

        assert_eq!(dispatcher.service().calls(), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_rejected() {
        let dispatcher = dispatcher(limits(10, Duration::ZERO));

        let error = assert_err!(dispatcher.dispatch(&Cancellation::new(), batch(30)).await);

        assert_matches!(error, DispatchError::InvalidLimits(_));
        assert_eq!(dispatcher.service().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limits_queried_once_per_dispatch() {
        let service = Arc::new(CountingLimits {
            queries: AtomicUsize::new(0),
            limits: Limits::new(3, Duration::from_millis(10)),
        });
        let dispatcher = BatchDispatcher::<CountingLimits>::new(service.clone());

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(20)).await);
        assert_eq!(service.queries.load(Ordering::SeqCst), 1);

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(20)).await);
        assert_eq!(service.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_worker_reports_worker_lost() {
        let dispatcher = BatchDispatcher::<Panicking>::new(Panicking);

        let error = assert_err!(dispatcher.dispatch(&Cancellation::new(), batch(4)).await);

        assert_matches!(error, DispatchError::WorkerLost);
    }
}

mod cancellation {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_skips_interval_wait() {
        let dispatcher = dispatcher(limits(10, Duration::from_secs(60)));
        let ctx = Cancellation::new();
        ctx.cancel();
        let started = Instant::now();

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(100)).await);

        assert_eq!(error.cancel_reason(), Some(CancelReason::Cancelled));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(dispatcher.service().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_interval_still_honours_cancellation() {
        let dispatcher = dispatcher(limits(4, Duration::MAX));
        let ctx = Cancellation::new();
        ctx.cancel();

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(5)).await);

        assert_matches!(error, DispatchError::Cancelled(CancelReason::Cancelled));
        assert_eq!(dispatcher.service().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_interval_runs_into_deadline() {
        let dispatcher = dispatcher(limits(4, Duration::MAX));
        let ctx = Cancellation::with_timeout(Duration::from_secs(5));

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(9)).await);

        assert_matches!(error, DispatchError::Cancelled(CancelReason::DeadlineExceeded));
        assert_eq!(dispatcher.service().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_remainder_wait_wins_race() {
        let dispatcher = dispatcher(limits(10, Duration::from_secs(1)));
        let ctx = Cancellation::new();
        ctx.cancel();

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(4)).await);

        assert!(error.is_cancelled());
        assert_eq!(dispatcher.service().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_ticks_stops_later_chunks() {
        let dispatcher = dispatcher(limits(10, Duration::from_secs(1)));
        let ctx = Cancellation::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(100)).await);

        assert_matches!(error, DispatchError::Cancelled(CancelReason::Cancelled));
        assert_eq!(dispatcher.service().calls(), 2);
        let expected: Vec<Vec<u32>> = vec![(0..10).collect(), (10..20).collect()];
        assert_eq!(dispatcher.service().received(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_mid_run() {
        let dispatcher = dispatcher(limits(7, Duration::from_secs(1)));
        let ctx = Cancellation::with_timeout(Duration::from_millis(3500));

        let error = assert_err!(dispatcher.dispatch(&ctx, batch(50)).await);

        assert_eq!(error.cancel_reason(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(dispatcher.service().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_dispatch_future_stops_worker() {
        let dispatcher = dispatcher(limits(5, Duration::from_secs(1)));
        let ctx = Cancellation::new();

        let dispatch = dispatcher.dispatch(&ctx, batch(50));
        assert_err!(timeout(Duration::from_millis(1500), dispatch).await);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(dispatcher.service().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_context_not_cancelled_by_dispatch() {
        let dispatcher = dispatcher(limits(5, Duration::from_secs(1)));
        let ctx = Cancellation::new();

        let dispatch = dispatcher.dispatch(&ctx, batch(50));
        assert_err!(timeout(Duration::from_millis(1500), dispatch).await);

        assert!(!ctx.is_cancelled());
    }
}

mod pacing {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_at_least_one_interval_apart() {
        let interval = Duration::from_millis(250);
        let dispatcher = dispatcher(limits(4, interval));

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(37)).await);

        let invocations = dispatcher.service().invocations();
        assert_eq!(invocations.len(), 10);
        for pair in invocations.windows(2) {
            assert!(pair[1].at - pair[0].at >= interval);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_downstream_does_not_cause_bursts() {
        let interval = Duration::from_secs(1);
        let dispatcher = dispatcher(limits(4, interval).with_latency(Duration::from_millis(1700)));

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(20)).await);

        let invocations = dispatcher.service().invocations();
        assert_eq!(invocations.len(), 5);
        for pair in invocations.windows(2) {
            assert!(pair[1].at - pair[0].at >= interval);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_dispatches_are_independent() {
        let first = dispatcher(limits(5, Duration::from_secs(1)));
        let second = dispatcher(limits(3, Duration::from_secs(2)).failing_at(0));

        let ctx = Cancellation::new();

        let (a, b) = tokio::join!(
            first.dispatch(&ctx, batch(12)),
            second.dispatch(&ctx, batch(12)),
        );

        assert_ok!(a);
        assert_err!(b);
        assert_eq!(first.service().calls(), 3);
        assert_eq!(second.service().calls(), 1);
    }
}

// Runs on the wall clock: the downstream quota is tracked by governor, not tokio time.
mod downstream_quota {
    use super::*;

    #[tokio::test]
    async fn test_paced_dispatch_stays_within_quota() {
        let dispatcher = dispatcher(limits(4, Duration::from_millis(200)).enforcing_quota());

        assert_ok!(dispatcher.dispatch(&Cancellation::new(), batch(18)).await);

        let service = dispatcher.service();
        assert_eq!(service.calls(), 5);
        assert_eq!(service.received().len(), 5);
    }

    #[tokio::test]
    async fn test_unpaced_burst_is_rejected_by_quota() {
        let service: SimulatedService<u32> =
            SimulatedService::new(limits(4, Duration::from_millis(200)).enforcing_quota());
        let ctx = Cancellation::new();

        assert_ok!(service.process(&ctx, &[0, 1, 2, 3]).await);
        let error = assert_err!(service.process(&ctx, &[4, 5, 6, 7]).await);

        assert_matches!(error, SimulatedError::RateLimited { chunk: 1, .. });
    }
}
