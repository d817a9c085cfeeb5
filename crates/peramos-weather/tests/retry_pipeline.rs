//! Retry and cache behaviour driven by scripted fetchers.
//!
//! No network or real sleeping: the fetcher replays a fixed script and the
//! delay only counts how often it was asked to wait.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use peramos_core::NetworkError;
use peramos_weather::{
    Clock, Delay, Fetch, FetchOutcome, ManualClock, ReadingExtractor, ReportCache,
    ReportFormatter, ReportOutcome, ReportPipeline, RetryPolicy, EXHAUSTED_MESSAGE,
};

const GOOD_PAGE: &str = r#"<html><body>
<div class="lleft">Temp</div><div class="lleft">Humidity</div>
<div class="lright">18.5C</div><div class="lright">62%</div>
</body></html>"#;

const EMPTY_PAGE: &str = "<html><body><p>Updating...</p></body></html>";

/// Replays outcomes in order; repeats the last one when the script runs out.
#[derive(Clone)]
struct ScriptedFetcher {
    script: Arc<Mutex<VecDeque<FetchOutcome>>>,
    last: FetchOutcome,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    fn new(script: Vec<FetchOutcome>) -> Self {
        let last = script
            .last()
            .cloned()
            .unwrap_or_else(|| Err(NetworkError::Timeout));
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn always(outcome: FetchOutcome) -> Self {
        Self::new(vec![outcome])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for ScriptedFetcher {
    async fn fetch(&self) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.last.clone())
    }
}

#[derive(Clone, Default)]
struct RecordingDelay {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    fn count(&self) -> usize {
        self.waits.lock().len()
    }
}

impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().push(duration);
    }
}

fn ok(page: &str) -> FetchOutcome {
    Ok(page.as_bytes().to_vec())
}

fn pipeline(
    fetcher: &ScriptedFetcher,
    delay: &RecordingDelay,
    clock: Arc<dyn Clock>,
) -> ReportPipeline<ScriptedFetcher, RecordingDelay> {
    ReportPipeline::new(
        fetcher.clone(),
        ReadingExtractor::new("div.lleft", "div.lright").unwrap(),
        ReportFormatter::new("Nea Peramos", "penteli.meteo.gr"),
        RetryPolicy::new(3, Duration::from_secs(2)),
        delay.clone(),
        clock,
    )
}

#[tokio::test]
async fn test_succeeds_on_third_attempt_after_two_delays() {
    let fetcher = ScriptedFetcher::new(vec![
        Err(NetworkError::Timeout),
        Err(NetworkError::ConnectionFailed("connection reset".into())),
        ok(GOOD_PAGE),
    ]);
    let delay = RecordingDelay::default();
    let clock = Arc::new(ManualClock::default());
    let pipeline = pipeline(&fetcher, &delay, clock.clone());

    let outcome = pipeline.get_report().await;

    let extractor = ReadingExtractor::new("div.lleft", "div.lright").unwrap();
    let report = peramos_weather::Report::new(extractor.extract(GOOD_PAGE.as_bytes()), clock.now());
    let expected = ReportFormatter::new("Nea Peramos", "penteli.meteo.gr").render(report.as_ref());

    assert_eq!(outcome, ReportOutcome::Ready(expected));
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(delay.count(), 2);
    assert!(delay.waits.lock().iter().all(|d| *d == Duration::from_secs(2)));
}

#[tokio::test]
async fn test_always_failing_fetch_exhausts_after_three_attempts() {
    let fetcher = ScriptedFetcher::always(Err(NetworkError::HttpStatus {
        status: 503,
        reason: "Service Unavailable".into(),
    }));
    let delay = RecordingDelay::default();
    let pipeline = pipeline(&fetcher, &delay, Arc::new(ManualClock::default()));

    let outcome = pipeline.get_report().await;

    assert_eq!(outcome, ReportOutcome::Exhausted);
    assert_eq!(outcome.into_message(), EXHAUSTED_MESSAGE);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(delay.count(), 2);
}

#[tokio::test]
async fn test_empty_page_is_retried_like_a_failure() {
    let fetcher = ScriptedFetcher::new(vec![ok(EMPTY_PAGE), ok(GOOD_PAGE)]);
    let delay = RecordingDelay::default();
    let pipeline = pipeline(&fetcher, &delay, Arc::new(ManualClock::default()));

    let outcome = pipeline.get_report().await;

    assert!(outcome.is_cacheable());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(delay.count(), 1);
}

#[tokio::test]
async fn test_persistently_empty_page_exhausts() {
    let fetcher = ScriptedFetcher::always(ok(EMPTY_PAGE));
    let delay = RecordingDelay::default();
    let pipeline = pipeline(&fetcher, &delay, Arc::new(ManualClock::default()));

    assert_eq!(pipeline.get_report().await, ReportOutcome::Exhausted);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_first_attempt_success_never_waits() {
    let fetcher = ScriptedFetcher::always(ok(GOOD_PAGE));
    let delay = RecordingDelay::default();
    let pipeline = pipeline(&fetcher, &delay, Arc::new(ManualClock::default()));

    let message = pipeline.get_report().await.into_message();

    assert!(message.contains("Temp: 18.5C"));
    assert!(message.contains("Humidity: 62%"));
    assert_eq!(delay.count(), 0);
}

#[tokio::test]
async fn test_cache_in_front_of_pipeline() {
    let fetcher = ScriptedFetcher::always(ok(GOOD_PAGE));
    let delay = RecordingDelay::default();
    let clock = Arc::new(ManualClock::default());
    let pipeline = pipeline(&fetcher, &delay, clock.clone());
    let cache = ReportCache::new(clock.clone(), Duration::from_secs(300));

    let first = cache.get_or_refresh(|| pipeline.get_report()).await;
    clock.advance(chrono::TimeDelta::seconds(120));
    let second = cache.get_or_refresh(|| pipeline.get_report()).await;

    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 1);

    clock.advance(chrono::TimeDelta::seconds(300));
    cache.get_or_refresh(|| pipeline.get_report()).await;
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_exhaustion_is_not_cached_by_pipeline_cache() {
    let fetcher = ScriptedFetcher::new(vec![
        Err(NetworkError::Timeout),
        Err(NetworkError::Timeout),
        Err(NetworkError::Timeout),
        ok(GOOD_PAGE),
    ]);
    let delay = RecordingDelay::default();
    let clock = Arc::new(ManualClock::default());
    let pipeline = pipeline(&fetcher, &delay, clock.clone());
    let cache = ReportCache::new(clock, Duration::from_secs(300));

    let first = cache.get_or_refresh(|| pipeline.get_report()).await;
    assert_eq!(first, EXHAUSTED_MESSAGE);

    let second = cache.get_or_refresh(|| pipeline.get_report()).await;
    assert!(second.contains("Temp: 18.5C"));
    assert_eq!(fetcher.calls(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_coalesce_into_one_refresh() {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
    let cache = Arc::new(ReportCache::new(clock, Duration::from_secs(300)));
    let refreshes = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let refreshes = refreshes.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_refresh(|| async move {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    ReportOutcome::Ready("report".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "report");
    }
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}
