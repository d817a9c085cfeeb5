//! Single-slot cache for the last good report.
//!
//! The slot holds the formatted report and the instant it was produced. It is
//! served while younger than the TTL and replaced only by a successful
//! refresh; failures are returned to the caller but never stored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::types::ReportOutcome;

/// Default freshness window
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Live suffix appended to served reports, computed at read time
pub type Annotation = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Debug, Clone)]
struct CacheEntry {
    report: String,
    created_at: DateTime<Utc>,
}

pub struct ReportCache {
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    slot: Mutex<Option<CacheEntry>>,
    // Serializes refreshes so a burst of misses hits the station once.
    refresh_gate: tokio::sync::Mutex<()>,
    annotation: Option<Annotation>,
}

impl ReportCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            slot: Mutex::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            annotation: None,
        }
    }

    /// Append a live suffix (e.g. memory usage) to every served report.
    pub fn with_annotation<A>(mut self, annotation: A) -> Self
    where
        A: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.annotation = Some(Arc::new(annotation));
        self
    }

    /// The stored report if it is still fresh, without annotation.
    pub fn peek(&self) -> Option<String> {
        self.fresh(self.clock.now())
    }

    /// Serve the cached report while fresh, otherwise run `refresh`.
    ///
    /// Only [`ReportOutcome::Ready`] results are stored, timestamped with the
    /// clock reading taken before the refresh started.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ReportOutcome>,
    {
        if let Some(report) = self.fresh(self.clock.now()) {
            tracing::debug!("Report cache hit");
            return self.annotate(report);
        }

        let _gate = self.refresh_gate.lock().await;

        let now = self.clock.now();
        if let Some(report) = self.fresh(now) {
            tracing::debug!("Report refreshed by a concurrent request");
            return self.annotate(report);
        }

        tracing::debug!("Report cache miss, refreshing");
        match refresh().await {
            ReportOutcome::Ready(report) => {
                *self.slot.lock() = Some(CacheEntry {
                    report: report.clone(),
                    created_at: now,
                });
                self.annotate(report)
            }
            outcome => {
                tracing::warn!("Refresh failed, keeping previous cache state");
                outcome.into_message()
            }
        }
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.lock();
        slot.as_ref()
            .filter(|entry| now - entry.created_at < self.ttl)
            .map(|entry| entry.report.clone())
    }

    fn annotate(&self, report: String) -> String {
        match self.annotation.as_ref().and_then(|annotation| annotation()) {
            Some(suffix) => report + &suffix,
            None => report,
        }
    }
}

impl std::fmt::Debug for ReportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCache")
            .field("ttl", &self.ttl)
            .field("slot", &*self.slot.lock())
            .field("annotated", &self.annotation.is_some())
            .finish()
    }
}
