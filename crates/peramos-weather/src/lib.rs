//! Weather report pipeline for the Peramos bot
//!
//! Scrapes the station page, extracts label/value readings, renders a text
//! report and keeps the last good report in a time-bounded cache.

pub mod cache;
pub mod clock;
pub mod extractor;
pub mod fetcher;
pub mod formatter;
pub mod retry;
pub mod types;

pub use cache::ReportCache;
pub use clock::{Clock, Delay, ManualClock, SystemClock, TokioDelay};
pub use extractor::{sanitize_label, ReadingExtractor};
pub use fetcher::{Fetch, HttpFetcher};
pub use formatter::ReportFormatter;
pub use retry::{ReportPipeline, RetryPolicy};
pub use types::*;
