use std::fmt;

use chrono::{DateTime, Utc};
use peramos_core::NetworkError;

/// Shown when the page was reachable but carried no readings
pub const NO_DATA_MESSAGE: &str =
    "⚠️ No weather data available at the moment. Please try again later.";

/// Shown when every attempt of a report request failed
pub const EXHAUSTED_MESSAGE: &str =
    "❌ Unable to fetch weather data after multiple attempts. Please try again later.";

/// Raw page body, or the classified reason the fetch failed
pub type FetchOutcome = Result<Vec<u8>, NetworkError>;

/// One label/value pair scraped from the station page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    label: String,
    value: String,
}

impl Reading {
    /// Returns `None` when either side is blank.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Option<Self> {
        let label = label.into();
        let value = value.into();
        if label.trim().is_empty() || value.trim().is_empty() {
            return None;
        }
        Some(Self { label, value })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// Readings captured from one successful scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    readings: Vec<Reading>,
    captured_at: DateTime<Utc>,
}

impl Report {
    /// An empty reading list is the no-data condition, so it yields `None`.
    pub fn new(readings: Vec<Reading>, captured_at: DateTime<Utc>) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }
        Some(Self {
            readings,
            captured_at,
        })
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Result of one report request through the retry pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Formatted report, safe to cache
    Ready(String),
    /// All attempts failed
    Exhausted,
}

impl ReportOutcome {
    pub fn is_cacheable(&self) -> bool {
        matches!(self, ReportOutcome::Ready(_))
    }

    /// The message delivered to the user.
    pub fn into_message(self) -> String {
        match self {
            ReportOutcome::Ready(report) => report,
            ReportOutcome::Exhausted => EXHAUSTED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_rejects_blank_sides() {
        assert!(Reading::new("", "18.5C").is_none());
        assert!(Reading::new("Temp", "  ").is_none());
        assert!(Reading::new("Temp", "18.5C").is_some());
    }

    #[test]
    fn test_reading_display() {
        let reading = Reading::new("Humidity", "62%").unwrap();
        assert_eq!(reading.to_string(), "Humidity: 62%");
    }

    #[test]
    fn test_empty_report_is_absent() {
        assert!(Report::new(Vec::new(), Utc::now()).is_none());
    }

    #[test]
    fn test_outcome_messages() {
        assert!(ReportOutcome::Ready("x".into()).is_cacheable());
        assert!(!ReportOutcome::Exhausted.is_cacheable());
        assert_eq!(ReportOutcome::Exhausted.into_message(), EXHAUSTED_MESSAGE);
        assert_ne!(EXHAUSTED_MESSAGE, NO_DATA_MESSAGE);
    }
}
