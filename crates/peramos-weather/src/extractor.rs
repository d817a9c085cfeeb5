//! Label/value extraction from the station page.
//!
//! The page lists readings as two parallel runs of elements: one run of label
//! cells and one run of value cells. They are collected independently and
//! paired by position; a length mismatch truncates to the shorter run.

use peramos_core::{ConfigError, StationConfig};
use scraper::{ElementRef, Html, Selector};

use crate::types::Reading;

/// Extracts readings using one selector for labels and one for values
#[derive(Debug, Clone)]
pub struct ReadingExtractor {
    label_selector: Selector,
    value_selector: Selector,
}

impl ReadingExtractor {
    pub fn new(label_selector: &str, value_selector: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            label_selector: parse_selector(label_selector)?,
            value_selector: parse_selector(value_selector)?,
        })
    }

    pub fn from_config(station: &StationConfig) -> Result<Self, ConfigError> {
        Self::new(&station.label_selector, &station.value_selector)
    }

    /// Extract readings from a raw page body.
    ///
    /// Never fails: invalid UTF-8 is decoded lossily and malformed markup is
    /// parsed best-effort. An empty result means no usable data.
    pub fn extract(&self, raw: &[u8]) -> Vec<Reading> {
        let html = String::from_utf8_lossy(raw);
        let document = Html::parse_document(&html);

        let labels: Vec<String> = document
            .select(&self.label_selector)
            .map(|el| sanitize_label(&element_text(el)))
            .filter(|label| !label.is_empty())
            .collect();

        let values: Vec<String> = document
            .select(&self.value_selector)
            .map(element_text)
            .filter(|value| !value.is_empty())
            .collect();

        if labels.len() != values.len() {
            tracing::debug!(
                "Label/value count mismatch ({} labels, {} values), truncating",
                labels.len(),
                values.len()
            );
        }

        labels
            .into_iter()
            .zip(values)
            .filter_map(|(label, value)| Reading::new(label, value))
            .collect()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::Invalid(format!("selector {:?}: {:?}", selector, e)))
}

/// Text content of an element, each text node trimmed and concatenated.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Delete every character outside printable ASCII, then trim.
pub fn sanitize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| matches!(c, ' '..='~'))
        .collect::<String>()
        .trim()
        .to_string()
}
