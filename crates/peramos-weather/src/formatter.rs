//! Plain-text rendering of a scraped report.

use chrono::Local;
use peramos_core::StationConfig;

use crate::types::{Report, NO_DATA_MESSAGE};

const SEPARATOR_WIDTH: usize = 30;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders a [`Report`] as the chat message text
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    station_name: String,
    source_label: String,
}

impl ReportFormatter {
    pub fn new(station_name: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            station_name: station_name.into(),
            source_label: source_label.into(),
        }
    }

    pub fn from_config(station: &StationConfig) -> Self {
        Self::new(&station.name, &station.source_label)
    }

    /// Title, separator, one line per reading, separator, capture time, source.
    ///
    /// An absent report renders the fixed no-data message.
    pub fn render(&self, report: Option<&Report>) -> String {
        let Some(report) = report else {
            return NO_DATA_MESSAGE.to_string();
        };

        let separator = "=".repeat(SEPARATOR_WIDTH);
        let captured = report.captured_at().with_timezone(&Local);

        let mut lines = Vec::with_capacity(report.len() + 5);
        lines.push(format!("🌤️ Weather Station: {}", self.station_name));
        lines.push(separator.clone());
        lines.extend(report.readings().iter().map(|r| format!("📊 {}", r)));
        lines.push(separator);
        lines.push(format!("🕐 Updated: {}", captured.format(TIMESTAMP_FORMAT)));
        lines.push(format!("📡 Source: {}", self.source_label));

        lines.join("\n")
    }
}
