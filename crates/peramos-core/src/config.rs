use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable holding the Telegram bot token
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable overriding the station page URL
pub const WEATHER_URL_ENV: &str = "PERAMOS_WEATHER_URL";
/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "PERAMOS_CONFIG";

const DEFAULT_WEATHER_URL: &str = "http://penteli.meteo.gr/stations/neaperamos/";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream weather station page
    #[serde(default)]
    pub station: StationConfig,

    /// Retry policy for a single report request
    #[serde(default)]
    pub retry: RetryConfig,

    /// Report cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Messaging transport settings
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Page to scrape
    pub url: String,

    /// Display name used in the report title
    pub name: String,

    /// CSS selector for label cells
    pub label_selector: String,

    /// CSS selector for value cells
    pub value_selector: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Hard upper bound on a single fetch
    pub timeout_secs: u64,

    /// Attribution shown on the last line of the report
    pub source_label: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEATHER_URL.to_string(),
            name: "Nea Peramos".to_string(),
            label_selector: "div.lleft".to_string(),
            value_selector: "div.lright".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            source_label: "penteli.meteo.gr".to_string(),
        }
    }
}

impl StationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per report, including the first
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window for the last good report
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot API token. Read from the environment, never written back to disk.
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Base URL of the Bot API
    pub api_url: String,

    /// Long-poll timeout passed to getUpdates
    pub poll_timeout_secs: u64,

    /// Caller-side deadline on one whole report request
    pub report_deadline_secs: u64,

    /// Append the process memory figure to reports and /status
    pub show_memory: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            report_deadline_secs: 60,
            show_memory: true,
        }
    }
}

impl BotConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn report_deadline(&self) -> Duration {
        Duration::from_secs(self.report_deadline_secs)
    }
}

impl Config {
    /// Load configuration from the config file (if any) and the environment
    pub fn load() -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => Self::config_path(),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => Self::load_from(p)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific TOML file, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Apply environment overrides. `lookup` abstracts `std::env::var` for tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.bot.token = Some(token.trim().to_string());
        }

        if let Some(url) = lookup(WEATHER_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.station.url = url.trim().to_string();
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.station.url, "station.url", &mut result);
        self.validate_url(&self.bot.api_url, "bot.api_url", &mut result);

        if self.station.name.trim().is_empty() {
            result.add_error("station.name", "Station name must not be empty");
        }

        if self.station.label_selector.trim().is_empty() {
            result.add_error("station.label_selector", "Label selector must not be empty");
        }
        if self.station.value_selector.trim().is_empty() {
            result.add_error("station.value_selector", "Value selector must not be empty");
        }

        if self.station.timeout_secs == 0 {
            result.add_error("station.timeout_secs", "Timeout must be greater than 0");
        } else if self.station.timeout_secs > 120 {
            result.add_warning("station.timeout_secs", "Timeout is unusually long (>120s)");
        }

        if self.retry.max_attempts == 0 {
            result.add_error("retry.max_attempts", "At least one attempt is required");
        } else if self.retry.max_attempts > 10 {
            result.add_warning("retry.max_attempts", "More than 10 attempts per request");
        }

        if self.retry.delay_secs > 60 {
            result.add_warning("retry.delay_secs", "Retry delay is more than a minute");
        }

        if self.cache.ttl_secs == 0 {
            result.add_warning("cache.ttl_secs", "Report cache disabled (0 seconds)");
        }

        if self.bot.report_deadline_secs == 0 {
            result.add_error("bot.report_deadline_secs", "Report deadline must be greater than 0");
        }

        if self.bot.token.is_none() {
            result.add_warning(
                "bot.token",
                format!("{} is not set - the bot cannot connect", TOKEN_ENV),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Get the path to the default configuration file
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("peramos").join("config.toml"))
    }
}
