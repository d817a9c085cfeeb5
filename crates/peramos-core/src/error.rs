//! Centralized error types for the Peramos weather bot.
//!
//! This module provides a typed error hierarchy that:
//! - Classifies upstream failures so the retry layer can log and count them
//! - Provides user-friendly messages suitable for chat replies
//! - Preserves full error context for debugging/logging

use std::fmt;

use thiserror::Error;

/// Top-level application error type.
///
/// Only startup and configuration paths surface this type; the report pipeline
/// resolves every failure to a display string instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl AppError {
    /// Returns a short operator-facing message.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Transport(e) => e.user_message(),
        }
    }

    /// Whether the process cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::Transport(TransportError::Unauthorized)
        )
    }
}

/// Category of a failed upstream fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Timeout,
    HttpError,
    NetworkError,
    Unknown,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::HttpError => "http-error",
            Self::NetworkError => "network-error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

impl NetworkError {
    /// Build an HTTP status error using the canonical reason phrase.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        NetworkError::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            NetworkError::Timeout => FailureCategory::Timeout,
            NetworkError::HttpStatus { .. } => FailureCategory::HttpError,
            NetworkError::ConnectionFailed(_) => FailureCategory::NetworkError,
            NetworkError::Unknown(_) => FailureCategory::Unknown,
        }
    }

    /// Human-readable detail for logs.
    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Timeout => "The request timed out.",
            NetworkError::HttpStatus { status, .. } if *status >= 500 => {
                "The server is experiencing issues."
            }
            NetworkError::HttpStatus { .. } => "The request was rejected.",
            NetworkError::ConnectionFailed(_) => "Unable to connect. Check the network.",
            NetworkError::Unknown(_) => "Received an unexpected response.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Messaging transport errors (Telegram Bot API).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Bot token rejected")]
    Unauthorized,

    #[error("Bot API error {code}: {description}")]
    Api { code: u16, description: String },

    #[error("Bot API unreachable: {0}")]
    Network(#[from] NetworkError),

    #[error("Malformed Bot API response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            TransportError::Unauthorized => "The bot token is invalid. Check TELEGRAM_BOT_TOKEN.",
            TransportError::Api { .. } => "The messaging service rejected the request.",
            TransportError::Network(e) => e.user_message(),
            TransportError::InvalidResponse(_) => "The messaging service sent an unexpected reply.",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Network(e.into_network_error())
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    /// The request URL is dropped first: Bot API URLs embed the token.
    fn into_network_error(self) -> NetworkError {
        let err = self.without_url();
        if err.is_timeout() {
            NetworkError::Timeout
        } else if let Some(status) = err.status() {
            NetworkError::from_status(status)
        } else if err.is_connect() || err.is_request() {
            NetworkError::ConnectionFailed(err.to_string())
        } else {
            NetworkError::Unknown(err.to_string())
        }
    }
}
