//! Single bounded-time retrieval of the station page.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use peramos_core::{ConfigError, NetworkError, ReqwestErrorExt, StationConfig};
use reqwest::Client;
use url::Url;

use crate::types::FetchOutcome;

/// One fetch of the source page. Implementations must not retry.
pub trait Fetch: Send + Sync {
    fn fetch(&self) -> impl Future<Output = FetchOutcome> + Send;
}

/// HTTP GET of a fixed URL with a fixed User-Agent and a hard timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Arc<Client>,
    url: Url,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let url = Url::parse(url)
            .map_err(|e| ConfigError::Invalid(format!("station url {}: {}", url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            url,
            timeout,
        })
    }

    pub fn from_config(station: &StationConfig) -> Result<Self, ConfigError> {
        Self::new(&station.url, &station.user_agent, station.timeout())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    #[tracing::instrument(skip(self), fields(url = %self.url), level = "debug")]
    async fn get_page(&self) -> FetchOutcome {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::from_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        tracing::debug!("Fetched {} bytes", body.len());
        Ok(body.to_vec())
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self) -> FetchOutcome {
        // The client timeout covers the body read; this bounds everything else too.
        match tokio::time::timeout(self.timeout, self.get_page()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(NetworkError::Timeout),
        }
    }
}
