use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;

use crate::config::DispatchConfig;
use crate::error::DispatchError;

// ============================================================================
// Stock Service Client
// ============================================================================
//
// GET {endpoint}?item={item}
//
//   200                       -> body returned verbatim ("true" / "false")
//   5xx                       -> Retryable
//   connect/timeout/reset     -> Retryable, also while reading the body
//   anything else             -> Failed (logged, never retried)
//
// The client does not interpret the body; deciding what "unavailable" means
// is left to the dispatch service.
//
// ============================================================================

/// Asks whether an item is in stock.
#[async_trait]
pub trait AvailabilityChecker: Send + Sync {
    async fn check_available(&self, item: &str) -> Result<String, DispatchError>;
}

#[derive(Debug, Error)]
pub enum StockServiceError {
    #[error("stock service returned {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("stock service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("error {status}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("stock service request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("invalid stock service response body: {0}")]
    InvalidResponse(#[source] reqwest::Error),

    #[error("invalid stock service endpoint: {0}")]
    InvalidEndpoint(String),
}

impl StockServiceError {
    fn from_transport(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() || error.is_request() {
            StockServiceError::Unreachable(error)
        } else {
            StockServiceError::Request(error)
        }
    }

    /// Failure while reading a 200 body. Timeouts and broken connections
    /// surface from reqwest as body or decode errors, so look at the cause
    /// before calling the body itself invalid.
    fn from_body(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_body() || caused_by_io(&error) {
            StockServiceError::Unreachable(error)
        } else if error.is_decode() {
            StockServiceError::InvalidResponse(error)
        } else {
            StockServiceError::from_transport(error)
        }
    }

    /// Server-side and connectivity failures are worth redelivering.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StockServiceError::ServerError { .. } | StockServiceError::Unreachable(_)
        )
    }
}

fn caused_by_io(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}

impl From<StockServiceError> for DispatchError {
    fn from(error: StockServiceError) -> Self {
        if error.is_retryable() {
            DispatchError::retryable(error)
        } else {
            DispatchError::failed(error)
        }
    }
}

pub struct StockServiceClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl StockServiceClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, StockServiceError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StockServiceError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StockServiceError::Request)?;

        Ok(Self { http, endpoint })
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, StockServiceError> {
        Self::new(&config.stock_service_endpoint, config.stock_service_timeout())
    }

    fn availability_url(&self, item: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("item", item);
        url
    }

    async fn fetch(&self, item: &str) -> Result<String, StockServiceError> {
        let url = self.availability_url(item);
        tracing::debug!(url = %url, "Checking stock availability");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(StockServiceError::from_transport)?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(StockServiceError::ServerError { status: status.as_u16(), body });
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(StockServiceError::UnexpectedStatus { status: status.as_u16(), body });
        }

        response.text().await.map_err(StockServiceError::from_body)
    }
}

#[async_trait]
impl AvailabilityChecker for StockServiceClient {
    async fn check_available(&self, item: &str) -> Result<String, DispatchError> {
        match self.fetch(item).await {
            Ok(body) => Ok(body),
            Err(e) if e.is_retryable() => {
                tracing::warn!(item = %item, error = %e, "Stock service unavailable");
                Err(e.into())
            }
            Err(e) => {
                tracing::error!(item = %item, error = %e, "Stock service check failed");
                Err(e.into())
            }
        }
    }
}
