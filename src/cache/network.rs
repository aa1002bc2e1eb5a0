//! Network leg of the fetch stack
//!
//! [`HttpFetcher`] is the innermost service: it performs the request with
//! `reqwest` and reads the whole body. Any response, including non-2xx, is
//! a success at this level; only a failure to get a response at all is an
//! error.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::Service;

use crate::cache::request::{FetchRequest, FetchResponse};
use crate::error::{CockpitError, Result};

/// `reqwest`-backed fetch service
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cockpit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CockpitError::Http)?;
        Ok(Self { client })
    }

    /// Perform one request
    ///
    /// # Errors
    ///
    /// Returns [`CockpitError::Network`] if no response was received.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            CockpitError::Network(format!("{} {} failed: {}", request.method, request.url, e))
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            CockpitError::Network(format!("reading body of {} failed: {}", request.url, e))
        })?;

        tracing::debug!(method = %request.method, url = %request.url, status = status.as_u16(), "Fetched");
        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

impl Service<FetchRequest> for HttpFetcher {
    type Response = FetchResponse;
    type Error = anyhow::Error;
    type Future = Pin<Box<dyn Future<Output = Result<FetchResponse>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: FetchRequest) -> Self::Future {
        let fetcher = self.clone();
        Box::pin(async move { fetcher.fetch(request).await })
    }
}
