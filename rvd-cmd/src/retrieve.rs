//! Data retrieval with CORS relay fallback.

use log::{info, warn};
use reqwest::Client;
use rvd_core::{
    error::{Result, RvdError},
    sources::{relay_url, CORS_PROXY},
};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the body of a URL as text or decoded JSON.
#[allow(async_fn_in_trait)]
pub trait Retriever {
    async fn fetch_text(&self, url: &str) -> Result<String>;

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Plain HTTP retriever with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    client: Client,
}

impl HttpRetriever {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl Retriever for HttpRetriever {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        info!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RvdError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Wraps a retriever so that a failed direct request is retried once through
/// a relay. If the relayed request fails too, its error is returned.
#[derive(Debug, Clone)]
pub struct RelayRetriever<R> {
    inner: R,
    relay: Option<String>,
}

impl<R: Retriever> RelayRetriever<R> {
    /// `relay` is the relay endpoint; `None` disables the retry.
    pub fn new(inner: R, relay: Option<&str>) -> Self {
        Self {
            inner,
            relay: relay.map(str::to_string),
        }
    }
}

impl<R: Retriever> Retriever for RelayRetriever<R> {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        match (self.inner.fetch_text(url).await, &self.relay) {
            (Ok(body), _) => Ok(body),
            (Err(e), Some(relay)) => {
                warn!("Direct fetch of {} failed ({}), retrying via proxy", url, e);
                self.inner.fetch_text(&relay_url(relay, url)).await
            }
            (Err(e), None) => Err(e),
        }
    }
}

/// HTTP retriever used by the commands, relaying through the public CORS
/// proxy unless `use_proxy` is off.
pub fn http_retriever(use_proxy: bool) -> Result<RelayRetriever<HttpRetriever>> {
    let relay = use_proxy.then_some(CORS_PROXY);
    Ok(RelayRetriever::new(HttpRetriever::new()?, relay))
}
