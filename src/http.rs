//! # Blocking HTTP Collaborator
//!
//! Every upstream fetch (tiles, forecasts, departures, jokes) goes through
//! [`HttpClient`]. It wraps an async `reqwest` client and drives each request to
//! completion on a private current-thread Tokio runtime, so callers see plain
//! blocking calls and fetches never overlap.
//!
//! Non-success statuses are turned into [`FetchError::Status`]; callers decide
//! whether to fall back to cached data or a placeholder. Nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

/// Per-request timeout applied to every upstream call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching upstream data.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network, TLS or protocol failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Response arrived but did not have the expected shape
    #[error("unexpected payload: {0}")]
    Decode(String),

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Cheap-to-clone blocking HTTP client.
#[derive(Clone)]
pub struct HttpClient {
    runtime: Arc<Runtime>,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("inkboard/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
            client,
        })
    }

    /// Underlying client, for building requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send `request` and return the body bytes of a successful response.
    pub fn fetch_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, FetchError> {
        self.runtime.block_on(async {
            let response = checked(request.send().await?)?;
            Ok(response.bytes().await?.to_vec())
        })
    }

    pub fn fetch_text(&self, request: RequestBuilder) -> Result<String, FetchError> {
        self.runtime.block_on(async {
            let response = checked(request.send().await?)?;
            Ok(response.text().await?)
        })
    }

    pub fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FetchError> {
        self.runtime.block_on(async {
            let response = checked(request.send().await?)?;
            Ok(response.json::<T>().await?)
        })
    }
}

fn checked(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}
