//! Remote fetch of a raw collection document
//!
//! One call is one HTTP GET. Interpreting the 202 "still processing" answer
//! as a reason to try again belongs to [`crate::retry`], not to this module.

use crate::config::{Config, QueryConfig};
use crate::error::{Error, FetchError, Result, TransportError};
use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Source of raw collection documents
///
/// This abstraction lets the pipeline run against scripted responses in
/// tests instead of the live service.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch the raw collection document for `username`
    ///
    /// # Errors
    /// - [`FetchError::Pending`] when the service is still preparing the export
    /// - [`FetchError::Transport`] for construction, network, status and body failures
    /// - [`FetchError::Cancelled`] when `cancel` fires first
    async fn fetch(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Production source talking HTTP(S) to the collection endpoint
///
/// The inner `reqwest::Client` pools connections and is shared by every
/// clone, so one `HttpFetcher` serves any number of concurrent callers.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoint: String,
    query: QueryConfig,
}

impl HttpFetcher {
    /// Build the shared HTTP client from `config`
    ///
    /// The endpoint is not validated here; an unusable endpoint surfaces as
    /// a transport error on the first fetch.
    ///
    /// # Errors
    /// Returns [`Error::Http`] if the HTTP client cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            query: config.query.clone(),
        })
    }

    /// Collection URL for `username`, query string included
    ///
    /// # Errors
    /// A transport error with status 502 and no URL if the endpoint does not parse.
    pub fn request_url(&self, username: &str) -> std::result::Result<Url, TransportError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| TransportError::bad_gateway(None, format!("invalid endpoint: {e}")))?;
        url.query_pairs_mut().extend_pairs(self.query.pairs(username));
        Ok(url)
    }
}

#[async_trait]
impl CollectionSource for HttpFetcher {
    async fn fetch(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.request_url(username)?;
        let url_text = url.to_string();
        debug!(url = %url_text, "requesting collection");

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            sent = self.client.get(url).send() => sent,
        };
        let response = sent
            .map_err(|e| TransportError::bad_gateway(Some(url_text.clone()), e.to_string()))?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            debug!(url = %url_text, "collection export pending");
            return Err(FetchError::Pending { url: url_text });
        }
        if status != StatusCode::OK {
            return Err(TransportError {
                url: Some(url_text),
                status: status.as_u16(),
                message: status.to_string(),
            }
            .into());
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            body = response.bytes() => body,
        };
        let body = body.map_err(|e| TransportError {
            url: Some(url_text.clone()),
            status: status.as_u16(),
            message: e.to_string(),
        })?;

        debug!(url = %url_text, bytes = body.len(), "collection received");
        Ok(body.to_vec())
    }
}
