//! Collection pipeline: poll, decode, transform
//!
//! [`CollectionClient::fetch_collection`] is the single inbound operation of
//! the crate. It:
//! 1. Polls the [`CollectionSource`] while the service reports the export as pending
//! 2. Decodes the body as an item list, falling back to the error document
//! 3. Converts every item into a [`GameRecord`](crate::types::GameRecord), all or nothing
//!
//! The first irrecoverable error ends the call; no partial collection is
//! ever returned.

use crate::config::{Config, PollConfig};
use crate::error::{Error, FetchError, Result};
use crate::fetcher::{CollectionSource, HttpFetcher};
use crate::retry::{PollFailure, Sleeper, TokioSleeper, poll_until_ready};
use crate::schema::{self, Decoded, ItemSet};
use crate::types::GameCollection;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Fetches and normalizes game collections
///
/// Holds no per-call state: one client can serve any number of concurrent
/// calls, for the same or different users. Identical in-flight requests are
/// not coalesced.
#[derive(Debug)]
pub struct CollectionClient<S = HttpFetcher, Z = TokioSleeper> {
    source: S,
    sleeper: Z,
    poll: PollConfig,
}

impl CollectionClient {
    /// Create a client for the HTTP endpoint described by `config`
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = HttpFetcher::new(&config)?;
        Ok(Self {
            source,
            sleeper: TokioSleeper,
            poll: config.poll,
        })
    }
}

impl<S, Z> CollectionClient<S, Z>
where
    S: CollectionSource,
    Z: Sleeper,
{
    /// Create a client over an arbitrary source and sleeper
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `poll` is invalid.
    pub fn with_source(poll: PollConfig, source: S, sleeper: Z) -> Result<Self> {
        poll.validate()?;
        Ok(Self {
            source,
            sleeper,
            poll,
        })
    }

    /// The underlying collection source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the collection of `username`
    ///
    /// Cancelling `cancel` aborts the in-flight request or the wait between
    /// attempts, whichever is running.
    ///
    /// # Errors
    /// - [`Error::Transport`] when a request fails for any reason except 202
    /// - [`Error::StillProcessing`] when the poll budget runs out
    /// - [`Error::Cancelled`] when `cancel` fires
    /// - [`Error::RemoteRejected`] when the service answers with an error document
    /// - [`Error::Decode`] when the body fits neither document shape
    /// - [`Error::Conversion`] when any item carries a malformed number
    pub async fn fetch_collection(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<GameCollection> {
        let data = poll_until_ready(&self.poll, &self.sleeper, cancel, || {
            self.source.fetch(username, cancel)
        })
        .await
        .map_err(poll_error)?;

        let set = decode_collection(&data)?;
        let collection = GameCollection::from_items(username, set)?;

        info!(user = username, games = collection.len(), "collection fetched");
        Ok(collection)
    }
}

/// Decode a response body into an item set
///
/// # Errors
/// [`Error::RemoteRejected`] carrying the error document's message, or
/// [`Error::Decode`] with the error-schema failure when neither shape fits.
pub fn decode_collection(data: &[u8]) -> Result<ItemSet> {
    match schema::decode(data) {
        Decoded::Success(set) => Ok(set),
        Decoded::Remote(payload) => Err(Error::RemoteRejected {
            message: payload.error.message,
        }),
        Decoded::Malformed {
            success,
            error: fallback,
        } => {
            error!(error = %success, "collection payload is not an item list");
            Err(Error::Decode(fallback))
        }
    }
}

fn poll_error(failure: PollFailure<FetchError>) -> Error {
    match failure {
        PollFailure::Failed(e) => e.into(),
        PollFailure::Exhausted {
            last: FetchError::Pending { url },
            attempts,
        } => Error::StillProcessing { url, attempts },
        PollFailure::Exhausted { last, .. } => last.into(),
        PollFailure::Cancelled => Error::Cancelled,
    }
}

static DEFAULT_CLIENT: OnceLock<CollectionClient> = OnceLock::new();

/// Fetch the collection of `username` with the process-wide default client
///
/// The default client targets the public service with [`Config::default`]
/// and is built on first use.
///
/// # Errors
/// See [`CollectionClient::fetch_collection`]; additionally [`Error::Http`]
/// if the default client cannot be built.
pub async fn fetch_collection(username: &str, cancel: &CancellationToken) -> Result<GameCollection> {
    default_client()?.fetch_collection(username, cancel).await
}

fn default_client() -> Result<&'static CollectionClient> {
    if let Some(client) = DEFAULT_CLIENT.get() {
        return Ok(client);
    }
    let client = CollectionClient::new(Config::default())?;
    Ok(DEFAULT_CLIENT.get_or_init(|| client))
}

#[cfg(test)]
mod tests;
