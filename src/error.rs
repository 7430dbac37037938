//! Error types for bgg-collection
//!
//! This module provides the error taxonomy for a collection fetch:
//! - Transport failures (request construction, network, non-200 status, body read)
//! - The "still processing" signal, kept separate from transport failures
//! - Payload decode failures and remote rejections
//! - Numeric field conversion failures

use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// Result type alias for bgg-collection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bgg-collection
///
/// Every terminal failure of a collection fetch surfaces as one of these
/// variants. A caller never receives a partially populated collection.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote request failed (construction, network, status or body read)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service kept answering "accepted, still processing" until the poll budget ran out
    #[error("collection export still processing after {attempts} attempts: {url}")]
    StillProcessing {
        /// Collection URL that was being polled
        url: String,
        /// Number of requests issued, including the first one
        attempts: u32,
    },

    /// The caller cancelled the fetch
    #[error("collection fetch cancelled")]
    Cancelled,

    /// The payload matched neither the item schema nor the error schema
    #[error("failed to decode collection payload: {0}")]
    Decode(#[from] DecodeError),

    /// The service rejected the request with an error document
    #[error("{message}")]
    RemoteRejected {
        /// Message text from the error document, verbatim
        message: String,
    },

    /// A numeric item field could not be parsed
    #[error("invalid game record: {0}")]
    Conversion(#[from] ConversionError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.max_delay")
        key: Option<String>,
    },

    /// The shared HTTP client could not be built
    #[error("failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single request to the collection endpoint
///
/// `url` is `None` when the request could not be built at all, so no
/// URL ever existed for it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("request {} code {status}: {message}", .url.as_deref().unwrap_or("<unbuilt request>"))]
pub struct TransportError {
    /// Request URL including the query string, when one was built
    pub url: Option<String>,
    /// HTTP status code (502 for failures below the HTTP layer)
    pub status: u16,
    /// Underlying error message or HTTP status text
    pub message: String,
}

impl TransportError {
    /// Status reported for failures that never produced an HTTP response
    pub const BAD_GATEWAY: u16 = 502;

    /// Build a transport error for a failure below the HTTP layer
    pub fn bad_gateway(url: Option<String>, message: impl Into<String>) -> Self {
        Self {
            url,
            status: Self::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

/// Outcome of a single fetch attempt that did not yield a body
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Terminal transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// HTTP 202: the export is still being prepared, try again later
    #[error("collection export pending: {url}")]
    Pending {
        /// Request URL that answered 202
        url: String,
    },

    /// The cancellation token fired while the request was in flight
    #[error("request cancelled")]
    Cancelled,
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => Error::Transport(e),
            // Fallback for a pending result converted outside the poll loop,
            // which reports the real attempt count itself
            FetchError::Pending { url } => Error::StillProcessing { url, attempts: 1 },
            FetchError::Cancelled => Error::Cancelled,
        }
    }
}

/// Payload decode errors
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document could not be scanned for its root element
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document has no root element
    #[error("empty document")]
    Empty,

    /// The root element is not the one the schema expects
    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot {
        /// Root element name the schema requires
        expected: &'static str,
        /// Root element name found in the document
        found: String,
    },

    /// The document has the right root but does not fit the schema
    #[error("schema mismatch: {0}")]
    Schema(#[from] quick_xml::DeError),
}

/// Numeric conversion errors for game record fields
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// An integer field (player counts, playing time) did not parse
    #[error("field {field} of item {item_id}: {value:?} is not an integer: {source}")]
    Integer {
        /// Identifier of the item being converted
        item_id: String,
        /// Wire name of the field
        field: &'static str,
        /// The offending text
        value: String,
        /// Parse failure
        source: ParseIntError,
    },

    /// The rating score did not parse
    #[error("field {field} of item {item_id}: {value:?} is not a number: {source}")]
    Float {
        /// Identifier of the item being converted
        item_id: String,
        /// Wire name of the field
        field: &'static str,
        /// The offending text
        value: String,
        /// Parse failure
        source: ParseFloatError,
    },
}
