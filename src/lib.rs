//! # bgg-collection
//!
//! Async client for the BoardGameGeek collection export.
//!
//! The collection endpoint of the XML API is asynchronous: the first request
//! for a user's collection usually answers `202 Accepted` while the export
//! is prepared, and a later request returns the XML document. This crate
//! hides that protocol behind a single call and returns a typed
//! [`GameCollection`].
//!
//! ## Pipeline
//!
//! - [`fetcher`] issues one GET and classifies the outcome (body, pending, failure)
//! - [`retry`] polls while the export is pending, with backoff, a budget and cancellation
//! - [`schema`] decodes the success document or the error document
//! - [`types`] converts string-encoded statistics into typed game records
//!
//! ## Quick Start
//!
//! ```no_run
//! use bgg_collection::{CollectionClient, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CollectionClient::new(Config::default())?;
//!     let cancel = CancellationToken::new();
//!
//!     let collection = client.fetch_collection("alice", &cancel).await?;
//!     for game in &collection.games {
//!         println!("{} ({}) - {:.2}", game.name, game.year_published, game.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Collection pipeline (poll, decode, transform)
pub mod collection;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Remote fetch of raw collection documents
pub mod fetcher;
/// Log line formatting and subscriber setup
pub mod logging;
/// Polling with backoff
pub mod retry;
/// XML wire schema
pub mod schema;
/// Domain types
pub mod types;

// Re-export commonly used types
pub use collection::{CollectionClient, fetch_collection};
pub use config::{Config, PollConfig, QueryConfig};
pub use error::{ConversionError, DecodeError, Error, FetchError, Result, TransportError};
pub use fetcher::{CollectionSource, HttpFetcher};
pub use retry::{Sleeper, TokioSleeper};
pub use types::{GameCollection, GameRecord, User};
