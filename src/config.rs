//! Configuration types for bgg-collection

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Collection endpoint of the BoardGameGeek XML API v2
pub const DEFAULT_ENDPOINT: &str = "https://boardgamegeek.com/xmlapi2/collection";

/// Main configuration for a [`CollectionClient`](crate::CollectionClient)
///
/// Use `Config::default()` for the public BoardGameGeek service, or override
/// individual fields:
///
/// ```
/// use bgg_collection::config::{Config, PollConfig};
/// use std::time::Duration;
///
/// let config = Config {
///     poll: PollConfig {
///         max_attempts: 3,
///         ..Default::default()
///     },
///     timeout: Duration::from_secs(10),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Collection endpoint URL (default: the BoardGameGeek XML API v2)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for each individual HTTP attempt (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_secs_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fixed query parameters sent alongside the username
    #[serde(default)]
    pub query: QueryConfig,

    /// Polling behavior while the service prepares the export
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            query: QueryConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl Config {
    /// Check the configuration for values the client cannot work with
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.endpoint).map_err(|e| Error::Config {
            message: format!("invalid endpoint URL {:?}: {}", self.endpoint, e),
            key: Some("endpoint".to_string()),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported endpoint scheme {:?}", endpoint.scheme()),
                key: Some("endpoint".to_string()),
            });
        }
        if self.timeout.is_zero() {
            return Err(Error::Config {
                message: "timeout must be greater than zero".to_string(),
                key: Some("timeout".to_string()),
            });
        }
        self.poll.validate()
    }
}

/// Query parameters of the collection request
///
/// The defaults request owned-or-wanted board games with statistics and
/// without expansions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Item subtype to include (default: "boardgame")
    #[serde(default = "default_subtype")]
    pub subtype: String,

    /// Include rating statistics (default: true)
    #[serde(default = "default_true")]
    pub stats: bool,

    /// Include items flagged "want to play" (default: true)
    #[serde(default = "default_true")]
    pub want_to_play: bool,

    /// Item subtype to exclude (default: "boardgameexpansion")
    #[serde(default = "default_exclude_subtype")]
    pub exclude_subtype: Option<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            subtype: default_subtype(),
            stats: true,
            want_to_play: true,
            exclude_subtype: default_exclude_subtype(),
        }
    }
}

impl QueryConfig {
    /// Query pairs for `username`, in the order they are sent
    pub fn pairs<'a>(&'a self, username: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut pairs = vec![("username", username), ("subtype", self.subtype.as_str())];
        if self.stats {
            pairs.push(("stats", "1"));
        }
        if self.want_to_play {
            pairs.push(("wanttoplay", "1"));
        }
        if let Some(exclude) = &self.exclude_subtype {
            pairs.push(("excludesubtype", exclude.as_str()));
        }
        pairs
    }
}

/// Polling configuration for the "accepted, still processing" signal
///
/// The first wait is `initial_delay`; each following wait is multiplied by
/// `backoff_multiplier` and capped at `max_delay`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of retries after the first attempt (default: 10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 8 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 1.5)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// Upper bound on the summed waits of one fetch (default: 60 seconds, None = unbounded)
    #[serde(
        default = "default_max_total_wait",
        with = "optional_duration_secs_serde"
    )]
    pub max_total_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
            max_total_wait: default_max_total_wait(),
        }
    }
}

impl PollConfig {
    /// Reject settings that would make the poll loop misbehave
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.initial_delay.is_zero() {
            return Err(Error::Config {
                message: "initial_delay must be greater than zero".to_string(),
                key: Some("poll.initial_delay".to_string()),
            });
        }
        if self.max_delay < self.initial_delay {
            return Err(Error::Config {
                message: format!(
                    "max_delay ({:?}) must not be shorter than initial_delay ({:?})",
                    self.max_delay, self.initial_delay
                ),
                key: Some("poll.max_delay".to_string()),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: format!(
                    "backoff_multiplier must be a finite number >= 1.0, got {}",
                    self.backoff_multiplier
                ),
                key: Some("poll.backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("bgg-collection/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_subtype() -> String {
    "boardgame".to_string()
}

fn default_exclude_subtype() -> Option<String> {
    Some("boardgameexpansion".to_string())
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(8)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_total_wait() -> Option<Duration> {
    Some(Duration::from_secs(60))
}

// Duration serialization helper (whole seconds)
mod duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Retry delays are sub-second in tests, so they round-trip as milliseconds
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper
mod optional_duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
