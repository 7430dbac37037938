//! Wire schema of the collection endpoint
//!
//! The service answers with one of two XML documents: an `<items>` list on
//! success, or an `<errors>` document when it rejects the request. Numeric
//! statistics arrive as attribute text and stay textual here; conversion to
//! typed fields happens in [`crate::types`].

use crate::error::DecodeError;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Deserializer};

/// Success document: `<items totalitems="..">`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ItemSet {
    /// Total item count as reported by the service
    #[serde(rename = "@totalitems", default)]
    pub total_items: String,

    /// Items in document order
    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// One `<item>` of a collection
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Item {
    /// Catalog object id
    #[serde(rename = "@objectid", default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: Name,

    /// Year of publication; absent or empty years decode as 0
    #[serde(
        rename = "yearpublished",
        default,
        deserialize_with = "year_from_text"
    )]
    pub year_published: i32,

    /// Statistics block
    #[serde(default)]
    pub stats: Stats,
}

/// `<name sortindex="..">text</name>`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Name {
    /// Element text
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// `<stats minplayers=".." maxplayers=".." playingtime="..">`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Stats {
    /// Minimum player count, as text
    #[serde(rename = "@minplayers", default)]
    pub min_players: String,

    /// Maximum player count, as text
    #[serde(rename = "@maxplayers", default)]
    pub max_players: String,

    /// Playing time in minutes, as text
    #[serde(rename = "@playingtime", default)]
    pub playing_time: String,

    /// Rating block
    #[serde(default)]
    pub rating: Rating,
}

/// `<rating>`; only the Bayesian average is consumed
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Rating {
    /// Bayesian average score
    #[serde(rename = "bayesaverage", default)]
    pub bayes_average: ValueAttr,
}

/// Element carrying its payload in a `value` attribute
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ValueAttr {
    /// Attribute text
    #[serde(rename = "@value", default)]
    pub value: String,
}

/// Error document: `<errors><error><message>..</message></error></errors>`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ErrorPayload {
    /// The rejection entry
    pub error: ErrorEntry,
}

/// Single `<error>` entry
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable reason
    ///
    /// The decoder trims leading and trailing whitespace from element text,
    /// so this is the message with surrounding whitespace removed.
    pub message: String,
}

impl ErrorPayload {
    /// Message text of the error document
    pub fn message(&self) -> &str {
        &self.error.message
    }
}

/// Element text as a year; empty or whitespace-only text is 0
fn year_from_text<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse().map_err(serde::de::Error::custom)
}

/// Result of decoding a response body
#[derive(Debug)]
pub enum Decoded {
    /// The body is a success document
    Success(ItemSet),
    /// The body is an error document
    Remote(ErrorPayload),
    /// The body fits neither schema
    Malformed {
        /// Why the success schema did not match
        success: DecodeError,
        /// Why the error schema did not match
        error: DecodeError,
    },
}

/// Classify a response body as a success document, an error document, or neither
pub fn decode(data: &[u8]) -> Decoded {
    let success = match decode_as::<ItemSet>(data, "items") {
        Ok(items) => return Decoded::Success(items),
        Err(e) => e,
    };
    match decode_as::<ErrorPayload>(data, "errors") {
        Ok(payload) => Decoded::Remote(payload),
        Err(error) => Decoded::Malformed { success, error },
    }
}

/// Deserialize `data` as `T` after checking the root element name
///
/// serde deserialization ignores the root element's name, so an
/// `<errors>` document would otherwise decode as an empty `<items>` list.
fn decode_as<T>(data: &[u8], root: &'static str) -> Result<T, DecodeError>
where
    T: serde::de::DeserializeOwned,
{
    let found = root_element(data)?;
    if found != root {
        return Err(DecodeError::UnexpectedRoot {
            expected: root,
            found,
        });
    }
    Ok(quick_xml::de::from_reader(data)?)
}

/// Local name of the first element in the document
fn root_element(data: &[u8]) -> Result<String, DecodeError> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Eof => return Err(DecodeError::Empty),
            // Declaration, comments, doctype, whitespace
            _ => {}
        }
        buf.clear();
    }
}
