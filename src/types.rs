//! Domain model of a game collection
//!
//! These types are what callers consume. Every numeric field is already
//! parsed; the textual wire encoding never leaves [`crate::schema`] and the
//! conversions in this module.

use crate::error::ConversionError;
use crate::schema::{Item, ItemSet};
use serde::{Deserialize, Serialize};

/// Owner of a collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Username the collection was requested for
    pub name: String,
}

/// One game of a collection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Catalog object id
    pub id: String,
    /// Display name
    pub name: String,
    /// Minimum number of players
    pub min_players: i32,
    /// Maximum number of players
    pub max_players: i32,
    /// Playing time in minutes
    pub playing_time: i32,
    /// Bayesian average rating
    pub score: f64,
    /// Year of publication, rendered as decimal text
    pub year_published: String,
}

/// A user's game collection
///
/// `games` keeps the order the service listed the items in. An empty list
/// is a valid collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameCollection {
    /// Collection owner
    pub user: User,
    /// Games in service order
    pub games: Vec<GameRecord>,
    /// Item count reported by the service, if it reported a numeric one
    pub total_items: Option<u32>,
}

impl GameCollection {
    /// Build a collection from a decoded item set
    ///
    /// All-or-nothing: the first item that fails to convert aborts the build.
    ///
    /// # Errors
    /// Returns the [`ConversionError`] of the first malformed numeric field.
    pub fn from_items(username: &str, set: ItemSet) -> Result<Self, ConversionError> {
        let total_items = set.total_items.trim().parse().ok();
        let games = set
            .items
            .into_iter()
            .map(GameRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            user: User {
                name: username.to_string(),
            },
            games,
            total_items,
        })
    }

    /// Number of games in the collection
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the collection has no games
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl TryFrom<Item> for GameRecord {
    type Error = ConversionError;

    fn try_from(item: Item) -> Result<Self, Self::Error> {
        let stats = &item.stats;
        let max_players = parse_int(&item.id, "maxplayers", &stats.max_players)?;
        let min_players = parse_int(&item.id, "minplayers", &stats.min_players)?;
        let playing_time = parse_int(&item.id, "playingtime", &stats.playing_time)?;
        let score = parse_float(&item.id, "bayesaverage", &stats.rating.bayes_average.value)?;
        let year_published = item.year_published.to_string();

        Ok(Self {
            id: item.id,
            name: item.name.value,
            min_players,
            max_players,
            playing_time,
            score,
            year_published,
        })
    }
}

fn parse_int(item_id: &str, field: &'static str, value: &str) -> Result<i32, ConversionError> {
    value.parse().map_err(|source| ConversionError::Integer {
        item_id: item_id.to_string(),
        field,
        value: value.to_string(),
        source,
    })
}

fn parse_float(item_id: &str, field: &'static str, value: &str) -> Result<f64, ConversionError> {
    value.parse().map_err(|source| ConversionError::Float {
        item_id: item_id.to_string(),
        field,
        value: value.to_string(),
        source,
    })
}
