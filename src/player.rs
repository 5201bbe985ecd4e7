//! Player identity and presence bookkeeping
//!
//! Players are self-asserted: a locally generated pseudo-random id plus a
//! nickname the player typed in. The id is generated once per client and
//! keyed into the room's player sub-collection, so rejoining with the
//! same id updates the existing player entry instead of creating a new
//! one. Nicknames are sanitized but never checked for uniqueness.

use std::{fmt::Display, str::FromStr};

use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use crate::{constants, store::Timestamp};

/// A unique identifier for a client
///
/// Generated locally, without coordination; uniqueness is probabilistic.
/// The id doubles as the player's document key within a room.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random client id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    /// Creates a new random client id (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ClientId {
    /// Formats the id as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClientId {
    type Err = uuid::Error;

    /// Parses a client id from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A player's document within a room
///
/// The score is monotone non-decreasing: it only ever changes through
/// atomic increments caused by first-correct solves, and a rejoin merge
/// must not reset it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDoc {
    /// The player's sanitized nickname
    pub nickname: String,
    /// Number of questions this player was credited for
    #[serde(default)]
    pub score: u64,
    /// Server timestamp of the player's first join
    pub joined_at: Timestamp,
    /// Server timestamp of the last heartbeat
    pub last_seen: Timestamp,
}

/// Sanitizes a self-asserted nickname
///
/// Trims whitespace, truncates to the maximum length, and censors
/// inappropriate content. An empty result falls back to the default
/// nickname so the answer log and lock attribution always carry a name.
pub fn sanitize_nickname(raw: &str) -> String {
    let trimmed: String = raw
        .trim()
        .chars()
        .take(constants::nickname::MAX_LENGTH)
        .collect();

    if trimmed.is_empty() {
        return constants::nickname::FALLBACK.to_owned();
    }

    trimmed.censor()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_round_trip() {
        let id = ClientId::new();
        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: ClientId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_client_ids_are_distinct() {
        assert_ne!(ClientId::new(), ClientId::new());
    }

    #[test]
    fn test_sanitize_trims_and_truncates() {
        assert_eq!(sanitize_nickname("  Alice  "), "Alice");

        let long = "a".repeat(constants::nickname::MAX_LENGTH + 10);
        assert_eq!(
            sanitize_nickname(&long).len(),
            constants::nickname::MAX_LENGTH
        );
    }

    #[test]
    fn test_sanitize_empty_falls_back() {
        assert_eq!(sanitize_nickname(""), constants::nickname::FALLBACK);
        assert_eq!(sanitize_nickname("   "), constants::nickname::FALLBACK);
    }

    #[test]
    fn test_sanitize_censors_inappropriate() {
        let censored = sanitize_nickname("fuck");
        assert_ne!(censored, "fuck");
        assert!(!censored.is_empty());
    }
}
