//! Room code normalization and handling
//!
//! Rooms are identified by short codes that players exchange verbally or
//! over chat, so the code is normalized aggressively: whatever the player
//! typed is uppercased, stripped of anything that is not a letter or a
//! digit, and truncated. Every client must apply the exact same rules or
//! two players typing "quiz-1" and "QUIZ 1" would land in different rooms.

use std::{convert::Infallible, fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::constants;

/// A normalized identifier for a room
///
/// The inner string is always non-empty, uppercase alphanumeric, and at
/// most [`constants::room::MAX_CODE_LENGTH`] characters long. Construction
/// goes through [`RoomCode::normalize`], so holding a `RoomCode` is proof
/// that the code is in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes raw player input into a canonical room code
    ///
    /// Trims whitespace, uppercases, drops any character that is not an
    /// ASCII letter or digit, and truncates to the maximum length. If
    /// nothing survives, the fallback code is used so that joining with
    /// an empty field still targets a well-defined room.
    pub fn normalize(raw: &str) -> Self {
        let cleaned: String = raw
            .trim()
            .chars()
            .map(|c| c.to_ascii_uppercase())
            .filter(char::is_ascii_alphanumeric)
            .take(constants::room::MAX_CODE_LENGTH)
            .collect();

        if cleaned.is_empty() {
            Self(constants::room::FALLBACK_CODE.to_owned())
        } else {
            Self(cleaned)
        }
    }

    /// Returns the canonical code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = Infallible;

    /// Parses a room code by normalizing the input
    ///
    /// Normalization always produces a valid code, so this never fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::normalize(s))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uppercases_and_strips() {
        assert_eq!(RoomCode::normalize("quiz-1").as_str(), "QUIZ1");
        assert_eq!(RoomCode::normalize("  room 42  ").as_str(), "ROOM42");
        assert_eq!(RoomCode::normalize("a_b/c").as_str(), "ABC");
    }

    #[test]
    fn test_normalize_truncates() {
        let code = RoomCode::normalize("abcdefghijklmnop");
        assert_eq!(code.as_str().len(), constants::room::MAX_CODE_LENGTH);
        assert_eq!(code.as_str(), "ABCDEFGHIJKL");
    }

    #[test]
    fn test_normalize_empty_falls_back() {
        assert_eq!(RoomCode::normalize("").as_str(), "QUIZ");
        assert_eq!(RoomCode::normalize("  --- ").as_str(), "QUIZ");
    }

    #[test]
    fn test_equivalent_inputs_converge() {
        assert_eq!(RoomCode::normalize("quiz-1"), RoomCode::normalize("QUIZ 1"));
    }

    #[test]
    fn test_serde_round_trip() {
        let code = RoomCode::normalize("ROOM7");
        let serialized = serde_json::to_string(&code).unwrap();
        assert_eq!(serialized, "\"ROOM7\"");

        let deserialized: RoomCode = serde_json::from_str("\"room7\"").unwrap();
        assert_eq!(deserialized, code);
    }
}
