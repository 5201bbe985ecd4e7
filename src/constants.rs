//! Configuration constants for the quiz room protocol
//!
//! This module contains the limits and defaults shared by every client
//! of a room. Most of them mirror values stored on the room document;
//! the ones that do not (subscription caps, tick granularity) only
//! shape the local projection and never reach the store.

/// Room identity and membership constants
pub mod room {
    /// Maximum length of a normalized room code in characters
    pub const MAX_CODE_LENGTH: usize = 12;
    /// Room code used when normalization leaves nothing behind
    pub const FALLBACK_CODE: &str = "QUIZ";
    /// Minimum number of joined players required to start a game
    pub const MIN_PLAYERS: usize = 2;
    /// Maximum number of active players a room is designed for
    pub const MAX_PLAYERS: usize = 5;
}

/// Penalty lock constants
pub mod penalty {
    /// Default length of the global penalty window in seconds
    pub const DEFAULT_SECONDS: u32 = 10;
    /// Recommended granularity of the local countdown timer in milliseconds
    pub const TICK_MILLIS: u64 = 250;
}

/// Wrong-answer gate constants
pub mod gate {
    /// The pre-shared challenge codes, in clearance order
    ///
    /// The N-th trip of the gate requires the N-th code. After all five
    /// have been used the gate is permanently inert for the room.
    pub const CHALLENGE_CODES: [&str; 5] = ["2354", "9156", "4792", "3648", "5937"];
    /// Maximum number of times the gate can trip per room
    pub const MAX_CLEARANCES: u8 = 5;
}

/// Nickname constants
pub mod nickname {
    /// Maximum length of a self-asserted nickname in characters
    pub const MAX_LENGTH: usize = 24;
    /// Nickname used when sanitization leaves nothing behind
    pub const FALLBACK: &str = "Player";
}

/// Chat constants
pub mod chat {
    /// Maximum length of a single chat message in characters
    pub const MAX_MESSAGE_LENGTH: usize = 500;
    /// Number of most recent messages kept in the local projection
    pub const SUBSCRIPTION_LIMIT: usize = 200;
}

/// Answer log constants
pub mod answers {
    /// Number of most recent log entries kept in the local projection
    pub const SUBSCRIPTION_LIMIT: usize = 1000;
}

/// Presence constants
pub mod presence {
    /// Interval between heartbeat writes in milliseconds
    pub const HEARTBEAT_MILLIS: u64 = 5000;
}

/// Question constants
pub mod question {
    /// Minimum number of answer options a question must offer
    pub const MIN_OPTIONS: usize = 2;
    /// Maximum length of a question's text in characters
    pub const MAX_TEXT_LENGTH: usize = 500;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Maximum length of a question's post-answer comment in characters
    pub const MAX_COMMENT_LENGTH: usize = 500;
}
