//! Document store abstraction
//!
//! All coordination between clients happens through a shared, strongly
//! consistent document store; there is no server-side process. This
//! module defines the narrow capability the protocol needs from such a
//! store: point reads, merge-writes, atomic increments, serializable
//! read-modify-write transactions on the room document, and
//! server-assigned timestamps.
//!
//! Snapshot delivery is deliberately absent from the trait: subscription
//! plumbing belongs to the embedding runtime, which feeds snapshots into
//! [`crate::client::RoomClient`] as they arrive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    player::ClientId,
    question::QuestionBank,
    room::{AnswerEntry, ChatMessage, RoomDoc, RoomPatch},
    room_code::RoomCode,
};

pub mod memory;

/// A server-assigned timestamp, milliseconds since the Unix epoch
///
/// Clients never compare their own wall clocks against each other; they
/// only compare store-assigned timestamps against their own clock, which
/// is good enough for deriving countdowns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Reads the local wall clock
    ///
    /// Only store implementations should use this to assign timestamps;
    /// protocol code treats every stored timestamp as opaque server time.
    pub fn now() -> Self {
        let millis = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Creates a timestamp from raw epoch milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as epoch milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns this timestamp shifted forward by a number of milliseconds
    pub fn plus_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Milliseconds elapsed from this timestamp to `later`, zero if earlier
    pub fn millis_until(&self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

/// Errors surfaced by store operations
///
/// A lost transaction race is *not* an error: the transaction simply
/// commits no patch, which [`TxSummary`] reports as `patched == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store connection parameters are incomplete
    ///
    /// Fatal to every store operation; surfaced to the user without any
    /// automatic retry.
    #[error("store configuration is not ready")]
    ConfigNotReady,
    /// No room document exists for the given code
    #[error("room {0} does not exist")]
    RoomNotFound(String),
    /// A non-transactional write failed
    ///
    /// The local projection is not rolled back; state only ever changes
    /// upon snapshot delivery, so there is nothing speculative to undo.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// The store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Writes produced by a room transaction closure
///
/// Both parts commit atomically: other clients either observe the lock
/// patch together with its log entry or neither, never one without the
/// other.
#[derive(Debug, Clone, Default)]
pub struct TxWrites {
    /// Merge patch against the room document, if any
    pub patch: Option<RoomPatch>,
    /// Answer log entry to append alongside the patch, if any
    pub log: Option<AnswerEntry>,
}

/// Summary of a committed room transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSummary {
    /// Whether the transaction wrote a patch to the room document
    ///
    /// `false` means the guard condition declined to write: a normal
    /// outcome (the submission lost the race to arm the lock), not a
    /// failure.
    pub patched: bool,
}

/// The capability the protocol requires from the shared document store
///
/// Implementations must serialize [`DocumentStore::with_room`] calls
/// against each other per room: of two concurrent transactions reading
/// the same room document, one observes the other's committed writes.
/// Non-transactional writes carry no ordering guarantees relative to
/// each other or to transactions; the protocol only issues commutative
/// or idempotent writes through them.
pub trait DocumentStore {
    /// Reads the room document for a code, if the room exists
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached.
    fn load_room(&self, code: &RoomCode) -> Result<Option<RoomDoc>, StoreError>;

    /// Merge-writes a patch into the room document
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`] if the room does not exist,
    /// or another [`StoreError`] if the write fails.
    fn merge_room(&self, code: &RoomCode, patch: &RoomPatch) -> Result<(), StoreError>;

    /// Sets `solved[q_index] = true` on the room document
    ///
    /// Naturally idempotent: re-marking a solved index is a no-op, so
    /// concurrent calls for the same index are safe in any order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn mark_solved(&self, code: &RoomCode, q_index: usize) -> Result<(), StoreError>;

    /// Creates or updates a player entry with merge semantics
    ///
    /// A new entry starts with the given nickname, a zero score, and
    /// both presence timestamps set to server time. An existing entry
    /// only has its nickname and `last_seen` refreshed; in particular,
    /// rejoining never resets the score.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn upsert_player(
        &self,
        code: &RoomCode,
        player_id: ClientId,
        nickname: &str,
    ) -> Result<(), StoreError>;

    /// Refreshes a player's `last_seen` heartbeat timestamp
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn touch_player(&self, code: &RoomCode, player_id: ClientId) -> Result<(), StoreError>;

    /// Atomically increments a player's score
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn increment_score(
        &self,
        code: &RoomCode,
        player_id: ClientId,
        delta: u64,
    ) -> Result<(), StoreError>;

    /// Appends an entry to the room's answer log
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn append_answer(&self, code: &RoomCode, entry: &AnswerEntry) -> Result<(), StoreError>;

    /// Appends a message to the room's chat
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn append_chat(&self, code: &RoomCode, message: &ChatMessage) -> Result<(), StoreError>;

    /// Resolves an administratively managed question set by id
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached.
    fn load_question_set(&self, set_id: &str) -> Result<Option<QuestionBank>, StoreError>;

    /// Runs a serializable read-modify-write transaction on a room
    ///
    /// The closure receives the current room document and the server
    /// time at which the transaction executes, and decides what (if
    /// anything) to write. The store guarantees that of two concurrent
    /// transactions on the same room, one observes the other's writes;
    /// this is what makes the penalty lock's guard condition sound.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`] if the room does not exist,
    /// or another [`StoreError`] if the commit fails.
    fn with_room(
        &self,
        code: &RoomCode,
        update: &mut dyn FnMut(&RoomDoc, Timestamp) -> TxWrites,
    ) -> Result<TxSummary, StoreError>;

    /// Returns the store's current server time
    fn server_timestamp(&self) -> Timestamp;
}
