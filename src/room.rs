//! Room document model and merge-write patches
//!
//! The room document is the single authoritative record of a game
//! session. Every client derives its entire view from the latest
//! snapshot of this document plus the three sub-collections (players,
//! chat, answer log); nothing of consequence is kept client-side.
//!
//! Fields follow store merge semantics: documents may be sparse (an
//! administratively created room can omit most fields), so everything
//! deserializes with a default. Wire names are camelCase to match the
//! stored document shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
    constants,
    player::ClientId,
    question::QuestionBank,
    store::Timestamp,
};

/// Default penalty window length used when the room document omits one
fn default_penalty_seconds() -> u32 {
    constants::penalty::DEFAULT_SECONDS
}

/// The authoritative per-room document
///
/// Mutated by every joined client through merge-writes and transactions.
/// The invariants worth keeping in mind:
///
/// - `started` becomes true exactly once and is never unset.
/// - `bank`, once non-empty, never changes for the room's lifetime.
/// - `solved` only ever grows; keys are sparse question indices.
/// - `locked_at`/`locked_by` are set-only; an expired window is detected
///   by time arithmetic, never by clearing the fields.
/// - `completed_tasks` is monotone non-decreasing, capped at 5.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDoc {
    /// Whether any client has started the game
    #[serde(default)]
    pub started: bool,
    /// The question bank frozen at start time, if published
    #[serde(default)]
    pub bank: Option<QuestionBank>,
    /// Sparse set of solved question indices (values are always true)
    #[serde(default)]
    pub solved: BTreeMap<usize, bool>,
    /// Server timestamp of the most recent penalty lock activation
    #[serde(default)]
    pub locked_at: Option<Timestamp>,
    /// Nickname of the player whose wrong answer armed the current lock
    #[serde(default)]
    pub locked_by: String,
    /// Length of the penalty window in seconds
    #[serde(default = "default_penalty_seconds")]
    pub penalty_seconds: u32,
    /// Wrong answers required to trip the gate; 0 disables the gate
    #[serde(default)]
    pub wrong_answer_limit: u32,
    /// Wrong answers accumulated since the last gate clearance
    #[serde(default)]
    pub wrong_answer_count: u32,
    /// Number of gate challenges cleared so far (0..=5)
    #[serde(default)]
    pub completed_tasks: u8,
    /// Message revealed to every client once all questions are solved
    #[serde(default)]
    pub completion_message: String,
    /// Server timestamp of the game start, set once
    #[serde(default)]
    pub game_started_at: Option<Timestamp>,
    /// Reference to an administratively managed question set
    #[serde(default)]
    pub question_set_id: Option<String>,
}

impl Default for RoomDoc {
    fn default() -> Self {
        Self {
            started: false,
            bank: None,
            solved: BTreeMap::new(),
            locked_at: None,
            locked_by: String::new(),
            penalty_seconds: constants::penalty::DEFAULT_SECONDS,
            wrong_answer_limit: 0,
            wrong_answer_count: 0,
            completed_tasks: 0,
            completion_message: String::new(),
            game_started_at: None,
            question_set_id: None,
        }
    }
}

impl RoomDoc {
    /// Marks a question index as solved
    ///
    /// Re-marking an already-solved index is a no-op, which is exactly
    /// what makes concurrent correct answers to the same question safe
    /// without any coordination.
    pub fn mark_solved(&mut self, q_index: usize) {
        self.solved.insert(q_index, true);
    }

    /// Applies a merge patch to this document
    ///
    /// Only fields present in the patch are touched; everything else is
    /// left as-is, mirroring the store's merge-write semantics. Backends
    /// share this so merge behavior cannot drift between them.
    pub fn apply(&mut self, patch: &RoomPatch) {
        if let Some(started) = patch.started {
            self.started = started;
        }
        if let Some(bank) = &patch.bank {
            self.bank = Some(bank.clone());
        }
        if let Some(solved) = &patch.solved {
            self.solved = solved.clone();
        }
        if let Some(locked_at) = patch.locked_at {
            self.locked_at = Some(locked_at);
        }
        if let Some(locked_by) = &patch.locked_by {
            self.locked_by = locked_by.clone();
        }
        if let Some(count) = patch.wrong_answer_count {
            self.wrong_answer_count = count;
        }
        if let Some(tasks) = patch.completed_tasks {
            self.completed_tasks = tasks;
        }
        if let Some(started_at) = patch.game_started_at {
            self.game_started_at = Some(started_at);
        }
    }
}

/// A merge-write patch against a room document
///
/// `None` fields are left untouched by the merge. Only the fields the
/// protocol actually writes are representable; administrative fields
/// (penalty configuration, completion message, question-set assignment)
/// are out of the core's reach by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPatch {
    /// Sets the started flag
    pub started: Option<bool>,
    /// Publishes the frozen question bank
    pub bank: Option<QuestionBank>,
    /// Replaces the solved set (only ever with an empty one, at start)
    pub solved: Option<BTreeMap<usize, bool>>,
    /// Arms the penalty lock at the given server timestamp
    pub locked_at: Option<Timestamp>,
    /// Records who armed the lock
    pub locked_by: Option<String>,
    /// Sets the accumulated wrong-answer count to an absolute value
    pub wrong_answer_count: Option<u32>,
    /// Sets the cleared-challenge count to an absolute value
    pub completed_tasks: Option<u8>,
    /// Stamps the game start time
    pub game_started_at: Option<Timestamp>,
}

/// One append-only answer log entry
///
/// Written for every submission that reached the store, correct or not.
/// Wrong answers record the chosen option; first-correct answers carry
/// the question's trimmed comment as a hint for the rest of the team.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    /// Index of the question this submission targeted
    pub q_index: usize,
    /// Whether the submission was graded correct
    pub correct: bool,
    /// Id of the submitting client
    pub author_id: ClientId,
    /// Nickname of the submitting client at submission time
    pub author_nick: String,
    /// The question's hint, present only on first-correct submissions
    pub comment: Option<String>,
    /// The chosen option index, recorded on wrong answers
    pub choice: Option<usize>,
    /// Server timestamp of the write
    pub ts: Timestamp,
}

/// One append-only chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// The message text, trimmed and non-empty
    pub text: String,
    /// Id of the sending client
    pub author_id: ClientId,
    /// Nickname of the sending client
    pub author_nick: String,
    /// Server timestamp of the write
    pub ts: Timestamp,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_document_deserializes_with_defaults() {
        let room: RoomDoc = serde_json::from_str("{}").unwrap();
        assert!(!room.started);
        assert!(room.bank.is_none());
        assert!(room.solved.is_empty());
        assert_eq!(room.penalty_seconds, constants::penalty::DEFAULT_SECONDS);
        assert_eq!(room.wrong_answer_limit, 0);
        assert_eq!(room.completed_tasks, 0);
    }

    #[test]
    fn test_mark_solved_is_idempotent() {
        let mut room = RoomDoc::default();
        room.mark_solved(3);
        room.mark_solved(3);
        assert_eq!(room.solved.len(), 1);
        assert_eq!(room.solved.get(&3), Some(&true));
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut room = RoomDoc {
            wrong_answer_count: 2,
            ..RoomDoc::default()
        };

        room.apply(&RoomPatch {
            started: Some(true),
            ..RoomPatch::default()
        });

        assert!(room.started);
        assert_eq!(room.wrong_answer_count, 2);
        assert!(room.locked_at.is_none());
    }

    #[test]
    fn test_apply_never_clears_lock_fields() {
        let mut room = RoomDoc {
            locked_at: Some(Timestamp::from_millis(1000)),
            locked_by: "A".to_owned(),
            ..RoomDoc::default()
        };

        room.apply(&RoomPatch::default());

        assert_eq!(room.locked_at, Some(Timestamp::from_millis(1000)));
        assert_eq!(room.locked_by, "A");
    }

    #[test]
    fn test_solved_map_wire_shape() {
        let mut room = RoomDoc::default();
        room.mark_solved(0);
        room.mark_solved(4);

        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(value["solved"]["0"], true);
        assert_eq!(value["solved"]["4"], true);
    }
}
