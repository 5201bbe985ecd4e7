//! Locally computed view of the shared room state
//!
//! Every client derives its entire UI state by projecting the latest
//! room snapshot plus any locally held candidate bank. The projection is
//! a pure function recomputed on every snapshot: no cached state machine
//! that could drift between clients, so all observers of the same
//! snapshot agree on the same stage, the same solved count, and the same
//! completion verdict.

use std::collections::BTreeMap;

use crate::{
    gate::{self, GateStatus},
    lock,
    question::{Question, QuestionBank},
    room::RoomDoc,
    store::Timestamp,
};

/// The global stage of a room, shared by all players
///
/// Transitions fire independently on each client the instant it observes
/// the triggering snapshot: `PreStart -> Running` when `started` becomes
/// true, `Running -> Complete` when the solved set covers the bank.
/// `Complete` is terminal; well-behaved clients submit nothing past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The room exists but no client has started the game
    PreStart,
    /// The game is running and questions are open
    Running,
    /// Every question is solved
    Complete,
}

/// A consistent, locally derived view of one room snapshot
#[derive(Debug, Clone)]
pub struct RoomProjection {
    /// The questions every client should display, in order
    pub effective_questions: Vec<Question>,
    /// Sparse set of solved question indices
    pub solved: BTreeMap<usize, bool>,
    /// Number of solved questions
    pub solved_count: usize,
    /// Total number of questions
    pub total_count: usize,
    /// Whether every question is solved
    pub all_solved: bool,
    /// The room's global stage
    pub stage: Stage,
    /// Whole seconds left in the penalty window, zero when unlocked
    pub lock_remaining_seconds: u32,
    /// Nickname of whoever armed the current lock (empty if never armed)
    pub locked_by: String,
    /// Derived wrong-answer gate status
    pub gate: GateStatus,
    /// The room's configured completion message
    pub completion_message: String,
}

impl RoomProjection {
    /// Projects a room snapshot into a local view
    ///
    /// `local_bank` is the client's pre-start candidate set; it only
    /// matters until the store publishes `bank.items`, after which every
    /// client converges on the published bank regardless of local state.
    /// `now` is the client's clock, used solely against store-assigned
    /// timestamps.
    pub fn project(room: &RoomDoc, local_bank: Option<&QuestionBank>, now: Timestamp) -> Self {
        let effective_questions = effective_questions(room, local_bank);
        let solved = room.solved.clone();
        let solved_count = solved.len();
        let total_count = effective_questions.len();
        let all_solved = total_count > 0 && solved_count >= total_count;

        let stage = if all_solved {
            Stage::Complete
        } else if room.started {
            Stage::Running
        } else {
            Stage::PreStart
        };

        Self {
            effective_questions,
            solved,
            solved_count,
            total_count,
            all_solved,
            stage,
            lock_remaining_seconds: lock::remaining_seconds(
                room.locked_at,
                room.penalty_seconds,
                now,
            ),
            locked_by: room.locked_by.clone(),
            gate: gate::status(room),
            completion_message: room.completion_message.clone(),
        }
    }

    /// Whether a specific question index is solved
    pub fn is_solved(&self, q_index: usize) -> bool {
        self.solved.contains_key(&q_index)
    }

    /// Whether the penalty lock currently blocks submissions
    pub fn lock_active(&self) -> bool {
        self.lock_remaining_seconds > 0
    }
}

/// Resolves the question sequence a client should display
///
/// Priority is deterministic so all clients converge once started: the
/// published bank wins if non-empty, then the local candidate, then an
/// empty sequence.
fn effective_questions(room: &RoomDoc, local_bank: Option<&QuestionBank>) -> Vec<Question> {
    if let Some(bank) = &room.bank
        && !bank.is_empty()
    {
        return bank.items.clone();
    }
    local_bank.map(|bank| bank.items.clone()).unwrap_or_default()
}
