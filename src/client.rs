//! The per-client room protocol driver
//!
//! [`RoomClient`] is the piece each player process runs: it issues the
//! protocol's writes against the shared store and folds subscription
//! snapshots back into a local projection. There is no peer-to-peer
//! channel anywhere; clients influence each other exclusively through
//! store writes observed via snapshots.
//!
//! The embedding runtime owns the subscription plumbing and the timers:
//! it feeds snapshots into the `observe_*` methods as they arrive, calls
//! [`RoomClient::heartbeat`] on the presence interval, and polls
//! [`RoomClient::projection`] on the countdown tick. The client itself
//! never blocks and never retries; every action either succeeds,
//! no-ops behind a transaction guard, or surfaces one error.

use serde::Serialize;
use thiserror::Error;

use crate::{
    constants,
    gate::{self, GateStatus},
    lock,
    player::{sanitize_nickname, ClientId, PlayerDoc},
    projection::{RoomProjection, Stage},
    question::{fallback_bank, QuestionBank},
    room::{AnswerEntry, ChatMessage, RoomDoc, RoomPatch},
    room_code::RoomCode,
    store::{DocumentStore, StoreError, Timestamp, TxWrites},
};

use rustrict::CensorStr;

/// Errors surfaced by client actions
///
/// The "blocked" variants are ordinary gameplay outcomes a UI renders
/// as disabled affordances; only [`ClientError::Store`] indicates that
/// something actually went wrong underneath.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The client has not joined a room yet
    #[error("not joined to a room")]
    NotJoined,
    /// Someone already started the game
    #[error("the game has already started")]
    AlreadyStarted,
    /// The game has not started yet; answers are not accepted
    #[error("the game has not started")]
    NotStarted,
    /// The player count is outside the startable range
    #[error("starting needs 2 to 5 players, room has {0}")]
    PlayerCount(usize),
    /// The question index does not exist in the effective bank
    #[error("question {0} does not exist")]
    QuestionOutOfRange(usize),
    /// The chosen option index does not exist on the question
    #[error("option {0} does not exist")]
    ChoiceOutOfRange(usize),
    /// The question was already solved by someone
    #[error("question {0} is already solved")]
    AlreadySolved(usize),
    /// The penalty lock blocks all submissions room-wide
    #[error("submissions blocked for {0} more seconds")]
    PenaltyActive(u32),
    /// The wrong-answer gate blocks all submissions room-wide
    #[error("the wrong-answer gate is active")]
    GateActive,
    /// The room is complete; no further submissions are accepted
    #[error("the room is already complete")]
    RoomComplete,
    /// The gate is not awaiting a challenge code
    #[error("no gate challenge is pending")]
    GateNotPending,
    /// The chat message was empty after trimming
    #[error("chat message is empty")]
    EmptyMessage,
    /// The chat message exceeds the length limit
    #[error("chat message is too long")]
    MessageTooLong,
    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of grading and recording an answer submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_more::IsVariant)]
pub enum AnswerOutcome {
    /// The answer was correct and the solve was recorded
    Correct {
        /// The question's comment, surfaced as a transient hint
        hint: Option<String>,
    },
    /// The answer was wrong and was logged
    Wrong {
        /// Whether this submission is the one that armed the penalty
        /// lock (false means a window was already active and the wrong
        /// answer was "free" with respect to both lock and gate counter)
        lock_armed: bool,
    },
}

/// Result of submitting a gate challenge code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::IsVariant)]
pub enum GateOutcome {
    /// The code matched; the counter was reset and the sequence advanced
    Cleared {
        /// 1-based number of the challenge that was cleared
        task_number: u8,
    },
    /// The code did not match; no state changed, retrying is allowed
    Rejected,
}

/// Client-local events derived from snapshot transitions
///
/// These are transient, per-client notifications (a toast, a sound), not
/// shared state: two clients observing the same snapshots derive the
/// same events independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Notification {
    /// The game started (observed `started` flip to true)
    GameStarted {
        /// Server timestamp of the start, when already stamped
        started_at: Option<Timestamp>,
    },
    /// A wrong answer armed the penalty lock
    LockArmed {
        /// Nickname of the player who caused it
        by: String,
        /// Seconds the window will run from its epoch
        seconds: u32,
    },
    /// The wrong-answer gate tripped
    GateTripped {
        /// 1-based number of the challenge now required
        task_number: u8,
    },
    /// A gate challenge was cleared (by anyone in the room)
    GateCleared {
        /// 1-based number of the cleared challenge
        task_number: u8,
    },
    /// Every question is solved; fires exactly once per client
    RoomCompleted {
        /// The room's configured completion message
        message: String,
    },
}

/// A single client's handle on one room
///
/// Owns the store handle (injected at construction, never a global) and
/// all client-local state: the latest snapshots, the pre-start candidate
/// bank, and the one-shot completion flag.
pub struct RoomClient<S: DocumentStore> {
    /// The injected store handle
    store: S,
    /// This client's locally generated id
    client_id: ClientId,
    /// This client's sanitized nickname
    nickname: String,
    /// The room joined, if any
    joined: Option<RoomCode>,
    /// Latest room snapshot
    room: Option<RoomDoc>,
    /// Pre-start candidate bank (import or default), superseded by the
    /// published bank
    local_bank: Option<QuestionBank>,
    /// Latest player snapshot, ordered by join time
    players: Vec<(ClientId, PlayerDoc)>,
    /// Latest chat snapshot
    chat: Vec<ChatMessage>,
    /// Latest answer log snapshot
    answers: Vec<AnswerEntry>,
    /// One-shot guard so repeated snapshots never replay the completion
    /// side effect
    celebrated: bool,
    /// Local time at which this client first observed completion
    completed_at: Option<Timestamp>,
}

impl<S: DocumentStore> RoomClient<S> {
    /// Creates a client with a fresh random id
    pub fn new(store: S, nickname: &str) -> Self {
        Self::with_id(store, ClientId::new(), nickname)
    }

    /// Creates a client reusing a previously generated id
    ///
    /// Clients persist their id locally so that rejoining a room updates
    /// the existing player entry instead of duplicating it.
    pub fn with_id(store: S, client_id: ClientId, nickname: &str) -> Self {
        Self {
            store,
            client_id,
            nickname: sanitize_nickname(nickname),
            joined: None,
            room: None,
            local_bank: None,
            players: Vec::new(),
            chat: Vec::new(),
            answers: Vec::new(),
            celebrated: false,
            completed_at: None,
        }
    }

    /// This client's id
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// This client's sanitized nickname
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// The latest player snapshot, ordered by join time
    pub fn players(&self) -> &[(ClientId, PlayerDoc)] {
        &self.players
    }

    /// The latest chat snapshot
    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    /// The latest answer log snapshot
    pub fn answers(&self) -> &[AnswerEntry] {
        &self.answers
    }

    /// Supplies the pre-start candidate question bank
    ///
    /// Used only until the store publishes a bank; once a non-empty
    /// `bank.items` exists on the room document, the candidate is
    /// permanently superseded.
    pub fn set_local_bank(&mut self, bank: QuestionBank) {
        self.local_bank = Some(bank);
    }

    /// Joins a room by code
    ///
    /// Normalizes the code, requires the room document to exist (room
    /// creation is an administrative act, not a player act), and upserts
    /// this client's player entry with merge semantics. Returns the
    /// notifications derived from the initial room snapshot, so a join
    /// into an already-running game resumes directly.
    ///
    /// # Errors
    ///
    /// [`StoreError::RoomNotFound`] if no room exists for the code, or
    /// another store error if the store is unreachable.
    pub fn join(&mut self, raw_code: &str) -> Result<Vec<Notification>, ClientError> {
        let code = RoomCode::normalize(raw_code);

        let room = self
            .store
            .load_room(&code)?
            .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))?;

        self.store
            .upsert_player(&code, self.client_id, &self.nickname)?;
        self.joined = Some(code);

        Ok(self.ingest_room(room))
    }

    /// Whether this client may start the game right now
    pub fn can_start(&self) -> bool {
        let Some(room) = &self.room else {
            return false;
        };
        !room.started
            && (constants::room::MIN_PLAYERS..=constants::room::MAX_PLAYERS)
                .contains(&self.players.len())
    }

    /// Starts the game
    ///
    /// Resolves the bank to freeze (assigned question set, then local
    /// candidate, then the built-in fallback) and publishes it together
    /// with a fresh empty solved set, the server-stamped start time, and
    /// `started = true` in one atomic merge, so no client can observe a
    /// started room with a stale or missing bank.
    ///
    /// # Errors
    ///
    /// [`ClientError::AlreadyStarted`] if the room is already running,
    /// [`ClientError::PlayerCount`] if the membership is outside [2, 5],
    /// or a store error.
    pub fn start(&mut self) -> Result<(), ClientError> {
        let code = self.joined.clone().ok_or(ClientError::NotJoined)?;
        let room = self.room.as_ref().ok_or(ClientError::NotJoined)?;

        if room.started {
            return Err(ClientError::AlreadyStarted);
        }
        let player_count = self.players.len();
        if !(constants::room::MIN_PLAYERS..=constants::room::MAX_PLAYERS).contains(&player_count) {
            return Err(ClientError::PlayerCount(player_count));
        }

        let bank = self.resolve_start_bank(room)?;

        self.store.merge_room(
            &code,
            &RoomPatch {
                started: Some(true),
                bank: Some(bank),
                solved: Some(Default::default()),
                game_started_at: Some(self.store.server_timestamp()),
                ..RoomPatch::default()
            },
        )?;

        Ok(())
    }

    /// Resolves which bank a start action publishes
    fn resolve_start_bank(&self, room: &RoomDoc) -> Result<QuestionBank, ClientError> {
        if let Some(set_id) = &room.question_set_id
            && let Some(bank) = self.store.load_question_set(set_id)?
            && !bank.is_empty()
        {
            return Ok(bank);
        }
        if let Some(bank) = &self.local_bank
            && !bank.is_empty()
        {
            return Ok(bank.clone());
        }
        Ok(fallback_bank())
    }

    /// Submits an answer for a question
    ///
    /// Grading happens here, client-side, against the effective bank;
    /// the store records only the consequences. The correct path issues
    /// three independent idempotent-or-commutative writes (score
    /// increment, solved flag, log append). The wrong path runs the
    /// penalty lock guard inside a serializable transaction that also
    /// carries the log entry, and increments the gate counter only when
    /// this submission is the one that armed the lock.
    ///
    /// # Errors
    ///
    /// A precondition error when the stage, the gate, the lock, prior
    /// solves, or completion block the submission; otherwise a store
    /// error.
    pub fn submit_answer(
        &mut self,
        q_index: usize,
        choice: usize,
    ) -> Result<AnswerOutcome, ClientError> {
        let code = self.joined.clone().ok_or(ClientError::NotJoined)?;
        let room = self.room.as_ref().ok_or(ClientError::NotJoined)?;

        let projection = RoomProjection::project(room, self.local_bank.as_ref(), Timestamp::now());

        // Answers are only accepted while the room is running; a
        // pre-start solve would be erased by the start merge's fresh
        // solved set while the score credit stuck.
        if projection.stage == Stage::PreStart {
            return Err(ClientError::NotStarted);
        }
        if projection.all_solved {
            return Err(ClientError::RoomComplete);
        }
        if projection.gate.is_blocking() {
            return Err(ClientError::GateActive);
        }
        if projection.lock_active() {
            return Err(ClientError::PenaltyActive(
                projection.lock_remaining_seconds,
            ));
        }
        let question = projection
            .effective_questions
            .get(q_index)
            .ok_or(ClientError::QuestionOutOfRange(q_index))?;
        if choice >= question.options.len() {
            return Err(ClientError::ChoiceOutOfRange(choice));
        }
        if projection.is_solved(q_index) {
            return Err(ClientError::AlreadySolved(q_index));
        }

        if choice == question.answer {
            let hint = question.trimmed_comment().map(str::to_owned);

            // Three independent writes; each is idempotent or
            // commutative, so no ordering or exclusion is needed. A
            // crash between them leaves a best-effort partial state.
            self.store.increment_score(&code, self.client_id, 1)?;
            self.store.mark_solved(&code, q_index)?;
            self.store.append_answer(
                &code,
                &AnswerEntry {
                    q_index,
                    correct: true,
                    author_id: self.client_id,
                    author_nick: self.nickname.clone(),
                    comment: hint.clone(),
                    choice: None,
                    ts: Timestamp::default(),
                },
            )?;

            Ok(AnswerOutcome::Correct { hint })
        } else {
            let author_id = self.client_id;
            let author_nick = self.nickname.clone();

            let summary = self.store.with_room(&code, &mut |room, now| {
                let entry = AnswerEntry {
                    q_index,
                    correct: false,
                    author_id,
                    author_nick: author_nick.clone(),
                    comment: None,
                    choice: Some(choice),
                    ts: Timestamp::default(),
                };

                // A wrong answer landing inside an active window arms
                // nothing and does not re-increment the gate counter; it
                // is still logged, atomically with whatever we write.
                if lock::is_active(room.locked_at, room.penalty_seconds, now) {
                    TxWrites {
                        patch: None,
                        log: Some(entry),
                    }
                } else {
                    TxWrites {
                        patch: Some(RoomPatch {
                            locked_at: Some(now),
                            locked_by: Some(author_nick.clone()),
                            wrong_answer_count: Some(room.wrong_answer_count + 1),
                            ..RoomPatch::default()
                        }),
                        log: Some(entry),
                    }
                }
            })?;

            Ok(AnswerOutcome::Wrong {
                lock_armed: summary.patched,
            })
        }
    }

    /// Submits a challenge code to clear a tripped gate
    ///
    /// On match, resets the wrong-answer counter and advances the
    /// clearance sequence in one absolute-value merge, so concurrent
    /// clearances of the same challenge converge. On mismatch nothing
    /// changes and the challenger may retry.
    ///
    /// # Errors
    ///
    /// [`ClientError::GateNotPending`] when the gate has not tripped,
    /// or a store error.
    pub fn submit_gate_code(&mut self, submitted: &str) -> Result<GateOutcome, ClientError> {
        let code = self.joined.clone().ok_or(ClientError::NotJoined)?;
        let room = self.room.as_ref().ok_or(ClientError::NotJoined)?;

        let GateStatus::Tripped { task_number } = gate::status(room) else {
            return Err(ClientError::GateNotPending);
        };

        if !gate::verify_code(room.completed_tasks, submitted) {
            return Ok(GateOutcome::Rejected);
        }

        self.store.merge_room(
            &code,
            &RoomPatch {
                wrong_answer_count: Some(0),
                completed_tasks: Some(task_number),
                ..RoomPatch::default()
            },
        )?;

        Ok(GateOutcome::Cleared { task_number })
    }

    /// Sends a chat message
    ///
    /// # Errors
    ///
    /// [`ClientError::EmptyMessage`] or [`ClientError::MessageTooLong`]
    /// on invalid input, or a store error.
    pub fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        let code = self.joined.clone().ok_or(ClientError::NotJoined)?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if trimmed.chars().count() > constants::chat::MAX_MESSAGE_LENGTH {
            return Err(ClientError::MessageTooLong);
        }

        self.store.append_chat(
            &code,
            &ChatMessage {
                text: trimmed.censor(),
                author_id: self.client_id,
                author_nick: self.nickname.clone(),
                ts: Timestamp::default(),
            },
        )?;

        Ok(())
    }

    /// Refreshes this client's presence heartbeat
    ///
    /// Call on the [`constants::presence::HEARTBEAT_MILLIS`] interval
    /// while connected.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails; callers surface it as a
    /// non-blocking notice, nothing is rolled back or retried.
    pub fn heartbeat(&self) -> Result<(), ClientError> {
        let code = self.joined.as_ref().ok_or(ClientError::NotJoined)?;
        self.store.touch_player(code, self.client_id)?;
        Ok(())
    }

    /// Ingests a room snapshot from the live subscription
    ///
    /// Returns the client-local events derived from the transition
    /// between the previous snapshot and this one.
    pub fn observe_room(&mut self, snapshot: RoomDoc) -> Vec<Notification> {
        self.ingest_room(snapshot)
    }

    /// Ingests a player snapshot from the live subscription
    pub fn observe_players(&mut self, players: Vec<(ClientId, PlayerDoc)>) {
        self.players = players;
    }

    /// Ingests a chat snapshot from the live subscription
    pub fn observe_chat(&mut self, chat: Vec<ChatMessage>) {
        self.chat = chat;
    }

    /// Ingests an answer log snapshot from the live subscription
    pub fn observe_answers(&mut self, answers: Vec<AnswerEntry>) {
        self.answers = answers;
    }

    /// Computes the current projection of the room
    ///
    /// Recomputed per call from the latest snapshot; `now` is the local
    /// clock, compared only against store-assigned timestamps. Returns
    /// `None` before the first room snapshot arrives.
    pub fn projection(&self, now: Timestamp) -> Option<RoomProjection> {
        self.room
            .as_ref()
            .map(|room| RoomProjection::project(room, self.local_bank.as_ref(), now))
    }

    /// Seconds elapsed since the game started
    ///
    /// Frozen at the moment this client observed completion. `None`
    /// before the start time is stamped.
    pub fn elapsed_seconds(&self, now: Timestamp) -> Option<u64> {
        let started_at = self.room.as_ref()?.game_started_at?;
        let end = self.completed_at.unwrap_or(now);
        Some(started_at.millis_until(end) / 1000)
    }

    /// Folds a room snapshot into local state and derives events
    fn ingest_room(&mut self, snapshot: RoomDoc) -> Vec<Notification> {
        let mut events = Vec::new();
        let now = Timestamp::now();
        let previous = self.room.take();

        let previously_started = previous.as_ref().is_some_and(|room| room.started);
        if snapshot.started && !previously_started {
            events.push(Notification::GameStarted {
                started_at: snapshot.game_started_at,
            });
        }

        // Only live windows announce themselves: the lock fields are
        // set-only, so a first snapshot of a long-idle room still
        // carries the last expired epoch.
        let previous_lock = previous.as_ref().and_then(|room| room.locked_at);
        if snapshot.locked_at.is_some()
            && snapshot.locked_at != previous_lock
            && lock::is_active(snapshot.locked_at, snapshot.penalty_seconds, now)
        {
            events.push(Notification::LockArmed {
                by: snapshot.locked_by.clone(),
                seconds: snapshot.penalty_seconds,
            });
        }

        let was_tripped = matches!(
            previous.as_ref().map(|room| gate::status(room)),
            Some(GateStatus::Tripped { .. })
        );
        if let GateStatus::Tripped { task_number } = gate::status(&snapshot)
            && !was_tripped
        {
            events.push(Notification::GateTripped { task_number });
        }
        if let Some(previous_room) = &previous
            && snapshot.completed_tasks > previous_room.completed_tasks
        {
            events.push(Notification::GateCleared {
                task_number: snapshot.completed_tasks,
            });
        }

        let projection = RoomProjection::project(&snapshot, self.local_bank.as_ref(), now);
        if projection.all_solved && !self.celebrated {
            self.celebrated = true;
            self.completed_at = Some(now);
            events.push(Notification::RoomCompleted {
                message: projection.completion_message.clone(),
            });
        }

        self.room = Some(snapshot);
        events
    }
}
