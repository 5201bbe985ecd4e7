//! In-memory document store backend
//!
//! A process-local implementation of [`DocumentStore`] backed by a
//! mutex. It exists for tests and local play: the mutex serializes
//! transactions exactly the way the real store serializes them per
//! document, so every concurrency property of the protocol can be
//! exercised against it. Clones share the same underlying state, which
//! is how multiple simulated clients end up in the same "store".
//!
//! Room and question-set provisioning are administrative acts outside
//! the core protocol; this backend exposes them as plain methods.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use itertools::Itertools;

use crate::{
    constants,
    player::{ClientId, PlayerDoc},
    question::QuestionBank,
    room::{AnswerEntry, ChatMessage, RoomDoc, RoomPatch},
    room_code::RoomCode,
};

use super::{DocumentStore, StoreError, Timestamp, TxSummary, TxWrites};

/// Everything stored for one room
#[derive(Debug, Default)]
struct RoomRecord {
    /// The room document itself
    doc: RoomDoc,
    /// Player sub-collection, keyed by client id
    players: HashMap<ClientId, PlayerDoc>,
    /// Chat sub-collection, in write order
    chat: Vec<ChatMessage>,
    /// Answer log sub-collection, in write order
    answers: Vec<AnswerEntry>,
}

/// Shared mutable state behind the store handle
#[derive(Debug, Default)]
struct Inner {
    /// All rooms, keyed by normalized code
    rooms: HashMap<RoomCode, RoomRecord>,
    /// Administratively managed question sets
    question_sets: HashMap<String, QuestionBank>,
    /// Last timestamp handed out, to keep server time strictly monotone
    clock: u64,
}

impl Inner {
    /// Assigns the next server timestamp
    ///
    /// Server time never repeats even within one wall-clock millisecond,
    /// so timestamp order matches write order for this backend.
    fn next_timestamp(&mut self) -> Timestamp {
        let now = Timestamp::now().as_millis();
        self.clock = now.max(self.clock + 1);
        Timestamp::from_millis(self.clock)
    }

    /// Looks up a room record or reports it missing
    fn room_mut(&mut self, code: &RoomCode) -> Result<&mut RoomRecord, StoreError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))
    }
}

/// A cloneable handle to a process-local document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the shared state
    ///
    /// A poisoned mutex means a panic mid-write; recovering the inner
    /// value keeps the remaining tests of a run meaningful.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Provisions a room (administrative act, not part of the protocol)
    pub fn create_room(&self, code: RoomCode, doc: RoomDoc) {
        let mut inner = self.lock();
        inner.rooms.insert(
            code,
            RoomRecord {
                doc,
                ..RoomRecord::default()
            },
        );
    }

    /// Provisions a question set (administrative act)
    pub fn insert_question_set(&self, set_id: &str, bank: QuestionBank) {
        self.lock().question_sets.insert(set_id.to_owned(), bank);
    }

    /// Reads the current room snapshot, as a subscription would deliver it
    pub fn room_snapshot(&self, code: &RoomCode) -> Option<RoomDoc> {
        self.lock().rooms.get(code).map(|record| record.doc.clone())
    }

    /// Reads the player snapshot, ordered by join time
    pub fn players_snapshot(&self, code: &RoomCode) -> Vec<(ClientId, PlayerDoc)> {
        let inner = self.lock();
        let Some(record) = inner.rooms.get(code) else {
            return Vec::new();
        };
        record
            .players
            .iter()
            .map(|(id, doc)| (*id, doc.clone()))
            .sorted_by_key(|(id, doc)| (doc.joined_at, *id))
            .collect()
    }

    /// Reads the chat snapshot, ordered by timestamp, capped like the
    /// live subscription query
    pub fn chat_snapshot(&self, code: &RoomCode) -> Vec<ChatMessage> {
        let inner = self.lock();
        let Some(record) = inner.rooms.get(code) else {
            return Vec::new();
        };
        record
            .chat
            .iter()
            .cloned()
            .sorted_by_key(|message| message.ts)
            .take(constants::chat::SUBSCRIPTION_LIMIT)
            .collect()
    }

    /// Reads the answer log snapshot, ordered by timestamp, capped like
    /// the live subscription query
    pub fn answers_snapshot(&self, code: &RoomCode) -> Vec<AnswerEntry> {
        let inner = self.lock();
        let Some(record) = inner.rooms.get(code) else {
            return Vec::new();
        };
        record
            .answers
            .iter()
            .cloned()
            .sorted_by_key(|entry| entry.ts)
            .take(constants::answers::SUBSCRIPTION_LIMIT)
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    fn load_room(&self, code: &RoomCode) -> Result<Option<RoomDoc>, StoreError> {
        Ok(self.lock().rooms.get(code).map(|record| record.doc.clone()))
    }

    fn merge_room(&self, code: &RoomCode, patch: &RoomPatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.room_mut(code)?.doc.apply(patch);
        Ok(())
    }

    fn mark_solved(&self, code: &RoomCode, q_index: usize) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.room_mut(code)?.doc.mark_solved(q_index);
        Ok(())
    }

    fn upsert_player(
        &self,
        code: &RoomCode,
        player_id: ClientId,
        nickname: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let now = inner.next_timestamp();
        let record = inner.room_mut(code)?;
        match record.players.get_mut(&player_id) {
            Some(player) => {
                player.nickname = nickname.to_owned();
                player.last_seen = now;
            }
            None => {
                record.players.insert(
                    player_id,
                    PlayerDoc {
                        nickname: nickname.to_owned(),
                        score: 0,
                        joined_at: now,
                        last_seen: now,
                    },
                );
            }
        }
        Ok(())
    }

    fn touch_player(&self, code: &RoomCode, player_id: ClientId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let now = inner.next_timestamp();
        let record = inner.room_mut(code)?;
        let player = record
            .players
            .get_mut(&player_id)
            .ok_or_else(|| StoreError::WriteFailed(format!("no player {player_id}")))?;
        player.last_seen = now;
        Ok(())
    }

    fn increment_score(
        &self,
        code: &RoomCode,
        player_id: ClientId,
        delta: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let record = inner.room_mut(code)?;
        let player = record
            .players
            .get_mut(&player_id)
            .ok_or_else(|| StoreError::WriteFailed(format!("no player {player_id}")))?;
        player.score += delta;
        Ok(())
    }

    fn append_answer(&self, code: &RoomCode, entry: &AnswerEntry) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let ts = inner.next_timestamp();
        let record = inner.room_mut(code)?;
        record.answers.push(AnswerEntry {
            ts,
            ..entry.clone()
        });
        Ok(())
    }

    fn append_chat(&self, code: &RoomCode, message: &ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let ts = inner.next_timestamp();
        let record = inner.room_mut(code)?;
        record.chat.push(ChatMessage {
            ts,
            ..message.clone()
        });
        Ok(())
    }

    fn load_question_set(&self, set_id: &str) -> Result<Option<QuestionBank>, StoreError> {
        Ok(self.lock().question_sets.get(set_id).cloned())
    }

    fn with_room(
        &self,
        code: &RoomCode,
        update: &mut dyn FnMut(&RoomDoc, Timestamp) -> TxWrites,
    ) -> Result<TxSummary, StoreError> {
        // The lock is held across read, decision, and commit, which is
        // exactly the serializability the real store promises per room.
        let mut inner = self.lock();
        let now = inner.next_timestamp();
        let record = inner.room_mut(code)?;

        let writes = update(&record.doc, now);
        let patched = writes.patch.is_some();

        if let Some(patch) = &writes.patch {
            record.doc.apply(patch);
        }
        if let Some(entry) = writes.log {
            record.answers.push(AnswerEntry { ts: now, ..entry });
        }

        Ok(TxSummary { patched })
    }

    fn server_timestamp(&self) -> Timestamp {
        self.lock().next_timestamp()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn provisioned_store() -> (MemoryStore, RoomCode) {
        let store = MemoryStore::new();
        let code = RoomCode::normalize("TEST");
        store.create_room(code.clone(), RoomDoc::default());
        (store, code)
    }

    #[test]
    fn test_clones_share_state() {
        let (store, code) = provisioned_store();
        let other = store.clone();
        assert!(other.room_snapshot(&code).is_some());
    }

    #[test]
    fn test_merge_room_missing_room() {
        let store = MemoryStore::new();
        let code = RoomCode::normalize("NOPE");
        let result = store.merge_room(&code, &RoomPatch::default());
        assert_eq!(result, Err(StoreError::RoomNotFound("NOPE".to_owned())));
    }

    #[test]
    fn test_upsert_player_preserves_score() {
        let (store, code) = provisioned_store();
        let id = ClientId::new();

        store.upsert_player(&code, id, "Alice").unwrap();
        store.increment_score(&code, id, 3).unwrap();
        store.upsert_player(&code, id, "Alicia").unwrap();

        let players = store.players_snapshot(&code);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].1.nickname, "Alicia");
        assert_eq!(players[0].1.score, 3);
    }

    #[test]
    fn test_players_ordered_by_join_time() {
        let (store, code) = provisioned_store();
        let first = ClientId::new();
        let second = ClientId::new();

        store.upsert_player(&code, first, "First").unwrap();
        store.upsert_player(&code, second, "Second").unwrap();

        let players = store.players_snapshot(&code);
        assert_eq!(players[0].0, first);
        assert_eq!(players[1].0, second);
    }

    #[test]
    fn test_chat_snapshot_keeps_earliest_messages() {
        let (store, code) = provisioned_store();
        let id = ClientId::new();

        for i in 0..constants::chat::SUBSCRIPTION_LIMIT + 5 {
            store
                .append_chat(
                    &code,
                    &ChatMessage {
                        text: format!("m{i}"),
                        author_id: id,
                        author_nick: "A".to_owned(),
                        ts: Timestamp::default(),
                    },
                )
                .unwrap();
        }

        // Ascending timestamp order with the cap applied from the front,
        // so overflow drops the newest writes, not the oldest.
        let chat = store.chat_snapshot(&code);
        assert_eq!(chat.len(), constants::chat::SUBSCRIPTION_LIMIT);
        assert_eq!(chat[0].text, "m0");
        assert_eq!(
            chat.last().unwrap().text,
            format!("m{}", constants::chat::SUBSCRIPTION_LIMIT - 1)
        );
    }

    #[test]
    fn test_server_timestamps_strictly_increase() {
        let store = MemoryStore::new();
        let a = store.server_timestamp();
        let b = store.server_timestamp();
        assert!(b > a);
    }

    #[test]
    fn test_transaction_observes_prior_commit() {
        let (store, code) = provisioned_store();

        store
            .with_room(&code, &mut |_room, now| TxWrites {
                patch: Some(RoomPatch {
                    locked_at: Some(now),
                    ..RoomPatch::default()
                }),
                log: None,
            })
            .unwrap();

        let mut observed_lock = None;
        store
            .with_room(&code, &mut |room, _now| {
                observed_lock = room.locked_at;
                TxWrites::default()
            })
            .unwrap();

        assert!(observed_lock.is_some());
    }

    #[test]
    fn test_transaction_without_patch_reports_unpatched() {
        let (store, code) = provisioned_store();
        let summary = store
            .with_room(&code, &mut |_room, _now| TxWrites::default())
            .unwrap();
        assert!(!summary.patched);
    }

    #[test]
    fn test_transaction_log_rides_with_patch() {
        let (store, code) = provisioned_store();
        let id = ClientId::new();

        store
            .with_room(&code, &mut |_room, now| TxWrites {
                patch: Some(RoomPatch {
                    locked_at: Some(now),
                    locked_by: Some("A".to_owned()),
                    ..RoomPatch::default()
                }),
                log: Some(AnswerEntry {
                    q_index: 0,
                    correct: false,
                    author_id: id,
                    author_nick: "A".to_owned(),
                    comment: None,
                    choice: Some(2),
                    ts: Timestamp::default(),
                }),
            })
            .unwrap();

        let room = store.room_snapshot(&code).unwrap();
        let answers = store.answers_snapshot(&code);
        assert!(room.locked_at.is_some());
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].choice, Some(2));
        assert_eq!(answers[0].ts, room.locked_at.unwrap());
    }
}
