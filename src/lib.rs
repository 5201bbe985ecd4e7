//! # Quizroom Library
//!
//! This library implements the room-synchronization core of a
//! cooperative multiplayer trivia game. There is no game server: an
//! unbounded number of independent clients (2 to 5 active players per
//! room) coordinate exclusively through a shared, strongly-consistent
//! document store, and this crate contains the rules by which they
//! converge on one authoritative view of the game.
//!
//! The moving parts:
//!
//! - [`client::RoomClient`] drives one player's protocol: joining,
//!   starting, answering, clearing the wrong-answer gate, chatting, and
//!   folding subscription snapshots into a local view.
//! - [`store::DocumentStore`] is the narrow capability required from the
//!   shared store; [`store::memory::MemoryStore`] is a process-local
//!   backend for tests and local play.
//! - [`projection::RoomProjection`] is the pure per-snapshot view every
//!   client recomputes, including completion detection.
//! - [`lock`] and [`gate`] hold the penalty-lock window arithmetic and
//!   the wrong-answer circuit breaker.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod constants;
pub mod gate;
pub mod lock;
pub mod player;
pub mod projection;
pub mod question;
pub mod room;
pub mod room_code;
pub mod store;

pub use client::{AnswerOutcome, ClientError, GateOutcome, Notification, RoomClient};
pub use player::ClientId;
pub use projection::{RoomProjection, Stage};
pub use question::{Question, QuestionBank};
pub use room::RoomDoc;
pub use room_code::RoomCode;
pub use store::{DocumentStore, StoreError, Timestamp};
