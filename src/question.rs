//! Question bank definitions, validation, and the built-in fallback set
//!
//! Question payloads arrive from externally-sourced JSON (imports, the
//! administrative question-set directory) and are only loosely trusted:
//! validation is permissive, keeping every entry that can be understood
//! and reporting the rest with a reason instead of rejecting the whole
//! payload. Once a bank is frozen into a room at start time it is never
//! modified again.

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::constants;

/// A single multiple-choice question
///
/// The `answer` index is the position of the correct option. Grading is
/// performed client-side against this field; the store never evaluates
/// answers itself.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question text shown to players
    #[garde(length(min = 1, max = constants::question::MAX_TEXT_LENGTH))]
    pub q: String,
    /// The answer options, at least two
    #[garde(
        length(min = constants::question::MIN_OPTIONS),
        inner(length(max = constants::question::MAX_OPTION_LENGTH))
    )]
    pub options: Vec<String>,
    /// Index of the correct option
    #[garde(custom(answer_in_range(&self.options)))]
    pub answer: usize,
    /// Optional comment revealed after a correct answer
    #[garde(inner(length(max = constants::question::MAX_COMMENT_LENGTH)))]
    pub comment: Option<String>,
}

/// Garde rule checking that the answer index points into the options
fn answer_in_range(options: &[String]) -> impl FnOnce(&usize, &()) -> garde::Result + '_ {
    move |answer, _| {
        if *answer < options.len() {
            Ok(())
        } else {
            Err(garde::Error::new("answer index out of range"))
        }
    }
}

impl Question {
    /// Returns the question's comment, trimmed, if it carries one
    ///
    /// Whitespace-only comments count as absent; this is the value that
    /// gets attached to first-correct answer log entries as a hint.
    pub fn trimmed_comment(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// An ordered sequence of questions frozen into a room at start time
///
/// Once a room document carries a non-empty bank, the bank is immutable
/// for the lifetime of the room and takes priority over any locally held
/// candidate set on every client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    /// The questions, in presentation order
    pub items: Vec<Question>,
}

impl QuestionBank {
    /// Returns the number of questions in the bank
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks whether the bank contains no questions
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Reason a payload entry was rejected during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum RejectReason {
    /// The entry is not a JSON object
    #[error("entry is not an object")]
    NotAnObject,
    /// The entry has no usable question text
    #[error("missing question text")]
    MissingText,
    /// Fewer than two string options survived filtering
    #[error("fewer than two answer options")]
    TooFewOptions,
    /// The answer index is missing, negative, or out of range
    #[error("answer index missing or out of range")]
    BadAnswerIndex,
}

/// Outcome of validating an externally-sourced question payload
///
/// Validation never fails as a whole: well-formed entries are collected
/// into `accepted` while malformed ones are reported in `rejected` with
/// their original position and a reason, so callers can surface what was
/// dropped instead of silently shrinking the set.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Entries that passed validation, in payload order
    pub accepted: Vec<Question>,
    /// Positions and reasons for entries that were dropped
    pub rejected: Vec<(usize, RejectReason)>,
}

impl ValidationReport {
    /// Converts the accepted entries into a bank, discarding the report
    pub fn into_bank(self) -> QuestionBank {
        QuestionBank {
            items: self.accepted,
        }
    }
}

/// Validates a question payload permissively
///
/// Accepts either a bare JSON array of entries or an object with a
/// `questions` array. Each entry needs a string `q`, an `options` array
/// (non-string elements are dropped, at least two must remain), and an
/// integer `answer` indexing into the surviving options. A `comment`
/// string is optional; `explanation` is accepted as a legacy alias.
pub fn validate_payload(payload: &Value) -> ValidationReport {
    let entries = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("questions") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let mut report = ValidationReport::default();

    for (index, entry) in entries.iter().enumerate() {
        match validate_entry(entry) {
            Ok(question) => report.accepted.push(question),
            Err(reason) => report.rejected.push((index, reason)),
        }
    }

    report
}

/// Validates a single payload entry
fn validate_entry(entry: &Value) -> Result<Question, RejectReason> {
    let object = entry.as_object().ok_or(RejectReason::NotAnObject)?;

    let q = object
        .get("q")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or(RejectReason::MissingText)?
        .to_owned();

    let options: Vec<String> = object
        .get("options")
        .and_then(Value::as_array)
        .map(|raw| {
            raw.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    if options.len() < constants::question::MIN_OPTIONS {
        return Err(RejectReason::TooFewOptions);
    }

    let answer = object
        .get("answer")
        .and_then(Value::as_u64)
        .map(|raw| raw as usize)
        .filter(|answer| *answer < options.len())
        .ok_or(RejectReason::BadAnswerIndex)?;

    let comment = object
        .get("comment")
        .or_else(|| object.get("explanation"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(Question {
        q,
        options,
        answer,
        comment,
    })
}

/// Returns the built-in question bank
///
/// Used when a room is started without an assigned question set and the
/// starting client holds no imported candidate either, so a start action
/// always has something to publish.
pub fn fallback_bank() -> QuestionBank {
    let questions = [
        (
            "Which planet is known as the Red Planet?",
            ["Venus", "Mars", "Jupiter", "Mercury"],
            1,
        ),
        (
            "What is the chemical symbol for gold?",
            ["Au", "Ag", "Go", "Gd"],
            0,
        ),
        (
            "How many minutes are in a full day?",
            ["1240", "1380", "1440", "1560"],
            2,
        ),
        (
            "Which ocean is the largest by area?",
            ["Atlantic", "Indian", "Arctic", "Pacific"],
            3,
        ),
        (
            "What gas do plants primarily absorb from the air?",
            ["Oxygen", "Nitrogen", "Carbon dioxide", "Hydrogen"],
            2,
        ),
    ];

    QuestionBank {
        items: questions
            .into_iter()
            .map(|(q, options, answer)| Question {
                q: q.to_owned(),
                options: options.map(str::to_owned).to_vec(),
                answer,
                comment: None,
            })
            .collect(),
    }
}
