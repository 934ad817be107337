//! Error types for every layer of the game.
//!
//! Everything here is recoverable: the caller (usually a UI) turns these into
//! user-facing feedback. Broken internal invariants panic instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::puzzle::{Digit, Letter};
use crate::river::CharacterId;

fn join_letters(letters: &[Letter]) -> String {
    letters
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rejected puzzle definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("word {index} is empty")]
    EmptyWord { index: usize },
    #[error("'{symbol}' in word {word} is not an uppercase letter A-Z")]
    InvalidSymbol { word: String, symbol: char },
    #[error("word {word} has {len} letters, at most {max} are supported")]
    WordTooLong { word: String, len: usize, max: usize },
    #[error("puzzle uses {count} distinct letters, at most 10 can be mapped to digits")]
    TooManyLetters { count: usize },
    #[error(
        "letter list does not match the words (missing: [{}], extra: [{}])",
        join_letters(.missing),
        join_letters(.extra)
    )]
    LetterMismatch {
        missing: Vec<Letter>,
        extra: Vec<Letter>,
    },
}

/// The four cryptarithmetic rules, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing assignments for: {}", join_letters(.0))]
    MissingAssignment(Vec<Letter>),
    #[error("assignments for letters not in the puzzle: {}", join_letters(.0))]
    UnknownLetter(Vec<Letter>),
    #[error("digit {digit} is assigned to more than one letter: {}", join_letters(.letters))]
    DuplicateDigit { digit: Digit, letters: Vec<Letter> },
    #[error("leading letter '{0}' cannot be zero")]
    LeadingZero(Letter),
    #[error("incorrect: operands add up to {computed_sum}, but the result reads {expected}")]
    ArithmeticMismatch { computed_sum: u64, expected: u64 },
}

/// Rejected river-engine transitions. None of these mutate the state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiverError {
    #[error("the crossing is over")]
    GameOver,
    #[error("character {0} not found")]
    NotFound(CharacterId),
    #[error("character {0} is on the other bank from the boat")]
    WrongSide(CharacterId),
    #[error("boat is full (capacity: {capacity})")]
    CapacityExceeded { capacity: usize },
    #[error("character {0} is already on the boat")]
    AlreadyAboard(CharacterId),
    #[error("character {0} is not on the boat")]
    NotAboard(CharacterId),
    #[error("boat must have at least one passenger")]
    EmptyBoat,
    #[error("too many passengers: {crew} aboard, capacity {capacity}")]
    OverCapacity { crew: usize, capacity: usize },
}

/// Errors from the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("solve the cryptarithmetic puzzle first to unlock the boat")]
    Locked,
    #[error(transparent)]
    River(#[from] RiverError),
}

/// Rejected level catalogues.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level catalogue is empty")]
    Empty,
    #[error("level {index}: {source}")]
    Puzzle {
        index: usize,
        #[source]
        source: SpecError,
    },
    #[error("level {index}: boat capacity must be at least 1")]
    ZeroCapacity { index: usize },
    #[error("level {index}: needs at least one missionary or cannibal")]
    EmptyRiver { index: usize },
    #[error("level {index} does not exist (catalogue has {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("failed to read levels from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse levels: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures of the progress store.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("failed to access save file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save file {path:?} does not hold a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("save file {path:?} has an invalid '{key}' value")]
    InvalidValue { path: PathBuf, key: &'static str },
    #[error("save file {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
