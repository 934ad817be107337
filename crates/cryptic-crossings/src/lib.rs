//! Game core for Cryptic Crossings.
//!
//! Each level is a cryptarithmetic puzzle (`SEND + MORE = MONEY`) whose
//! solution unlocks a missionaries-and-cannibals river crossing. This crate
//! holds the rules of both puzzles and the session logic that sequences
//! them; drawing, sound and input widgets live elsewhere.

pub mod error;
pub mod levels;
pub mod progress;
pub mod puzzle;
pub mod river;
pub mod session;
pub mod solver;
pub mod validator;

// Re-export main types
pub use error::{LevelError, ProgressError, RiverError, SessionError, SpecError, ValidationError};
pub use levels::{Level, LevelCatalog, LevelDef};
pub use progress::{
    Attempt, AttemptKind, JsonProgressFile, MemoryProgress, ProgressStore, SessionStats,
    SessionSummary,
};
pub use puzzle::{apply_edit, Assignment, Digit, Edit, EditStatus, Letter, PuzzleSpec};
pub use river::{
    is_safe, BankCounts, Character, CharacterId, CharacterKind, Location, MoveRecord,
    RiverConfig, RiverEngine, RiverSnapshot, RiverStatus, Side,
};
pub use session::{CheckOutcome, Session, SessionConfig, StatusCheck};
pub use solver::{solve, Solver, SolverConfig, SolverResult};
pub use validator::{hints, validate, Hint, Verified};
