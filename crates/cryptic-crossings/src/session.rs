//! Level sequencing.
//!
//! A [`Session`] owns everything for one game: the level catalogue, the
//! player's letter assignment, the solver cache, the river engine of the
//! current level and the progress store. The river stays locked until the
//! current puzzle validates; winning the river moves on to the next level.
//!
//! After each crossing the session hands back a [`StatusCheck`] ticket
//! instead of reacting right away, so a renderer can animate the boat first.
//! Tickets carry the session generation at the time they were issued; any
//! restart, lock or level change bumps the generation and makes outstanding
//! tickets stale.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LevelError, ProgressError, SessionError, ValidationError};
use crate::levels::{Level, LevelCatalog};
use crate::progress::{AttemptKind, ProgressStore, SessionStats};
use crate::puzzle::{apply_edit, Assignment, Edit, EditStatus, PuzzleSpec};
use crate::river::{CharacterId, Location, RiverEngine, RiverSnapshot, RiverStatus};
use crate::solver::{Solver, SolverConfig, SolverResult};
use crate::validator::{hints, validate, Hint, Verified};

/// Delay between a crossing and the win/loss reaction.
pub const DEFAULT_STATUS_CHECK_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub status_check_delay: Duration,
    /// Used by [`Session::reveal_solution`].
    pub solver: SolverConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_check_delay: DEFAULT_STATUS_CHECK_DELAY,
            solver: SolverConfig::default(),
        }
    }
}

/// A deferred win/loss check scheduled by a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCheck {
    generation: u64,
    due: Instant,
}

impl StatusCheck {
    pub fn due(&self) -> Instant {
        self.due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }
}

/// What a fired [`StatusCheck`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The river was restarted, locked or replaced since the check was issued.
    Stale,
    /// Nobody won or lost yet.
    Continue,
    /// Missionaries were outnumbered; the challenge has been restarted.
    Lost,
    /// Everyone crossed; the session moved to `next`.
    LevelComplete {
        completed: usize,
        next: usize,
        wrapped: bool,
    },
}

/// One game, from the first level loaded to the last crossing.
#[derive(Debug)]
pub struct Session<P: ProgressStore> {
    catalog: LevelCatalog,
    store: P,
    config: SessionConfig,
    solver: Solver,
    current: usize,
    highest: usize,
    assignment: Assignment,
    /// `None` while locked.
    river: Option<RiverEngine>,
    generation: u64,
    pending: Option<StatusCheck>,
    stats: SessionStats,
}

impl<P: ProgressStore> Session<P> {
    /// Start a game at the highest level reached so far.
    pub fn new(catalog: LevelCatalog, mut store: P, config: SessionConfig) -> Self {
        let highest = match store.load_highest_level() {
            Ok(highest) => highest,
            Err(err) => {
                warn!("Failed to load progress, starting fresh: {}", err);
                0
            }
        };
        // Nothing beyond "every level completed" is meaningful.
        let highest = highest.min(catalog.len());
        let current = highest.min(catalog.last_index());
        info!(highest, level = current, "session started");

        Self {
            catalog,
            store,
            config,
            solver: Solver::new(),
            current,
            highest,
            assignment: Assignment::new(),
            river: None,
            generation: 0,
            pending: None,
            stats: SessionStats::starting_now(),
        }
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn level_index(&self) -> usize {
        self.current
    }

    pub fn level(&self) -> &Level {
        // `current` is always a valid index into a non-empty catalogue.
        &self.catalog.as_slice()[self.current]
    }

    pub fn puzzle(&self) -> &PuzzleSpec {
        &self.level().puzzle
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn highest_level(&self) -> usize {
        self.highest
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn is_unlocked(&self) -> bool {
        self.river.is_some()
    }

    pub fn river(&self) -> Option<&RiverEngine> {
        self.river.as_ref()
    }

    pub fn river_snapshot(&self) -> Option<RiverSnapshot> {
        self.river.as_ref().map(RiverEngine::snapshot)
    }

    pub fn pending_check(&self) -> Option<StatusCheck> {
        self.pending
    }

    /// Jump to a level, discarding the current guess and locking the river.
    pub fn load_level(&mut self, index: usize) -> Result<(), LevelError> {
        self.catalog.level(index)?;
        self.current = index;
        self.assignment = Assignment::new();
        self.lock();
        info!(level = index, puzzle = %self.puzzle(), "level loaded");
        Ok(())
    }

    /// Apply one edit to the player's guess.
    pub fn edit(&mut self, edit: Edit) -> EditStatus {
        let (assignment, status) = apply_edit(self.puzzle(), &self.assignment, edit);
        self.assignment = assignment;
        debug!(?edit, ?status, "edit");
        status
    }

    pub fn hints(&self) -> Vec<Hint> {
        hints(self.puzzle(), &self.assignment)
    }

    /// Check the guess. Success unlocks a fresh river challenge; failure
    /// locks the river and throws away any crossing in progress.
    pub fn validate(&mut self) -> Result<Verified, ValidationError> {
        let result = validate(self.puzzle(), &self.assignment);
        self.stats
            .record_attempt(self.current, AttemptKind::Cryptarithmetic, result.is_ok());
        match result {
            Ok(verified) => {
                let river = self.level().river;
                self.invalidate();
                self.river = Some(RiverEngine::new(river));
                info!(level = self.current, ?river, "river unlocked");
                Ok(verified)
            }
            Err(err) => {
                if self.is_unlocked() {
                    info!(level = self.current, "river locked again");
                }
                self.lock();
                Err(err)
            }
        }
    }

    /// Solve the current puzzle and fill in the guess with the answer.
    /// The river stays locked until [`Session::validate`] is called.
    pub fn reveal_solution(&mut self) -> SolverResult {
        let level = &self.catalog.as_slice()[self.current];
        let result = self.solver.solve_with(&level.puzzle, &self.config.solver);
        if let Some(solution) = &result.solution {
            self.assignment = solution.clone();
        }
        result
    }

    fn engine_mut(&mut self) -> Result<&mut RiverEngine, SessionError> {
        self.river.as_mut().ok_or(SessionError::Locked)
    }

    pub fn add_to_boat(&mut self, id: CharacterId) -> Result<(), SessionError> {
        Ok(self.engine_mut()?.add_to_boat(id)?)
    }

    pub fn remove_from_boat(&mut self, id: CharacterId) -> Result<(), SessionError> {
        Ok(self.engine_mut()?.remove_from_boat(id)?)
    }

    pub fn toggle(&mut self, id: CharacterId) -> Result<Location, SessionError> {
        Ok(self.engine_mut()?.toggle(id)?)
    }

    /// Cross the river and schedule the win/loss check.
    pub fn travel(&mut self) -> Result<StatusCheck, SessionError> {
        let delay = self.config.status_check_delay;
        self.engine_mut()?.travel()?;
        let check = StatusCheck {
            generation: self.generation,
            due: Instant::now() + delay,
        };
        self.pending = Some(check);
        Ok(check)
    }

    /// Start the current river challenge over. Pending checks become stale.
    pub fn restart_river(&mut self) -> Result<(), SessionError> {
        self.engine_mut()?.restart();
        self.invalidate();
        Ok(())
    }

    /// Fire the pending check if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<CheckOutcome> {
        let check = self.pending.filter(|c| c.is_due(now))?;
        Some(self.fire_status_check(check))
    }

    /// React to the river state a crossing left behind.
    pub fn fire_status_check(&mut self, check: StatusCheck) -> CheckOutcome {
        if check.generation != self.generation {
            debug!(
                ticket = check.generation,
                current = self.generation,
                "stale status check"
            );
            return CheckOutcome::Stale;
        }
        self.pending = None;

        let Some(status) = self.river.as_ref().map(RiverEngine::status) else {
            return CheckOutcome::Stale;
        };
        match status {
            RiverStatus::Active => CheckOutcome::Continue,
            RiverStatus::Lost => {
                self.stats
                    .record_attempt(self.current, AttemptKind::RiverCrossing, false);
                if let Some(engine) = self.river.as_mut() {
                    engine.restart();
                }
                self.invalidate();
                CheckOutcome::Lost
            }
            RiverStatus::Won => {
                self.stats
                    .record_attempt(self.current, AttemptKind::RiverCrossing, true);
                self.stats.levels_completed += 1;
                self.complete_level()
            }
        }
    }

    fn complete_level(&mut self) -> CheckOutcome {
        let completed = self.current;
        let reached = completed + 1;
        if reached > self.highest {
            if let Err(err) = self.store.save_highest_level(reached) {
                warn!("Failed to save progress: {}", err);
            }
            self.highest = reached;
        }

        let wrapped = completed == self.catalog.last_index();
        let next = if wrapped { 0 } else { completed + 1 };
        info!(completed, next, wrapped, "level complete");

        self.current = next;
        self.assignment = Assignment::new();
        self.lock();
        CheckOutcome::LevelComplete {
            completed,
            next,
            wrapped,
        }
    }

    /// Persist the session counters through the progress store.
    pub fn save_stats(&mut self) -> Result<(), ProgressError> {
        self.store.save_stats(&self.stats)
    }

    fn lock(&mut self) {
        self.river = None;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelDef;
    use crate::progress::MemoryProgress;
    use crate::puzzle::Digit;

    fn tiny_catalog() -> LevelCatalog {
        let def = |words: [&str; 3], m, c, k| LevelDef {
            name: None,
            description: None,
            words: words.map(str::to_string),
            unique_letters: None,
            final_m: m,
            final_c: c,
            final_k: k,
        };
        LevelCatalog::from_defs(&[def(["A", "B", "C"], 1, 1, 2), def(["A", "A", "B"], 0, 2, 2)])
            .unwrap()
    }

    fn instant_session(store: MemoryProgress) -> Session<MemoryProgress> {
        let config = SessionConfig {
            status_check_delay: Duration::ZERO,
            ..Default::default()
        };
        Session::new(tiny_catalog(), store, config)
    }

    #[test]
    fn test_starts_at_highest_level_clamped() {
        let session = instant_session(MemoryProgress::starting_at(1));
        assert_eq!(session.level_index(), 1);
        let session = instant_session(MemoryProgress::starting_at(7));
        assert_eq!(session.level_index(), 1);
        assert_eq!(session.highest_level(), 2);
    }

    #[test]
    fn test_locked_until_validated() {
        let mut session = instant_session(MemoryProgress::default());
        let m1 = "M1".parse().unwrap();
        assert_eq!(session.add_to_boat(m1), Err(SessionError::Locked));
        assert_eq!(session.travel(), Err(SessionError::Locked));
        assert!(session.validate().is_err());
        assert!(!session.is_unlocked());

        session.reveal_solution();
        session.validate().unwrap();
        assert!(session.is_unlocked());
        session.add_to_boat(m1).unwrap();

        // A failed validation throws the crossing away.
        session.edit(Edit::Set {
            letter: 'C',
            digit: Digit::new(9).unwrap(),
        });
        assert!(session.validate().is_err());
        assert!(session.river().is_none());
    }

    #[test]
    fn test_stale_check_after_restart() {
        let mut session = instant_session(MemoryProgress::default());
        session.reveal_solution();
        session.validate().unwrap();
        session.add_to_boat("M1".parse().unwrap()).unwrap();
        let check = session.travel().unwrap();
        session.restart_river().unwrap();

        assert_eq!(session.fire_status_check(check), CheckOutcome::Stale);
        assert!(session.pending_check().is_none());
        assert_eq!(session.river().unwrap().move_count(), 0);
    }
}
