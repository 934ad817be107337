//! Exhaustive backtracking solver for cryptarithmetic puzzles.
//!
//! Letters are placed in `unique_letters` order, digits are tried in
//! ascending order, and the first complete assignment that adds up wins.
//! A digit is pruned when it is already taken in the current branch, or when
//! it is 0 and the letter leads a word.
//!
//! The search is bounded by `10!/(10-k)!` leaves for `k` letters. It can be
//! interrupted with a timeout or a shared cancel flag so that callers can run
//! it off the UI thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::puzzle::{Assignment, Digit, Letter, PuzzleSpec, MAX_LETTERS};

/// How many search steps between checks of the deadline and cancel flag.
pub const INTERRUPT_FREQUENCY: usize = 4096;

/// Configuration for a single search.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Give up after this long. `None` searches to exhaustion.
    pub timeout: Option<Duration>,
    /// Set from another thread to abort the search.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SolverConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }
}

/// Result of a search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverResult {
    /// First solution in search order, if any was found.
    pub solution: Option<Assignment>,
    /// True when the answer is final: a solution was found or the whole
    /// space was explored. False when interrupted.
    pub search_exhausted: bool,
    /// Number of complete assignments checked against the arithmetic.
    pub assignments_tested: usize,
    pub time_elapsed_ms: u64,
    /// Served from the session cache without searching.
    pub cached: bool,
}

/// Solve without caching, searching to exhaustion.
pub fn solve(spec: &PuzzleSpec) -> Option<Assignment> {
    search(spec, &SolverConfig::default()).solution
}

/// Run the backtracking search.
pub fn search(spec: &PuzzleSpec, config: &SolverConfig) -> SolverResult {
    let start_time = Instant::now();
    let deadline = config.timeout.map(|t| start_time + t);
    let letters = spec.unique_letters();
    let k = letters.len();

    let leading: SmallVec<[bool; MAX_LETTERS]> =
        letters.iter().map(|&l| spec.is_leading(l)).collect();

    // digits[i] is the digit placed on letters[i] at depths below `depth`.
    let mut digits: SmallVec<[u8; MAX_LETTERS]> = smallvec![0; k];
    // next_digit[i] is the next candidate to try at depth i.
    let mut next_digit: SmallVec<[u8; MAX_LETTERS]> = smallvec![0; k];
    let mut used: u16 = 0;
    let mut depth: usize = 0;

    let mut steps: usize = 0;
    let mut assignments_tested: usize = 0;

    let finish = |solution: Option<Assignment>, exhausted: bool, tested: usize| SolverResult {
        solution,
        search_exhausted: exhausted,
        assignments_tested: tested,
        time_elapsed_ms: start_time.elapsed().as_millis() as u64,
        cached: false,
    };

    loop {
        steps += 1;
        if steps % INTERRUPT_FREQUENCY == 0 && is_interrupted(config, deadline) {
            debug!(puzzle = %spec, assignments_tested, "solver interrupted");
            return finish(None, false, assignments_tested);
        }

        if depth == k {
            assignments_tested += 1;
            let sum = spec.word_value_by_position(0, &digits)
                + spec.word_value_by_position(1, &digits);
            if sum == spec.word_value_by_position(2, &digits) {
                let solution = letters
                    .iter()
                    .zip(&digits)
                    .map(|(&l, &d)| (l, Digit(d)))
                    .collect();
                debug!(puzzle = %spec, assignments_tested, "solution found");
                return finish(Some(solution), true, assignments_tested);
            }
            if depth == 0 {
                break;
            }
            depth -= 1;
            used &= !(1 << digits[depth]);
            continue;
        }

        let mut candidate = next_digit[depth];
        while candidate <= 9
            && (used & (1 << candidate) != 0 || (candidate == 0 && leading[depth]))
        {
            candidate += 1;
        }

        if candidate > 9 {
            // This depth is exhausted; step back.
            if depth == 0 {
                break;
            }
            depth -= 1;
            used &= !(1 << digits[depth]);
            continue;
        }

        digits[depth] = candidate;
        next_digit[depth] = candidate + 1;
        used |= 1 << candidate;
        depth += 1;
        if depth < k {
            next_digit[depth] = 0;
        }
    }

    debug!(puzzle = %spec, assignments_tested, "search exhausted without a solution");
    finish(None, true, assignments_tested)
}

fn is_interrupted(config: &SolverConfig, deadline: Option<Instant>) -> bool {
    if let Some(cancel) = &config.cancel {
        if cancel.load(Ordering::Relaxed) {
            return true;
        }
    }
    deadline.is_some_and(|d| Instant::now() > d)
}

type CacheKey = ([String; 3], Vec<Letter>);

/// A solver that remembers final answers for the lifetime of a session.
#[derive(Debug, Default)]
pub struct Solver {
    cache: HashMap<CacheKey, Option<Assignment>>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve to exhaustion, using the cache.
    pub fn solve(&mut self, spec: &PuzzleSpec) -> Option<Assignment> {
        self.solve_with(spec, &SolverConfig::default()).solution
    }

    pub fn is_solvable(&mut self, spec: &PuzzleSpec) -> bool {
        self.solve(spec).is_some()
    }

    /// Solve with a bounded search. Only final answers are cached; an
    /// interrupted search is retried on the next call.
    pub fn solve_with(&mut self, spec: &PuzzleSpec, config: &SolverConfig) -> SolverResult {
        let key = (spec.words().clone(), spec.unique_letters().to_vec());
        if let Some(solution) = self.cache.get(&key) {
            return SolverResult {
                solution: solution.clone(),
                search_exhausted: true,
                assignments_tested: 0,
                time_elapsed_ms: 0,
                cached: true,
            };
        }

        let result = search(spec, config);
        if result.search_exhausted {
            self.cache.insert(key, result.solution.clone());
        }
        result
    }

    pub fn cached_puzzles(&self) -> usize {
        self.cache.len()
    }
}
