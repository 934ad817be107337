//! Progress persistence.
//!
//! The session only needs "what is the highest level reached" and "record a
//! new highest level". [`JsonProgressFile`] keeps that in a small JSON save
//! file; [`MemoryProgress`] keeps it in memory. Both can also hold the
//! per-session [`SessionStats`] attempt log.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ProgressError;

pub const DEFAULT_SAVE_FILE: &str = "cryptic_crossings_progress.json";

const HIGHEST_LEVEL_KEY: &str = "highest_level_completed";
const LAST_PLAYED_KEY: &str = "last_played";
const STATS_KEY: &str = "stats";
const SUMMARY_KEY: &str = "session_summary";

/// Which half of a level an attempt was at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Cryptarithmetic,
    RiverCrossing,
}

/// One recorded attempt at a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub level: usize,
    pub kind: AttemptKind,
    pub success: bool,
    /// Unix seconds.
    pub timestamp: u64,
}

/// Counters and the attempt log for one play session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Unix seconds.
    #[serde(default)]
    pub session_start: u64,
    pub cryptarithmetic_attempts: usize,
    pub river_crossing_attempts: usize,
    pub levels_completed: usize,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

/// Derived figures for a session, as stored next to the raw stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_duration_secs: u64,
    /// Distinct levels with at least one attempt.
    pub levels_attempted: usize,
    pub total_attempts: usize,
    pub cryptarithmetic_attempts: usize,
    pub river_crossing_attempts: usize,
    pub levels_completed: usize,
    /// Successful attempts in percent, two decimals. 0 with no attempts.
    pub success_rate: f64,
}

impl SessionStats {
    pub fn starting_now() -> Self {
        Self {
            session_start: unix_now(),
            ..Default::default()
        }
    }

    pub fn record_attempt(&mut self, level: usize, kind: AttemptKind, success: bool) {
        match kind {
            AttemptKind::Cryptarithmetic => self.cryptarithmetic_attempts += 1,
            AttemptKind::RiverCrossing => self.river_crossing_attempts += 1,
        }
        self.attempts.push(Attempt {
            level,
            kind,
            success,
            timestamp: unix_now(),
        });
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary_at(unix_now())
    }

    /// Summary as of `now` (unix seconds).
    pub fn summary_at(&self, now: u64) -> SessionSummary {
        let levels: BTreeSet<usize> = self.attempts.iter().map(|a| a.level).collect();
        let total = self.attempts.len();
        let successes = self.attempts.iter().filter(|a| a.success).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            (successes as f64 * 10_000.0 / total as f64).round() / 100.0
        };

        SessionSummary {
            session_duration_secs: now.saturating_sub(self.session_start),
            levels_attempted: levels.len(),
            total_attempts: total,
            cryptarithmetic_attempts: self.cryptarithmetic_attempts,
            river_crossing_attempts: self.river_crossing_attempts,
            levels_completed: self.levels_completed,
            success_rate,
        }
    }
}

/// Where the session keeps its progress.
pub trait ProgressStore {
    /// Highest level index reached so far; 0 when nothing was saved.
    fn load_highest_level(&mut self) -> Result<usize, ProgressError>;

    fn save_highest_level(&mut self, index: usize) -> Result<(), ProgressError>;

    /// Persist session counters. Stores without a place for them ignore this.
    fn save_stats(&mut self, _stats: &SessionStats) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Progress kept in memory, never written anywhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgress {
    pub highest_level: usize,
    /// Every index passed to `save_highest_level`, in order.
    pub saves: Vec<usize>,
    pub stats: Option<SessionStats>,
}

impl MemoryProgress {
    pub fn starting_at(highest_level: usize) -> Self {
        Self {
            highest_level,
            ..Default::default()
        }
    }
}

impl ProgressStore for MemoryProgress {
    fn load_highest_level(&mut self) -> Result<usize, ProgressError> {
        Ok(self.highest_level)
    }

    fn save_highest_level(&mut self, index: usize) -> Result<(), ProgressError> {
        self.highest_level = index;
        self.saves.push(index);
        Ok(())
    }

    fn save_stats(&mut self, stats: &SessionStats) -> Result<(), ProgressError> {
        self.stats = Some(stats.clone());
        Ok(())
    }
}

/// A JSON object on disk with a `highest_level_completed` key.
///
/// Keys this type does not know about are kept when saving.
#[derive(Debug, Clone)]
pub struct JsonProgressFile {
    path: PathBuf,
}

impl JsonProgressFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Option<Map<String, Value>>, ProgressError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|source| ProgressError::Io {
            path: self.path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| ProgressError::Parse {
            path: self.path.clone(),
            source,
        })?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(ProgressError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    /// Read the existing object for an update. A file that is not JSON at all
    /// is replaced; valid JSON of the wrong shape is left alone.
    fn object_for_update(&self) -> Result<Map<String, Value>, ProgressError> {
        match self.read_object() {
            Ok(map) => Ok(map.unwrap_or_default()),
            Err(err @ ProgressError::Parse { .. }) => {
                warn!("Starting a fresh save file: {}", err);
                Ok(Map::new())
            }
            Err(err) => {
                warn!("Refusing to overwrite save file: {}", err);
                Err(err)
            }
        }
    }

    fn write_object(&self, map: Map<String, Value>) -> Result<(), ProgressError> {
        let io_err = |source| ProgressError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(&Value::Object(map)).map_err(|source| {
            ProgressError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, json).map_err(io_err)
    }

    /// Everything in the save file, or an empty object.
    pub fn load_full(&self) -> Map<String, Value> {
        self.read_object().ok().flatten().unwrap_or_default()
    }

    pub fn load_stats(&self) -> Option<SessionStats> {
        self.load_full()
            .remove(STATS_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl ProgressStore for JsonProgressFile {
    fn load_highest_level(&mut self) -> Result<usize, ProgressError> {
        let stored = self
            .read_object()?
            .and_then(|mut map| map.remove(HIGHEST_LEVEL_KEY));
        let highest = match stored {
            None => 0,
            Some(value) => value.as_u64().ok_or_else(|| ProgressError::InvalidValue {
                path: self.path.clone(),
                key: HIGHEST_LEVEL_KEY,
            })?,
        };
        debug!(path = ?self.path, highest, "loaded progress");
        Ok(highest as usize)
    }

    fn save_highest_level(&mut self, index: usize) -> Result<(), ProgressError> {
        let mut map = self.object_for_update()?;
        map.insert(HIGHEST_LEVEL_KEY.to_string(), Value::from(index));
        map.insert(LAST_PLAYED_KEY.to_string(), Value::from(unix_now()));
        self.write_object(map)?;
        debug!(path = ?self.path, index, "saved progress");
        Ok(())
    }

    fn save_stats(&mut self, stats: &SessionStats) -> Result<(), ProgressError> {
        let mut map = self.object_for_update()?;
        let parse_err = |source| ProgressError::Parse {
            path: self.path.clone(),
            source,
        };
        let summary = serde_json::to_value(stats.summary()).map_err(parse_err)?;
        let stats = serde_json::to_value(stats).map_err(parse_err)?;
        map.insert(STATS_KEY.to_string(), stats);
        map.insert(SUMMARY_KEY.to_string(), summary);
        self.write_object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_zero() {
        let dir = tempdir().unwrap();
        let mut store = JsonProgressFile::new(dir.path().join("save.json"));
        assert_eq!(store.load_highest_level().unwrap(), 0);
        assert!(store.load_full().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("save.json");
        let mut store = JsonProgressFile::new(&path);
        store.save_highest_level(2).unwrap();
        assert_eq!(store.load_highest_level().unwrap(), 2);

        let full = store.load_full();
        assert_eq!(full.get("highest_level_completed"), Some(&Value::from(2)));
        assert!(full.get("last_played").and_then(Value::as_u64).is_some());
    }

    #[test]
    fn test_save_preserves_unknown_keys_and_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, r#"{"highest_level_completed": 1, "player": "ada"}"#).unwrap();

        let mut store = JsonProgressFile::new(&path);
        let mut stats = SessionStats::starting_now();
        stats.record_attempt(0, AttemptKind::Cryptarithmetic, false);
        stats.record_attempt(0, AttemptKind::Cryptarithmetic, true);
        stats.record_attempt(0, AttemptKind::RiverCrossing, true);
        stats.levels_completed = 1;
        store.save_stats(&stats).unwrap();
        store.save_highest_level(2).unwrap();

        let full = store.load_full();
        assert_eq!(full.get("player"), Some(&Value::from("ada")));
        assert_eq!(store.load_stats(), Some(stats));
        assert_eq!(store.load_highest_level().unwrap(), 2);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonProgressFile::new(&path);
        assert!(matches!(
            store.load_highest_level(),
            Err(ProgressError::Parse { .. })
        ));

        // Saving over a corrupt file starts fresh.
        store.save_highest_level(1).unwrap();
        assert_eq!(store.load_highest_level().unwrap(), 1);
    }

    #[test]
    fn test_non_object_file_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        let content = r#"[{"highest_level_completed": 2, "player": "ada"}]"#;
        fs::write(&path, content).unwrap();

        let mut store = JsonProgressFile::new(&path);
        assert!(matches!(
            store.load_highest_level(),
            Err(ProgressError::NotAnObject { .. })
        ));
        assert!(matches!(
            store.save_highest_level(1),
            Err(ProgressError::NotAnObject { .. })
        ));
        assert!(store.save_stats(&SessionStats::default()).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_non_integer_level_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, r#"{"highest_level_completed": "2"}"#).unwrap();

        let mut store = JsonProgressFile::new(&path);
        assert!(matches!(
            store.load_highest_level(),
            Err(ProgressError::InvalidValue {
                key: "highest_level_completed",
                ..
            })
        ));

        // The object itself is fine, so a save repairs the value.
        store.save_highest_level(1).unwrap();
        assert_eq!(store.load_highest_level().unwrap(), 1);
    }

    #[test]
    fn test_summary() {
        let mut stats = SessionStats {
            session_start: 1_000,
            ..Default::default()
        };
        let empty = stats.summary_at(1_000);
        assert_eq!(empty.total_attempts, 0);
        assert_eq!(empty.success_rate, 0.0);

        stats.record_attempt(0, AttemptKind::Cryptarithmetic, false);
        stats.record_attempt(0, AttemptKind::Cryptarithmetic, true);
        stats.record_attempt(0, AttemptKind::RiverCrossing, true);
        stats.record_attempt(1, AttemptKind::Cryptarithmetic, false);
        stats.record_attempt(1, AttemptKind::Cryptarithmetic, false);
        stats.record_attempt(1, AttemptKind::Cryptarithmetic, false);

        let summary = stats.summary_at(1_090);
        assert_eq!(summary.session_duration_secs, 90);
        assert_eq!(summary.levels_attempted, 2);
        assert_eq!(summary.total_attempts, 6);
        assert_eq!(summary.cryptarithmetic_attempts, 5);
        assert_eq!(summary.river_crossing_attempts, 1);
        assert_eq!(summary.success_rate, 33.33);
        assert_eq!(stats.attempts[2].kind, AttemptKind::RiverCrossing);
        assert!(stats.attempts[2].success);
    }

    #[test]
    fn test_saved_stats_include_summary() {
        let dir = tempdir().unwrap();
        let mut store = JsonProgressFile::new(dir.path().join("save.json"));
        let mut stats = SessionStats::starting_now();
        stats.record_attempt(0, AttemptKind::Cryptarithmetic, true);
        store.save_stats(&stats).unwrap();

        let summary: SessionSummary =
            serde_json::from_value(store.load_full().remove("session_summary").unwrap()).unwrap();
        assert_eq!(summary.total_attempts, 1);
        assert_eq!(summary.success_rate, 100.0);
    }

    #[test]
    fn test_memory_progress_records_saves() {
        let mut store = MemoryProgress::starting_at(1);
        assert_eq!(store.load_highest_level().unwrap(), 1);
        store.save_highest_level(2).unwrap();
        assert_eq!(store.saves, vec![2]);
        assert_eq!(store.load_highest_level().unwrap(), 2);
    }
}
