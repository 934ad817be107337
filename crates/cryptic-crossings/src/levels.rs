//! Level definitions.
//!
//! A level pairs a cryptarithmetic puzzle with the river challenge it
//! unlocks. The river parameters are fixed per level and have nothing to do
//! with the puzzle's numeric answer.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LevelError;
use crate::puzzle::{Letter, PuzzleSpec};
use crate::river::RiverConfig;

/// A level as written in a level file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub words: [String; 3],
    /// Letter order for the solver. Derived from the words when absent.
    #[serde(default)]
    pub unique_letters: Option<Vec<Letter>>,
    pub final_m: usize,
    pub final_c: usize,
    pub final_k: usize,
}

/// A checked, ready-to-play level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Level {
    pub name: String,
    pub description: Option<String>,
    pub puzzle: PuzzleSpec,
    pub river: RiverConfig,
}

impl Level {
    fn from_def(index: usize, def: &LevelDef) -> Result<Self, LevelError> {
        let words = [
            def.words[0].as_str(),
            def.words[1].as_str(),
            def.words[2].as_str(),
        ];
        let puzzle = match &def.unique_letters {
            Some(letters) => PuzzleSpec::with_letters(words, letters),
            None => PuzzleSpec::new(words),
        }
        .map_err(|source| LevelError::Puzzle { index, source })?;

        if def.final_k == 0 {
            return Err(LevelError::ZeroCapacity { index });
        }
        if def.final_m + def.final_c == 0 {
            return Err(LevelError::EmptyRiver { index });
        }

        Ok(Self {
            name: def
                .name
                .clone()
                .unwrap_or_else(|| format!("Level {}", index + 1)),
            description: def.description.clone(),
            puzzle,
            river: RiverConfig::new(def.final_m, def.final_c, def.final_k),
        })
    }
}

/// The ordered list of levels for a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LevelCatalog {
    levels: Vec<Level>,
}

impl LevelCatalog {
    pub fn from_defs(defs: &[LevelDef]) -> Result<Self, LevelError> {
        if defs.is_empty() {
            return Err(LevelError::Empty);
        }
        let levels = defs
            .iter()
            .enumerate()
            .map(|(index, def)| Level::from_def(index, def))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels })
    }

    /// Parse a JSON array of level definitions.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let defs: Vec<LevelDef> = serde_json::from_str(json)?;
        Self::from_defs(&defs)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let json = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The three levels shipped with the game.
    pub fn builtin() -> Self {
        let def = |name: &str, description: &str, words: [&str; 3], m, c, k| LevelDef {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            words: words.map(str::to_string),
            unique_letters: None,
            final_m: m,
            final_c: c,
            final_k: k,
        };
        let defs = [
            def(
                "Level 1: Classic Challenge",
                "The classic SEND+MORE=MONEY puzzle with the traditional 3M+3C crossing",
                ["SEND", "MORE", "MONEY"],
                3,
                3,
                2,
            ),
            def(
                "Level 2: Double Trouble",
                "TWO+TWO=FOUR, then 4M+4C with a larger boat",
                ["TWO", "TWO", "FOUR"],
                4,
                4,
                3,
            ),
            def(
                "Level 3: Master Challenge",
                "THIS+IS=GOOD, then a 5M+5C crossing",
                ["THIS", "IS", "GOOD"],
                5,
                5,
                3,
            ),
        ];
        Self::from_defs(&defs).unwrap_or_else(|e| unreachable!("built-in levels are valid: {e}"))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn level(&self, index: usize) -> Result<&Level, LevelError> {
        self.levels.get(index).ok_or(LevelError::OutOfRange {
            index,
            count: self.levels.len(),
        })
    }

    pub fn last_index(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    pub fn as_slice(&self) -> &[Level] {
        &self.levels
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> + '_ {
        self.levels.iter()
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_levels() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.len(), 3);
        let first = catalog.get(0).unwrap();
        assert_eq!(first.puzzle.equation(), "SEND + MORE = MONEY");
        assert_eq!(first.river, RiverConfig::new(3, 3, 2));
        assert_eq!(
            catalog.get(1).unwrap().puzzle.unique_letters(),
            &['T', 'W', 'O', 'F', 'U', 'R']
        );
        assert_eq!(catalog.get(2).unwrap().river, RiverConfig::new(5, 5, 3));
        assert!(catalog.get(3).is_none());
        assert!(matches!(
            catalog.level(3),
            Err(LevelError::OutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "words": ["TWO", "TWO", "FOUR"],
                "unique_letters": ["T", "W", "O", "F", "U", "R"],
                "final_m": 2,
                "final_c": 2,
                "final_k": 2
            }
        ]"#;
        let catalog = LevelCatalog::from_json(json).unwrap();
        let level = catalog.get(0).unwrap();
        assert_eq!(level.name, "Level 1");
        assert_eq!(level.river, RiverConfig::new(2, 2, 2));
    }

    #[test]
    fn test_rejects_bad_levels() {
        assert!(matches!(LevelCatalog::from_json("[]"), Err(LevelError::Empty)));
        assert!(matches!(
            LevelCatalog::from_json("not json"),
            Err(LevelError::Parse(_))
        ));

        let zero_k = r#"[{"words": ["A", "B", "C"], "final_m": 1, "final_c": 1, "final_k": 0}]"#;
        assert!(matches!(
            LevelCatalog::from_json(zero_k),
            Err(LevelError::ZeroCapacity { index: 0 })
        ));

        let nobody = r#"[{"words": ["A", "B", "C"], "final_m": 0, "final_c": 0, "final_k": 2}]"#;
        assert!(matches!(
            LevelCatalog::from_json(nobody),
            Err(LevelError::EmptyRiver { index: 0 })
        ));

        let bad_letters = r#"[{"words": ["A", "B", "C"], "unique_letters": ["A"],
            "final_m": 1, "final_c": 1, "final_k": 2}]"#;
        assert!(matches!(
            LevelCatalog::from_json(bad_letters),
            Err(LevelError::Puzzle { index: 0, .. })
        ));
    }
}
