//! Cryptarithmetic puzzle types.
//!
//! A puzzle is always `operand1 + operand2 = result`, three words of uppercase
//! letters. Each letter stands for a distinct digit.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::error::SpecError;

/// A puzzle symbol. Always an ASCII uppercase letter once inside a `PuzzleSpec`.
pub type Letter = char;

/// Longest word whose value is guaranteed to fit in a `u64`.
pub const MAX_WORD_LEN: usize = 18;

/// There are only ten digits to hand out.
pub const MAX_LETTERS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is not a decimal digit")]
pub struct DigitOutOfRange(pub u8);

/// A decimal digit, 0 through 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(pub(crate) u8);

impl Digit {
    pub const ZERO: Digit = Digit(0);

    pub fn new(value: u8) -> Option<Self> {
        (value <= 9).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Digit {
    type Error = DigitOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Digit::new(value).ok_or(DigitOutOfRange(value))
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> u8 {
        digit.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A letter-to-digit mapping, partial while the player is typing.
///
/// Edits made through [`apply_edit`] keep the digits distinct and the letters
/// inside the puzzle. Mappings built directly (e.g. from a saved guess) are
/// not checked; [`crate::validator::validate`] reports any violation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<Letter, Digit>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, letter: Letter) -> Option<Digit> {
        self.0.get(&letter).copied()
    }

    pub fn contains(&self, letter: Letter) -> bool {
        self.0.contains_key(&letter)
    }

    /// Find the letter currently holding `digit`, if any.
    pub fn letter_for(&self, digit: Digit) -> Option<Letter> {
        self.0
            .iter()
            .find(|(_, d)| **d == digit)
            .map(|(&letter, _)| letter)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in letter order.
    pub fn iter(&self) -> impl Iterator<Item = (Letter, Digit)> + '_ {
        self.0.iter().map(|(&l, &d)| (l, d))
    }

    /// Insert without any checks. Returns the previous digit.
    pub fn insert(&mut self, letter: Letter, digit: Digit) -> Option<Digit> {
        self.0.insert(letter, digit)
    }

    pub fn remove(&mut self, letter: Letter) -> Option<Digit> {
        self.0.remove(&letter)
    }
}

impl FromIterator<(Letter, Digit)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (Letter, Digit)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePairError {
    #[error("expected LETTER=DIGIT, got '{0}'")]
    Malformed(String),
    #[error(transparent)]
    Digit(#[from] DigitOutOfRange),
}

/// One `LETTER=DIGIT` pair, as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterDigit(pub Letter, pub Digit);

impl FromStr for LetterDigit {
    type Err = ParsePairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParsePairError::Malformed(s.to_string());
        let (letter, digit) = s.split_once('=').ok_or_else(malformed)?;
        let mut chars = letter.trim().chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_ascii_uppercase(),
            _ => return Err(malformed()),
        };
        let digit: u8 = digit.trim().parse().map_err(|_| malformed())?;
        Ok(LetterDigit(letter, Digit::try_from(digit)?))
    }
}

/// Indices into `unique_letters`, one per letter of a word.
type WordIndices = SmallVec<[u8; MAX_WORD_LEN]>;

/// An immutable `operand1 + operand2 = result` puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PuzzleSpec {
    words: [String; 3],
    unique_letters: Vec<Letter>,
    #[serde(skip)]
    word_indices: [WordIndices; 3],
}

impl PuzzleSpec {
    /// Build a puzzle, deriving the letter order from first appearance.
    pub fn new(words: [&str; 3]) -> Result<Self, SpecError> {
        Self::build(words, None)
    }

    /// Build a puzzle with an explicit letter order. The list must hold each
    /// letter of the words exactly once.
    pub fn with_letters(words: [&str; 3], letters: &[Letter]) -> Result<Self, SpecError> {
        Self::build(words, Some(letters))
    }

    fn build(words: [&str; 3], letters: Option<&[Letter]>) -> Result<Self, SpecError> {
        let mut derived: Vec<Letter> = Vec::new();
        for (index, word) in words.iter().enumerate() {
            if word.is_empty() {
                return Err(SpecError::EmptyWord { index });
            }
            let len = word.chars().count();
            if len > MAX_WORD_LEN {
                return Err(SpecError::WordTooLong {
                    word: word.to_string(),
                    len,
                    max: MAX_WORD_LEN,
                });
            }
            for symbol in word.chars() {
                if !symbol.is_ascii_uppercase() {
                    return Err(SpecError::InvalidSymbol {
                        word: word.to_string(),
                        symbol,
                    });
                }
                if !derived.contains(&symbol) {
                    derived.push(symbol);
                }
            }
        }

        let unique_letters = match letters {
            None => derived,
            Some(given) => {
                let mut extra: Vec<Letter> =
                    given.iter().copied().filter(|l| !derived.contains(l)).collect();
                let missing: Vec<Letter> =
                    derived.iter().copied().filter(|l| !given.contains(l)).collect();
                // Repeated entries in the supplied list also count as extra.
                for (i, l) in given.iter().enumerate() {
                    if given[..i].contains(l) && !extra.contains(l) {
                        extra.push(*l);
                    }
                }
                if !missing.is_empty() || !extra.is_empty() {
                    return Err(SpecError::LetterMismatch { missing, extra });
                }
                given.to_vec()
            }
        };

        if unique_letters.len() > MAX_LETTERS {
            return Err(SpecError::TooManyLetters {
                count: unique_letters.len(),
            });
        }

        let index_of = |c: char| {
            unique_letters
                .iter()
                .position(|&l| l == c)
                .map(|i| i as u8)
                .unwrap_or_default()
        };
        let word_indices = [
            words[0].chars().map(index_of).collect(),
            words[1].chars().map(index_of).collect(),
            words[2].chars().map(index_of).collect(),
        ];

        Ok(Self {
            words: words.map(str::to_string),
            unique_letters,
            word_indices,
        })
    }

    pub fn words(&self) -> &[String; 3] {
        &self.words
    }

    pub fn operands(&self) -> (&str, &str) {
        (&self.words[0], &self.words[1])
    }

    pub fn result_word(&self) -> &str {
        &self.words[2]
    }

    pub fn unique_letters(&self) -> &[Letter] {
        &self.unique_letters
    }

    pub fn contains_letter(&self, letter: Letter) -> bool {
        self.unique_letters.contains(&letter)
    }

    /// First letter of each word, in word order (may repeat).
    pub fn leading_letters(&self) -> [Letter; 3] {
        self.words
            .each_ref()
            .map(|w| w.chars().next().unwrap_or_default())
    }

    pub fn is_leading(&self, letter: Letter) -> bool {
        self.leading_letters().contains(&letter)
    }

    /// Value of word `index` (0, 1 or 2) under `assignment`, or `None` if any
    /// of its letters is unassigned.
    pub fn word_value(&self, index: usize, assignment: &Assignment) -> Option<u64> {
        self.words[index].chars().try_fold(0u64, |acc, letter| {
            assignment
                .get(letter)
                .map(|d| acc * 10 + u64::from(d.value()))
        })
    }

    /// Value of word `index` when digits are given positionally, one per
    /// entry of `unique_letters`. Used by the solver's inner loop.
    pub(crate) fn word_value_by_position(&self, index: usize, digits: &[u8]) -> u64 {
        self.word_indices[index]
            .iter()
            .fold(0u64, |acc, &i| acc * 10 + u64::from(digits[i as usize]))
    }

    /// Human-readable `SEND + MORE = MONEY`.
    pub fn equation(&self) -> String {
        format!("{} + {} = {}", self.words[0], self.words[1], self.words[2])
    }
}

impl fmt::Display for PuzzleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.equation())
    }
}

/// A single player input on the letter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum Edit {
    Set { letter: Letter, digit: Digit },
    Clear { letter: Letter },
    Reset,
}

/// What happened to an [`Edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditStatus {
    Applied,
    Cleared,
    /// The letter is not part of this puzzle; nothing changed.
    UnknownLetter { letter: Letter },
    /// Another letter already holds this digit; nothing changed.
    DigitTaken { digit: Digit, letter: Letter },
}

impl EditStatus {
    pub fn is_rejected(self) -> bool {
        matches!(
            self,
            EditStatus::UnknownLetter { .. } | EditStatus::DigitTaken { .. }
        )
    }
}

/// Apply one edit, returning the new assignment and what happened.
pub fn apply_edit(
    spec: &PuzzleSpec,
    assignment: &Assignment,
    edit: Edit,
) -> (Assignment, EditStatus) {
    let mut next = assignment.clone();
    let status = match edit {
        Edit::Reset => {
            next = Assignment::new();
            EditStatus::Cleared
        }
        Edit::Clear { letter } => {
            if !spec.contains_letter(letter) {
                return (next, EditStatus::UnknownLetter { letter });
            }
            next.remove(letter);
            EditStatus::Cleared
        }
        Edit::Set { letter, digit } => {
            if !spec.contains_letter(letter) {
                return (next, EditStatus::UnknownLetter { letter });
            }
            match assignment.letter_for(digit) {
                Some(holder) if holder != letter => {
                    return (next, EditStatus::DigitTaken { digit, letter: holder });
                }
                _ => {
                    next.insert(letter, digit);
                    EditStatus::Applied
                }
            }
        }
    };
    (next, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digit(d: u8) -> Digit {
        Digit::new(d).unwrap()
    }

    fn set(letter: Letter, d: u8) -> Edit {
        Edit::Set {
            letter,
            digit: digit(d),
        }
    }

    #[test]
    fn test_unique_letters_in_first_appearance_order() {
        let spec = PuzzleSpec::new(["SEND", "MORE", "MONEY"]).unwrap();
        assert_eq!(spec.unique_letters(), &['S', 'E', 'N', 'D', 'M', 'O', 'R', 'Y']);
        assert_eq!(spec.leading_letters(), ['S', 'M', 'M']);
        assert!(spec.is_leading('M'));
        assert!(!spec.is_leading('O'));
    }

    #[test]
    fn test_explicit_letter_order_must_match_words() {
        let spec = PuzzleSpec::with_letters(["TWO", "TWO", "FOUR"], &['R', 'U', 'F', 'O', 'W', 'T'])
            .unwrap();
        assert_eq!(spec.unique_letters()[0], 'R');

        let err = PuzzleSpec::with_letters(["TWO", "TWO", "FOUR"], &['T', 'W', 'O', 'F', 'U', 'X'])
            .unwrap_err();
        assert_eq!(
            err,
            SpecError::LetterMismatch {
                missing: vec!['R'],
                extra: vec!['X'],
            }
        );
    }

    #[test]
    fn test_rejects_bad_words() {
        assert!(matches!(
            PuzzleSpec::new(["AB", "", "C"]),
            Err(SpecError::EmptyWord { index: 1 })
        ));
        assert!(matches!(
            PuzzleSpec::new(["Ab", "B", "C"]),
            Err(SpecError::InvalidSymbol { symbol: 'b', .. })
        ));
        assert!(matches!(
            PuzzleSpec::new(["ABCDEF", "GHIJK", "Z"]),
            Err(SpecError::TooManyLetters { count: 12 })
        ));
    }

    #[test]
    fn test_word_value() {
        let spec = PuzzleSpec::new(["TWO", "TWO", "FOUR"]).unwrap();
        let assignment: Assignment = [('T', 7), ('W', 3), ('O', 4)]
            .into_iter()
            .map(|(l, d)| (l, digit(d)))
            .collect();
        assert_eq!(spec.word_value(0, &assignment), Some(734));
        assert_eq!(spec.word_value(2, &assignment), None);
        assert_eq!(spec.word_value_by_position(0, &[7, 3, 4, 1, 6, 8]), 734);
        assert_eq!(spec.word_value_by_position(2, &[7, 3, 4, 1, 6, 8]), 1468);
    }

    #[test]
    fn test_edit_rejects_taken_digit() {
        let spec = PuzzleSpec::new(["SEND", "MORE", "MONEY"]).unwrap();
        let (a, status) = apply_edit(&spec, &Assignment::new(), set('S', 9));
        assert_eq!(status, EditStatus::Applied);

        let (b, status) = apply_edit(&spec, &a, set('E', 9));
        assert_eq!(
            status,
            EditStatus::DigitTaken {
                digit: digit(9),
                letter: 'S'
            }
        );
        assert_eq!(a, b);

        // Same letter, same digit is fine.
        let (_, status) = apply_edit(&spec, &a, set('S', 9));
        assert_eq!(status, EditStatus::Applied);
    }

    #[test]
    fn test_edit_clear_and_unknown_letter() {
        let spec = PuzzleSpec::new(["TWO", "TWO", "FOUR"]).unwrap();
        let (a, _) = apply_edit(&spec, &Assignment::new(), set('T', 7));
        let (a, status) = apply_edit(&spec, &a, Edit::Clear { letter: 'T' });
        assert_eq!(status, EditStatus::Cleared);
        assert!(a.is_empty());

        let (_, status) = apply_edit(&spec, &a, set('Z', 1));
        assert!(status.is_rejected());
    }

    #[test]
    fn test_parse_letter_digit() {
        assert_eq!("s=9".parse::<LetterDigit>().unwrap(), LetterDigit('S', digit(9)));
        assert!("S=12".parse::<LetterDigit>().is_err());
        assert!("SE=1".parse::<LetterDigit>().is_err());
    }
}
