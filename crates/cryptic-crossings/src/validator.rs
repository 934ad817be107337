//! Checks a letter assignment against the cryptarithmetic rules.
//!
//! Rules are checked in a fixed order and the first failure wins:
//! completeness, uniqueness, leading-digit exclusion, arithmetic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ValidationError;
use crate::puzzle::{Assignment, Digit, Letter, PuzzleSpec};

/// A verified `operand1 + operand2 = sum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verified {
    pub operand1: u64,
    pub operand2: u64,
    pub sum: u64,
}

/// Validate a complete guess.
pub fn validate(spec: &PuzzleSpec, assignment: &Assignment) -> Result<Verified, ValidationError> {
    // Rule 1: every letter assigned, nothing else
    let missing: Vec<Letter> = spec
        .unique_letters()
        .iter()
        .copied()
        .filter(|&l| !assignment.contains(l))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingAssignment(missing));
    }
    let unknown: Vec<Letter> = assignment
        .iter()
        .map(|(l, _)| l)
        .filter(|&l| !spec.contains_letter(l))
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownLetter(unknown));
    }

    // Rule 2: digits are unique
    if let Some((digit, letters)) = duplicate_digits(assignment).into_iter().next() {
        return Err(ValidationError::DuplicateDigit { digit, letters });
    }

    // Rule 3: no leading zeros
    for letter in spec.leading_letters() {
        if assignment.get(letter) == Some(Digit::ZERO) {
            return Err(ValidationError::LeadingZero(letter));
        }
    }

    // Rule 4: the sum works out
    verify_arithmetic(spec, assignment)
}

/// Check only the arithmetic. Every letter of the puzzle must be assigned.
pub fn verify_arithmetic(
    spec: &PuzzleSpec,
    assignment: &Assignment,
) -> Result<Verified, ValidationError> {
    let value = |index: usize| {
        spec.word_value(index, assignment).ok_or_else(|| {
            ValidationError::MissingAssignment(
                spec.words()[index]
                    .chars()
                    .filter(|&l| !assignment.contains(l))
                    .collect(),
            )
        })
    };
    let operand1 = value(0)?;
    let operand2 = value(1)?;
    let expected = value(2)?;
    let computed_sum = operand1 + operand2;

    if computed_sum == expected {
        Ok(Verified {
            operand1,
            operand2,
            sum: computed_sum,
        })
    } else {
        Err(ValidationError::ArithmeticMismatch {
            computed_sum,
            expected,
        })
    }
}

/// Digits held by more than one letter, smallest digit first.
fn duplicate_digits(assignment: &Assignment) -> Vec<(Digit, Vec<Letter>)> {
    let mut by_digit: BTreeMap<Digit, Vec<Letter>> = BTreeMap::new();
    for (letter, digit) in assignment.iter() {
        by_digit.entry(digit).or_default().push(letter);
    }
    by_digit
        .into_iter()
        .filter(|(_, letters)| letters.len() > 1)
        .collect()
}

/// Feedback for a partial guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "hint", rename_all = "snake_case")]
pub enum Hint {
    Unassigned { letters: Vec<Letter> },
    LeadingZero { letter: Letter },
    DuplicateDigits { digits: Vec<Digit> },
    /// Everything is assigned but `left + right` is `sum`, not `result`.
    MathCheck {
        left: u64,
        right: u64,
        sum: u64,
        result: u64,
    },
}

/// Collect every applicable hint. An empty list means nothing is wrong so far.
pub fn hints(spec: &PuzzleSpec, assignment: &Assignment) -> Vec<Hint> {
    let mut hints = Vec::new();

    let unassigned: Vec<Letter> = spec
        .unique_letters()
        .iter()
        .copied()
        .filter(|&l| !assignment.contains(l))
        .collect();
    let complete = unassigned.is_empty();
    if !complete {
        hints.push(Hint::Unassigned {
            letters: unassigned,
        });
    }

    for letter in spec.leading_letters() {
        let hint = Hint::LeadingZero { letter };
        if assignment.get(letter) == Some(Digit::ZERO) && !hints.contains(&hint) {
            hints.push(hint);
        }
    }

    let duplicates: Vec<Digit> = duplicate_digits(assignment)
        .into_iter()
        .map(|(digit, _)| digit)
        .collect();
    if !duplicates.is_empty() {
        hints.push(Hint::DuplicateDigits { digits: duplicates });
    }

    if complete {
        if let Err(ValidationError::ArithmeticMismatch {
            computed_sum,
            expected,
        }) = verify_arithmetic(spec, assignment)
        {
            let (left, right) = (
                spec.word_value(0, assignment).unwrap_or_default(),
                spec.word_value(1, assignment).unwrap_or_default(),
            );
            hints.push(Hint::MathCheck {
                left,
                right,
                sum: computed_sum,
                result: expected,
            });
        }
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(pairs: &[(char, u8)]) -> Assignment {
        pairs
            .iter()
            .map(|&(l, d)| (l, Digit::new(d).unwrap()))
            .collect()
    }

    fn send_more_money() -> PuzzleSpec {
        PuzzleSpec::new(["SEND", "MORE", "MONEY"]).unwrap()
    }

    fn solution() -> Assignment {
        assignment(&[
            ('S', 9),
            ('E', 5),
            ('N', 6),
            ('D', 7),
            ('M', 1),
            ('O', 0),
            ('R', 8),
            ('Y', 2),
        ])
    }

    #[test]
    fn test_accepts_send_more_money() {
        let verified = validate(&send_more_money(), &solution()).unwrap();
        assert_eq!(
            verified,
            Verified {
                operand1: 9567,
                operand2: 1085,
                sum: 10652
            }
        );
        // Idempotent.
        assert_eq!(validate(&send_more_money(), &solution()).unwrap(), verified);
    }

    #[test]
    fn test_missing_assignment_first() {
        let mut guess = solution();
        guess.remove('Y');
        guess.insert('E', Digit::new(9).unwrap());
        assert_eq!(
            validate(&send_more_money(), &guess),
            Err(ValidationError::MissingAssignment(vec!['Y']))
        );
    }

    #[test]
    fn test_unknown_letter() {
        let mut guess = solution();
        guess.insert('Q', Digit::new(3).unwrap());
        assert_eq!(
            validate(&send_more_money(), &guess),
            Err(ValidationError::UnknownLetter(vec!['Q']))
        );
    }

    #[test]
    fn test_duplicate_digit_before_arithmetic() {
        let spec = PuzzleSpec::new(["TWO", "TWO", "FOUR"]).unwrap();
        let guess = assignment(&[('T', 7), ('W', 3), ('O', 4), ('F', 1), ('U', 3), ('R', 8)]);
        assert_eq!(
            validate(&spec, &guess),
            Err(ValidationError::DuplicateDigit {
                digit: Digit::new(3).unwrap(),
                letters: vec!['U', 'W'],
            })
        );
    }

    #[test]
    fn test_leading_zero_regardless_of_arithmetic() {
        // 0 + 1 = 1 adds up, but A leads a word.
        let spec = PuzzleSpec::new(["A", "B", "B"]).unwrap();
        let guess = assignment(&[('A', 0), ('B', 1)]);
        assert_eq!(
            validate(&spec, &guess),
            Err(ValidationError::LeadingZero('A'))
        );

        let mut guess = solution();
        guess.insert('M', Digit::new(0).unwrap());
        guess.insert('O', Digit::new(1).unwrap());
        assert_eq!(
            validate(&send_more_money(), &guess),
            Err(ValidationError::LeadingZero('M'))
        );
    }

    #[test]
    fn test_arithmetic_mismatch() {
        let mut guess = solution();
        guess.insert('Y', Digit::new(3).unwrap());
        assert_eq!(
            validate(&send_more_money(), &guess),
            Err(ValidationError::ArithmeticMismatch {
                computed_sum: 10652,
                expected: 10653
            })
        );
    }

    #[test]
    fn test_hints() {
        let spec = PuzzleSpec::new(["TWO", "TWO", "FOUR"]).unwrap();
        assert_eq!(
            hints(&spec, &assignment(&[('T', 0), ('W', 5), ('O', 5)])),
            vec![
                Hint::Unassigned {
                    letters: vec!['F', 'U', 'R']
                },
                Hint::LeadingZero { letter: 'T' },
                Hint::DuplicateDigits {
                    digits: vec![Digit::new(5).unwrap()]
                },
            ]
        );

        let wrong = assignment(&[('T', 7), ('W', 3), ('O', 4), ('F', 1), ('U', 6), ('R', 9)]);
        assert_eq!(
            hints(&spec, &wrong),
            vec![Hint::MathCheck {
                left: 734,
                right: 734,
                sum: 1468,
                result: 1469
            }]
        );

        let right = assignment(&[('T', 7), ('W', 3), ('O', 4), ('F', 1), ('U', 6), ('R', 8)]);
        assert!(hints(&spec, &right).is_empty());
    }
}
