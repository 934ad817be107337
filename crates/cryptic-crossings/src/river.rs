//! Missionaries and cannibals river-crossing engine.
//!
//! The engine owns the characters, the per-bank counts and the boat. Callers
//! drive it only through [`RiverEngine::add_to_boat`],
//! [`RiverEngine::remove_from_boat`], [`RiverEngine::travel`] and
//! [`RiverEngine::restart`]. Safety is judged only when a crossing completes:
//! loading a boat that would leave a bank unsafe is allowed, and crossing
//! with it loses the game.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::error::RiverError;

/// `true` unless the bank has missionaries and they are outnumbered.
pub fn is_safe(missionaries_on_bank: usize, cannibals_on_bank: usize) -> bool {
    missionaries_on_bank == 0 || cannibals_on_bank <= missionaries_on_bank
}

/// Side of the river.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn bank(self) -> Location {
        match self {
            Side::Left => Location::LeftBank,
            Side::Right => Location::RightBank,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterKind {
    Missionary,
    Cannibal,
}

impl CharacterKind {
    fn prefix(self) -> char {
        match self {
            CharacterKind::Missionary => 'M',
            CharacterKind::Cannibal => 'C',
        }
    }
}

/// Where a character currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    LeftBank,
    RightBank,
    Boat,
}

/// Stable character identity, rendered as `M1`, `C4`, ...
///
/// Numbers are unique across both kinds: missionaries are numbered first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CharacterId {
    pub kind: CharacterKind,
    pub number: u32,
}

impl CharacterId {
    pub fn new(kind: CharacterKind, number: u32) -> Self {
        Self { kind, number }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid character id '{0}', expected M<n> or C<n>")]
pub struct ParseCharacterIdError(String);

impl FromStr for CharacterId {
    type Err = ParseCharacterIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCharacterIdError(s.to_string());
        let mut chars = s.chars();
        let kind = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('M') => CharacterKind::Missionary,
            Some('C') => CharacterKind::Cannibal,
            _ => return Err(invalid()),
        };
        let number = chars.as_str().parse().map_err(|_| invalid())?;
        Ok(CharacterId::new(kind, number))
    }
}

impl From<CharacterId> for String {
    fn from(id: CharacterId) -> String {
        id.to_string()
    }
}

impl TryFrom<String> for CharacterId {
    type Error = ParseCharacterIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: CharacterId,
    pub kind: CharacterKind,
    pub location: Location,
}

/// Population and boat size of one challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiverConfig {
    pub missionaries: usize,
    pub cannibals: usize,
    pub capacity: usize,
}

impl RiverConfig {
    pub fn new(missionaries: usize, cannibals: usize, capacity: usize) -> Self {
        Self {
            missionaries,
            cannibals,
            capacity,
        }
    }
}

/// Head count on one bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BankCounts {
    pub missionaries: usize,
    pub cannibals: usize,
}

impl BankCounts {
    pub fn is_safe(&self) -> bool {
        is_safe(self.missionaries, self.cannibals)
    }

    pub fn is_empty(&self) -> bool {
        self.missionaries == 0 && self.cannibals == 0
    }

    fn slot(&mut self, kind: CharacterKind) -> &mut usize {
        match kind {
            CharacterKind::Missionary => &mut self.missionaries,
            CharacterKind::Cannibal => &mut self.cannibals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiverStatus {
    Active,
    Won,
    Lost,
}

impl RiverStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RiverStatus::Active)
    }
}

/// Counts-only view of the river, taken before and after each crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub left: BankCounts,
    pub right: BankCounts,
    pub boat_side: Side,
    pub crew_size: usize,
    pub safe: bool,
}

/// One completed crossing. Kept for history only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub move_number: usize,
    pub from: Side,
    pub to: Side,
    pub passengers: Vec<CharacterId>,
    pub before: StateSnapshot,
    pub after: StateSnapshot,
}

/// Everything a renderer needs to draw the river.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiverSnapshot {
    pub characters: Vec<Character>,
    pub left: BankCounts,
    pub right: BankCounts,
    pub boat_side: Side,
    pub crew: Vec<CharacterId>,
    pub capacity: usize,
    pub safe: bool,
    pub status: RiverStatus,
    pub move_count: usize,
}

type Crew = SmallVec<[CharacterId; 4]>;

#[derive(Debug, Clone)]
struct RiverState {
    left: BankCounts,
    right: BankCounts,
    boat_side: Side,
    crew: Crew,
    move_count: usize,
    status: RiverStatus,
}

impl RiverState {
    fn initial(config: &RiverConfig) -> Self {
        Self {
            left: BankCounts {
                missionaries: config.missionaries,
                cannibals: config.cannibals,
            },
            right: BankCounts::default(),
            boat_side: Side::Left,
            crew: Crew::new(),
            move_count: 0,
            status: RiverStatus::Active,
        }
    }

    fn bank_mut(&mut self, side: Side) -> &mut BankCounts {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn is_safe(&self) -> bool {
        self.left.is_safe() && self.right.is_safe()
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            left: self.left,
            right: self.right,
            boat_side: self.boat_side,
            crew_size: self.crew.len(),
            safe: self.is_safe(),
        }
    }
}

/// The river-crossing state machine.
#[derive(Debug, Clone)]
pub struct RiverEngine {
    config: RiverConfig,
    state: RiverState,
    characters: Vec<Character>,
    history: Vec<MoveRecord>,
}

impl RiverEngine {
    /// Start a challenge: everyone on the left bank, boat on the left.
    pub fn new(config: RiverConfig) -> Self {
        let missionaries = (0..config.missionaries).map(|_| CharacterKind::Missionary);
        let cannibals = (0..config.cannibals).map(|_| CharacterKind::Cannibal);
        let characters = missionaries
            .chain(cannibals)
            .zip(1u32..)
            .map(|(kind, number)| Character {
                id: CharacterId::new(kind, number),
                kind,
                location: Location::LeftBank,
            })
            .collect();

        let engine = Self {
            config,
            state: RiverState::initial(&config),
            characters,
            history: Vec::new(),
        };
        engine.check_invariants();
        engine
    }

    /// Put everything back to the starting configuration and drop the history.
    pub fn restart(&mut self) {
        debug!(moves = self.state.move_count, "restarting river challenge");
        *self = Self::new(self.config);
    }

    pub fn config(&self) -> RiverConfig {
        self.config
    }

    pub fn status(&self) -> RiverStatus {
        self.state.status
    }

    pub fn is_terminal(&self) -> bool {
        self.state.status.is_terminal()
    }

    pub fn boat_side(&self) -> Side {
        self.state.boat_side
    }

    pub fn left(&self) -> BankCounts {
        self.state.left
    }

    pub fn right(&self) -> BankCounts {
        self.state.right
    }

    pub fn crew(&self) -> &[CharacterId] {
        &self.state.crew
    }

    pub fn move_count(&self) -> usize {
        self.state.move_count
    }

    pub fn is_safe(&self) -> bool {
        self.state.is_safe()
    }

    /// `true` when a `travel()` right now would be accepted.
    pub fn can_travel(&self) -> bool {
        !self.is_terminal() && !self.state.crew.is_empty()
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Characters standing on a bank (not aboard).
    pub fn characters_on(&self, side: Side) -> impl Iterator<Item = &Character> + '_ {
        let bank = side.bank();
        self.characters.iter().filter(move |c| c.location == bank)
    }

    pub fn characters_aboard(&self) -> impl Iterator<Item = &Character> + '_ {
        self.characters
            .iter()
            .filter(|c| c.location == Location::Boat)
    }

    pub fn snapshot(&self) -> RiverSnapshot {
        RiverSnapshot {
            characters: self.characters.clone(),
            left: self.state.left,
            right: self.state.right,
            boat_side: self.state.boat_side,
            crew: self.state.crew.to_vec(),
            capacity: self.config.capacity,
            safe: self.state.is_safe(),
            status: self.state.status,
            move_count: self.state.move_count,
        }
    }

    fn character_index(&self, id: CharacterId) -> Option<usize> {
        self.characters.iter().position(|c| c.id == id)
    }

    /// Load a character standing on the boat's bank.
    pub fn add_to_boat(&mut self, id: CharacterId) -> Result<(), RiverError> {
        if self.is_terminal() {
            return Err(RiverError::GameOver);
        }
        let index = self.character_index(id).ok_or(RiverError::NotFound(id))?;
        let character = self.characters[index];
        if character.location == Location::Boat {
            return Err(RiverError::AlreadyAboard(id));
        }
        if character.location != self.state.boat_side.bank() {
            return Err(RiverError::WrongSide(id));
        }
        if self.state.crew.len() >= self.config.capacity {
            return Err(RiverError::CapacityExceeded {
                capacity: self.config.capacity,
            });
        }

        let side = self.state.boat_side;
        *self.state.bank_mut(side).slot(character.kind) -= 1;
        self.state.crew.push(id);
        self.characters[index].location = Location::Boat;
        debug!(%id, %side, crew = self.state.crew.len(), "boarded");

        self.check_invariants();
        Ok(())
    }

    /// Unload a character back onto the boat's bank.
    pub fn remove_from_boat(&mut self, id: CharacterId) -> Result<(), RiverError> {
        if self.is_terminal() {
            return Err(RiverError::GameOver);
        }
        let slot = self
            .state
            .crew
            .iter()
            .position(|&c| c == id)
            .ok_or(RiverError::NotAboard(id))?;
        let index = self.character_index(id).ok_or(RiverError::NotFound(id))?;

        let side = self.state.boat_side;
        self.state.crew.remove(slot);
        *self.state.bank_mut(side).slot(self.characters[index].kind) += 1;
        self.characters[index].location = side.bank();
        debug!(%id, %side, crew = self.state.crew.len(), "left the boat");

        self.check_invariants();
        Ok(())
    }

    /// Board if ashore, unboard if aboard: the click action of a UI.
    pub fn toggle(&mut self, id: CharacterId) -> Result<Location, RiverError> {
        if self.state.crew.contains(&id) {
            self.remove_from_boat(id)?;
        } else {
            self.add_to_boat(id)?;
        }
        Ok(self.characters[self.character_index(id).ok_or(RiverError::NotFound(id))?].location)
    }

    /// Row the boat across, unload the crew, then judge the new state.
    pub fn travel(&mut self) -> Result<RiverStatus, RiverError> {
        if self.is_terminal() {
            return Err(RiverError::GameOver);
        }
        let crew_size = self.state.crew.len();
        if crew_size == 0 {
            return Err(RiverError::EmptyBoat);
        }
        debug_assert!(
            crew_size <= self.config.capacity,
            "boat over capacity at departure: {crew_size} aboard, capacity {}",
            self.config.capacity
        );
        if crew_size > self.config.capacity {
            error!(
                crew = crew_size,
                capacity = self.config.capacity,
                "boat over capacity at departure"
            );
            return Err(RiverError::OverCapacity {
                crew: crew_size,
                capacity: self.config.capacity,
            });
        }

        let before = self.state.snapshot();
        let from = self.state.boat_side;
        let to = from.opposite();
        let passengers: Vec<CharacterId> = self.state.crew.drain(..).collect();

        self.state.boat_side = to;
        for &id in &passengers {
            if let Some(index) = self.character_index(id) {
                let kind = self.characters[index].kind;
                self.characters[index].location = to.bank();
                *self.state.bank_mut(to).slot(kind) += 1;
            }
        }
        self.state.move_count += 1;
        self.evaluate();

        let after = self.state.snapshot();
        debug!(
            move_number = self.state.move_count,
            %from,
            %to,
            passengers = passengers.len(),
            safe = after.safe,
            "crossed"
        );
        self.history.push(MoveRecord {
            move_number: self.state.move_count,
            from,
            to,
            passengers,
            before,
            after,
        });

        self.check_invariants();
        Ok(self.state.status)
    }

    /// Terminal evaluation after a crossing.
    fn evaluate(&mut self) {
        if !self.state.is_safe() {
            info!(left = ?self.state.left, right = ?self.state.right, "missionaries outnumbered");
            self.state.status = RiverStatus::Lost;
        } else if self.state.left.is_empty()
            && self.state.crew.is_empty()
            && self.state.boat_side == Side::Right
        {
            info!(moves = self.state.move_count, "everyone crossed");
            self.state.status = RiverStatus::Won;
        }
    }

    /// Conservation: every character is counted in exactly one place.
    fn check_invariants(&self) {
        for kind in [CharacterKind::Missionary, CharacterKind::Cannibal] {
            let count_at = |location: Location| {
                self.characters
                    .iter()
                    .filter(|c| c.kind == kind && c.location == location)
                    .count()
            };
            let total = match kind {
                CharacterKind::Missionary => self.config.missionaries,
                CharacterKind::Cannibal => self.config.cannibals,
            };
            let (left, right) = match kind {
                CharacterKind::Missionary => {
                    (self.state.left.missionaries, self.state.right.missionaries)
                }
                CharacterKind::Cannibal => (self.state.left.cannibals, self.state.right.cannibals),
            };
            let aboard = self.state.crew.iter().filter(|id| id.kind == kind).count();

            assert_eq!(count_at(Location::LeftBank), left, "left bank count drifted");
            assert_eq!(count_at(Location::RightBank), right, "right bank count drifted");
            assert_eq!(count_at(Location::Boat), aboard, "boat crew drifted");
            assert_eq!(left + right + aboard, total, "{kind:?} population not conserved");
        }
    }
}
