//! Button set representation
//!
//! Buttons are stored as bit flags. Every button has a single-letter name and
//! a fixed position in the canonical order used when a line is formatted:
//! `L R U D J X G C S`.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;

use crate::errors::CoreError;

bitflags! {
    /// Set of buttons held for the duration of a line
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Buttons: u16 {
        /// `L`
        const LEFT = 1 << 0;
        /// `R`
        const RIGHT = 1 << 1;
        /// `U`
        const UP = 1 << 2;
        /// `D`
        const DOWN = 1 << 3;
        /// `J`
        const JUMP = 1 << 4;
        /// `X`
        const DASH = 1 << 5;
        /// `G`
        const GRAB = 1 << 6;
        /// `C`
        const CONFIRM = 1 << 7;
        /// `S`
        const PAUSE = 1 << 8;
    }
}

/// Letter names in canonical order
const LETTERS: [(char, Buttons); 9] = [
    ('L', Buttons::LEFT),
    ('R', Buttons::RIGHT),
    ('U', Buttons::UP),
    ('D', Buttons::DOWN),
    ('J', Buttons::JUMP),
    ('X', Buttons::DASH),
    ('G', Buttons::GRAB),
    ('C', Buttons::CONFIRM),
    ('S', Buttons::PAUSE),
];

impl Buttons {
    /// The horizontal direction pair
    pub const HORIZONTAL: Self = Self::LEFT.union(Self::RIGHT);

    /// The vertical direction pair
    pub const VERTICAL: Self = Self::UP.union(Self::DOWN);

    /// Look up a single button by its letter, ignoring case
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        LETTERS
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, button)| *button)
    }

    /// Letter of a single button, `None` for empty or multi-button sets
    #[must_use]
    pub fn letter(self) -> Option<char> {
        LETTERS
            .iter()
            .find(|(_, button)| *button == self)
            .map(|(name, _)| *name)
    }

    /// Every single button in canonical order
    pub fn canonical() -> impl Iterator<Item = Self> {
        LETTERS.iter().map(|(_, button)| *button)
    }

    /// Letters of all held buttons in canonical order
    #[must_use]
    pub fn letters(self) -> String {
        LETTERS
            .iter()
            .filter(|(_, button)| self.contains(*button))
            .map(|(name, _)| *name)
            .collect()
    }

    /// The opposite direction of a single direction button
    #[must_use]
    pub fn opposite(self) -> Option<Self> {
        [Self::HORIZONTAL, Self::VERTICAL]
            .into_iter()
            .find(|axis| self != *axis && axis.contains(self) && !self.is_empty())
            .map(|axis| axis.difference(self))
    }

    /// Whether both directions of an axis are held at once
    #[must_use]
    pub fn has_conflict(self) -> bool {
        self.contains(Self::HORIZONTAL) || self.contains(Self::VERTICAL)
    }
}

impl fmt::Display for Buttons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

impl FromStr for Buttons {
    type Err = CoreError;

    /// Parse a run of button letters, skipping `,` and whitespace delimiters
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .try_fold(Self::empty(), |held, letter| {
                Self::from_letter(letter)
                    .map(|button| held | button)
                    .ok_or(CoreError::UnknownButton(letter))
            })
    }
}
