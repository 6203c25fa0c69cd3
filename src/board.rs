//! Subboard primitives: players, cells, and the 3x3 subboard.
//!
//! A subboard is stored as one 9-bit occupancy mask per player. Bit `c` is
//! set when that player owns cell `c`. Line detection is a mask test against
//! [`LINES`], so computing a status never allocates or loops over cells.

use std::fmt;

use crate::constants::{FULL_MASK, LINES};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    /// The first player ("black").
    A,
    /// The second player ("white").
    B,
}

impl Player {
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    /// Single-character mark used when printing boards.
    pub fn mark(self) -> char {
        match self {
            Player::A => 'b',
            Player::B => 'w',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::A => write!(f, "Black"),
            Player::B => write!(f, "White"),
        }
    }
}

/// Content of a single cell: `None` when empty.
pub type Cell = Option<Player>;

/// Derived status of a subboard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SubboardStatus {
    /// At least one empty cell and no 3-in-a-row.
    #[default]
    Undecided,
    /// The player completed a 3-in-a-row.
    Won(Player),
    /// No empty cell and no 3-in-a-row.
    Full,
}

impl SubboardStatus {
    #[inline]
    pub fn is_undecided(self) -> bool {
        self == SubboardStatus::Undecided
    }

    /// The winning player, if any.
    #[inline]
    pub fn winner(self) -> Option<Player> {
        match self {
            SubboardStatus::Won(p) => Some(p),
            _ => None,
        }
    }
}

/// Returns true if `mask` covers at least one of the 8 winning lines.
#[inline]
pub fn has_line(mask: u16) -> bool {
    LINES.iter().any(|&line| mask & line == line)
}

/// One 3x3 subboard.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Subboard {
    a: u16,
    b: u16,
}

impl Subboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupancy mask of the given player.
    #[inline]
    pub fn mask(&self, player: Player) -> u16 {
        match player {
            Player::A => self.a,
            Player::B => self.b,
        }
    }

    /// Mask of the empty cells.
    #[inline]
    pub fn empty_mask(&self) -> u16 {
        !(self.a | self.b) & FULL_MASK
    }

    pub fn get(&self, cell: usize) -> Cell {
        let bit = 1u16 << cell;
        if self.a & bit != 0 {
            Some(Player::A)
        } else if self.b & bit != 0 {
            Some(Player::B)
        } else {
            None
        }
    }

    /// Places a mark without checking that the cell is empty.
    #[inline]
    pub fn set(&mut self, cell: usize, player: Player) {
        let bit = 1u16 << cell;
        match player {
            Player::A => self.a |= bit,
            Player::B => self.b |= bit,
        }
    }

    /// Overwrites a cell, clearing any previous mark.
    pub fn put(&mut self, cell: usize, value: Cell) {
        let bit = 1u16 << cell;
        self.a &= !bit;
        self.b &= !bit;
        if let Some(player) = value {
            self.set(cell, player);
        }
    }

    /// Computes the status from the cell contents.
    ///
    /// A completed line wins even if empty cells remain. If both players
    /// somehow own a line (only possible in hand-built positions), player A
    /// takes precedence.
    #[inline]
    pub fn status(&self) -> SubboardStatus {
        if has_line(self.a) {
            SubboardStatus::Won(Player::A)
        } else if has_line(self.b) {
            SubboardStatus::Won(Player::B)
        } else if self.a | self.b == FULL_MASK {
            SubboardStatus::Full
        } else {
            SubboardStatus::Undecided
        }
    }
}

impl fmt::Display for Subboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for col in 0..3 {
                let ch = self.get(row * 3 + col).map_or('.', Player::mark);
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
