//! Global board representation and move execution.
//!
//! This module provides the game state machine searched by the engine:
//! - Nine [`Subboard`]s with a cached status per subboard
//! - The active-subboard rule (the cell index of the last move picks the
//!   subboard the opponent must play in, unless that subboard is decided)
//! - Checked and unchecked move application
//! - Two-level game status: a meta tic-tac-toe over the subboard statuses,
//!   with a won-subboard count tie-break once every subboard is decided
//!
//! [`Position`] is a small `Copy` value with no heap data, so copying a board
//! for a simulation branch is a plain memcpy.

use std::fmt;

use thiserror::Error;

use crate::board::{Cell, Player, Subboard, SubboardStatus, has_line};
use crate::constants::{CELLS, SUBBOARDS};

/// A move: a cell inside a subboard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub subboard: u8,
    pub cell: u8,
}

impl Move {
    pub const fn new(subboard: u8, cell: u8) -> Self {
        Self { subboard, cell }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.subboard, self.cell)
    }
}

/// Reason a checked move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move: index out of range")]
    OutOfBounds,
    #[error("illegal move: must play in subboard {0}")]
    WrongSubboard(u8),
    #[error("illegal move: subboard already decided")]
    SubboardClosed,
    #[error("illegal move: cell not empty")]
    Occupied,
}

/// Outcome of the whole game.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    AWins,
    BWins,
}

impl GameStatus {
    pub fn won_by(player: Player) -> Self {
        match player {
            Player::A => GameStatus::AWins,
            Player::B => GameStatus::BWins,
        }
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            GameStatus::InProgress => None,
            GameStatus::AWins => Some(Player::A),
            GameStatus::BWins => Some(Player::B),
        }
    }

    #[inline]
    pub fn is_decided(self) -> bool {
        self != GameStatus::InProgress
    }
}

/// The global board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    subboards: [Subboard; SUBBOARDS],
    /// Cached status per subboard, kept in sync by every mutation
    statuses: [SubboardStatus; SUBBOARDS],
    /// Subboard the current player is restricted to (`None` = free move)
    active: Option<usize>,
    to_move: Player,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh starting position.
pub fn new_game() -> Position {
    Position::new()
}

impl Position {
    /// Empty board, free move, player A to play.
    pub fn new() -> Self {
        Position {
            subboards: [Subboard::new(); SUBBOARDS],
            statuses: [SubboardStatus::Undecided; SUBBOARDS],
            active: None,
            to_move: Player::A,
        }
    }

    /// Builds a position from raw cell contents, indexed `[subboard][cell]`.
    ///
    /// Subboard statuses are recomputed. An `active` subboard that is not
    /// undecided cannot be played in, so it is normalized to a free move.
    pub fn from_cells(
        cells: &[[Cell; CELLS]; SUBBOARDS],
        active: Option<usize>,
        to_move: Player,
    ) -> Self {
        let mut pos = Position {
            to_move,
            ..Position::new()
        };
        for (s, row) in cells.iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                pos.subboards[s].put(c, cell);
            }
            pos.statuses[s] = pos.subboards[s].status();
        }
        pos.active = active.filter(|&s| s < SUBBOARDS && pos.statuses[s].is_undecided());
        pos
    }

    #[inline]
    pub fn cell(&self, subboard: usize, cell: usize) -> Cell {
        self.subboards[subboard].get(cell)
    }

    #[inline]
    pub fn subboard(&self, subboard: usize) -> &Subboard {
        &self.subboards[subboard]
    }

    #[inline]
    pub fn subboard_status(&self, subboard: usize) -> SubboardStatus {
        self.statuses[subboard]
    }

    /// Subboard the player to move is restricted to, or `None` for any.
    #[inline]
    pub fn active_subboard(&self) -> Option<usize> {
        self.active
    }

    #[inline]
    pub fn to_move(&self) -> Player {
        self.to_move
    }

    /// Hands the turn to the other player without placing a mark.
    pub(crate) fn switch_player(&mut self) {
        self.to_move = self.to_move.opponent();
    }

    /// Validates a move against the legality rule without applying it.
    pub fn check_move(&self, mv: Move) -> Result<(), MoveError> {
        let (s, c) = (mv.subboard as usize, mv.cell as usize);
        if s >= SUBBOARDS || c >= CELLS {
            return Err(MoveError::OutOfBounds);
        }
        if let Some(active) = self.active {
            if active != s {
                return Err(MoveError::WrongSubboard(active as u8));
            }
        }
        if !self.statuses[s].is_undecided() {
            return Err(MoveError::SubboardClosed);
        }
        if self.subboards[s].get(c).is_some() {
            return Err(MoveError::Occupied);
        }
        Ok(())
    }

    #[inline]
    pub fn is_legal(&self, mv: Move) -> bool {
        self.check_move(mv).is_ok()
    }

    /// All legal moves, subboard-major then cell order.
    ///
    /// Empty exactly when the game is decided.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.status().is_decided() {
            return Vec::new();
        }
        let mut moves = Vec::with_capacity(SUBBOARDS * CELLS);
        let range = match self.active {
            Some(s) => s..s + 1,
            None => 0..SUBBOARDS,
        };
        for s in range {
            if !self.statuses[s].is_undecided() {
                continue;
            }
            let mut empties = self.subboards[s].empty_mask();
            while empties != 0 {
                let c = empties.trailing_zeros() as u8;
                moves.push(Move::new(s as u8, c));
                empties &= empties - 1;
            }
        }
        moves
    }

    /// Applies a move known to be legal.
    ///
    /// No validation happens here; an illegal move leaves the position in an
    /// unspecified (but memory-safe) state.
    #[inline]
    pub fn play_unchecked(&mut self, mv: Move) {
        let (s, c) = (mv.subboard as usize, mv.cell as usize);
        self.subboards[s].set(c, self.to_move);
        self.statuses[s] = self.subboards[s].status();
        self.active = self.statuses[c].is_undecided().then_some(c);
        self.to_move = self.to_move.opponent();
    }

    /// Applies a move after validating it. The position is untouched on error.
    pub fn play(&mut self, mv: Move) -> Result<(), MoveError> {
        self.check_move(mv)?;
        self.play_unchecked(mv);
        Ok(())
    }

    /// Meta-board masks: bit `s` set when subboard `s` is won by A (first)
    /// or B (second). The third value is whether any subboard is undecided.
    fn meta_masks(&self) -> (u16, u16, bool) {
        let mut meta_a = 0u16;
        let mut meta_b = 0u16;
        let mut undecided = false;
        for (s, status) in self.statuses.iter().enumerate() {
            match status {
                SubboardStatus::Won(Player::A) => meta_a |= 1 << s,
                SubboardStatus::Won(Player::B) => meta_b |= 1 << s,
                SubboardStatus::Undecided => undecided = true,
                SubboardStatus::Full => {}
            }
        }
        (meta_a, meta_b, undecided)
    }

    /// Computes the game status from scratch.
    ///
    /// A meta 3-in-a-row wins outright. With no meta line, the game is in
    /// progress while any subboard is undecided. Once every subboard is
    /// decided, the player with more won subboards wins and equal counts go
    /// to player A.
    pub fn status(&self) -> GameStatus {
        let (meta_a, meta_b, undecided) = self.meta_masks();
        if has_line(meta_a) {
            GameStatus::AWins
        } else if has_line(meta_b) {
            GameStatus::BWins
        } else if undecided {
            GameStatus::InProgress
        } else if meta_b.count_ones() > meta_a.count_ones() {
            GameStatus::BWins
        } else {
            GameStatus::AWins
        }
    }

    /// Winner of a decided game.
    pub fn winner(&self) -> Option<Player> {
        self.status().winner()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current player: {}", self.to_move)?;
        writeln!(f, "-----------------")?;
        for big_row in 0..3 {
            for inner_row in 0..3 {
                for big_col in 0..3 {
                    let s = big_row * 3 + big_col;
                    for inner_col in 0..3 {
                        let ch = self.cell(s, inner_row * 3 + inner_col).map_or('.', Player::mark);
                        write!(f, "{ch}")?;
                        if inner_col < 2 {
                            write!(f, " ")?;
                        }
                    }
                    if big_col < 2 {
                        write!(f, "|")?;
                    }
                }
                writeln!(f)?;
            }
            if big_row < 2 {
                writeln!(f, "- - -*- - -*- - -")?;
            }
        }
        write!(f, "-----------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Cell = Some(Player::A);
    const B: Cell = Some(Player::B);
    const E: Cell = None;

    /// A full subboard with no line.
    const DRAWN: [Cell; CELLS] = [A, B, A, A, B, B, B, A, A];

    #[test]
    fn test_new_game() {
        let pos = new_game();
        assert_eq!(pos.to_move(), Player::A);
        assert_eq!(pos.active_subboard(), None);
        assert_eq!(pos.status(), GameStatus::InProgress);
        assert_eq!(pos.legal_moves().len(), SUBBOARDS * CELLS);
    }

    #[test]
    fn test_center_move_sends_to_center() {
        let mut pos = Position::new();
        pos.play(Move::new(4, 4)).unwrap();
        assert_eq!(pos.active_subboard(), Some(4));
        assert_eq!(pos.to_move(), Player::B);
        assert_eq!(pos.cell(4, 4), A);

        let moves = pos.legal_moves();
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|m| m.subboard == 4 && m.cell != 4));
    }

    #[test]
    fn test_move_into_full_subboard_frees_opponent() {
        let mut cells = [[E; CELLS]; SUBBOARDS];
        cells[4] = DRAWN;
        let mut pos = Position::from_cells(&cells, Some(0), Player::A);
        assert_eq!(pos.subboard_status(4), SubboardStatus::Full);

        pos.play(Move::new(0, 4)).unwrap();
        assert_eq!(pos.active_subboard(), None);
        assert!(pos.legal_moves().iter().all(|m| m.subboard != 4));
    }

    #[test]
    fn test_move_winning_target_subboard_frees_opponent() {
        // Playing cell 0 of subboard 0 wins subboard 0 and would send the
        // opponent back to it.
        let mut cells = [[E; CELLS]; SUBBOARDS];
        cells[0][1] = A;
        cells[0][2] = A;
        cells[5][0] = B;
        let mut pos = Position::from_cells(&cells, Some(0), Player::A);

        pos.play(Move::new(0, 0)).unwrap();
        assert_eq!(pos.subboard_status(0), SubboardStatus::Won(Player::A));
        assert_eq!(pos.active_subboard(), None);
    }

    #[test]
    fn test_checked_move_rejections_leave_state_untouched() {
        let mut pos = Position::new();
        pos.play(Move::new(4, 0)).unwrap();
        let before = pos;

        assert_eq!(pos.play(Move::new(9, 0)), Err(MoveError::OutOfBounds));
        assert_eq!(pos.play(Move::new(0, 9)), Err(MoveError::OutOfBounds));
        assert_eq!(pos.play(Move::new(1, 1)), Err(MoveError::WrongSubboard(0)));
        assert_eq!(pos, before);

        // Subboard 0 is active; occupy cell 0 of subboard 4 again from there.
        pos.play(Move::new(0, 4)).unwrap();
        let before = pos;
        assert_eq!(pos.play(Move::new(4, 0)), Err(MoveError::Occupied));
        assert_eq!(pos, before);
    }

    #[test]
    fn test_closed_subboard_rejected_on_free_move() {
        let mut cells = [[E; CELLS]; SUBBOARDS];
        cells[2] = [A, A, A, E, E, E, E, E, E];
        let mut pos = Position::from_cells(&cells, None, Player::B);
        assert_eq!(pos.play(Move::new(2, 5)), Err(MoveError::SubboardClosed));
        assert!(pos.play(Move::new(3, 5)).is_ok());
    }

    #[test]
    fn test_from_cells_normalizes_decided_active_subboard() {
        let mut cells = [[E; CELLS]; SUBBOARDS];
        cells[7] = DRAWN;
        let pos = Position::from_cells(&cells, Some(7), Player::A);
        assert_eq!(pos.active_subboard(), None);
    }

    #[test]
    fn test_meta_line_wins_outright() {
        let mut cells = [[E; CELLS]; SUBBOARDS];
        for s in [2, 4, 6] {
            cells[s] = [B, B, B, E, E, E, E, E, E];
        }
        let pos = Position::from_cells(&cells, None, Player::A);
        assert_eq!(pos.status(), GameStatus::BWins);
        assert!(pos.legal_moves().is_empty());
    }

    #[test]
    fn test_equal_counts_go_to_first_player() {
        // Won subboards: A at 0,1,5,6 and B at 2,3,7,8; subboard 4 drawn.
        // No meta line exists for either side.
        let won_a = [A, A, A, E, B, E, B, E, E];
        let won_b = [B, B, B, E, A, E, A, E, E];
        let mut cells = [[E; CELLS]; SUBBOARDS];
        for s in [0, 1, 5, 6] {
            cells[s] = won_a;
        }
        for s in [2, 3, 7, 8] {
            cells[s] = won_b;
        }
        cells[4] = DRAWN;
        let pos = Position::from_cells(&cells, None, Player::B);
        assert_eq!(pos.status(), GameStatus::AWins);
        assert!(pos.legal_moves().is_empty());
    }

    #[test]
    fn test_more_won_subboards_wins() {
        // A at 0,5,7; B at 1,2,3,8 (no meta line); 4 and 6 drawn.
        let won_a = [A, A, A, E, E, E, E, E, E];
        let won_b = [B, B, B, E, E, E, E, E, E];
        let mut cells = [[E; CELLS]; SUBBOARDS];
        for s in [0, 5, 7] {
            cells[s] = won_a;
        }
        for s in [1, 2, 3, 8] {
            cells[s] = won_b;
        }
        cells[4] = DRAWN;
        cells[6] = DRAWN;
        let pos = Position::from_cells(&cells, None, Player::A);
        assert_eq!(pos.status(), GameStatus::BWins);
    }

    #[test]
    fn test_copy_is_independent() {
        let original = Position::new();
        let mut copy = original;
        copy.play(Move::new(4, 4)).unwrap();
        assert_eq!(original.cell(4, 4), E);
        assert_eq!(original.active_subboard(), None);
        assert_eq!(original, Position::new());
    }

    #[test]
    fn test_display() {
        let mut pos = Position::new();
        pos.play(Move::new(0, 0)).unwrap();
        pos.play(Move::new(0, 8)).unwrap();
        let text = pos.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Current player: Black");
        assert_eq!(lines[2], "b . .|. . .|. . .");
        assert_eq!(lines[4], ". . w|. . .|. . .");
        assert_eq!(lines[5], "- - -*- - -*- - -");
        assert_eq!(lines.len(), 14);
    }
}
