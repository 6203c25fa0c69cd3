//! Monte Carlo rollouts (uniform random game simulation).
//!
//! A rollout plays uniformly random legal moves until the game is decided,
//! then reports the winner. Each rollout owns its generator, so rollouts can
//! run on different threads without sharing any random state.

use crate::board::Player;
use crate::constants::{MAX_GAME_LEN, SUBBOARDS};
use crate::position::{Move, Position};

/// Index of the `n`-th set bit of `mask` (0-based).
#[inline]
fn nth_set_bit(mut mask: u16, n: u32) -> u8 {
    for _ in 0..n {
        mask &= mask - 1;
    }
    mask.trailing_zeros() as u8
}

/// Choose a uniformly random legal move without allocating.
///
/// Only meaningful for a position that is still in progress; returns `None`
/// when no subboard offers an empty cell.
pub fn choose_random_move(pos: &Position, rng: &mut fastrand::Rng) -> Option<Move> {
    if let Some(s) = pos.active_subboard() {
        let empties = pos.subboard(s).empty_mask();
        if empties == 0 {
            return None;
        }
        let n = rng.u32(0..empties.count_ones());
        return Some(Move::new(s as u8, nth_set_bit(empties, n)));
    }

    let mut masks = [0u16; SUBBOARDS];
    let mut total = 0;
    for (s, mask) in masks.iter_mut().enumerate() {
        if pos.subboard_status(s).is_undecided() {
            *mask = pos.subboard(s).empty_mask();
            total += mask.count_ones();
        }
    }
    if total == 0 {
        return None;
    }

    let mut n = rng.u32(0..total);
    for (s, &mask) in masks.iter().enumerate() {
        let count = mask.count_ones();
        if n < count {
            return Some(Move::new(s as u8, nth_set_bit(mask, n)));
        }
        n -= count;
    }
    None
}

/// Plays random moves on `pos` until the game is decided and returns the
/// winner.
pub fn rollout(pos: &mut Position, rng: &mut fastrand::Rng) -> Player {
    // Every move fills a cell, so the loop is bounded by the board size.
    for _ in 0..=MAX_GAME_LEN {
        if let Some(winner) = pos.winner() {
            return winner;
        }
        match choose_random_move(pos, rng) {
            Some(mv) => pos.play_unchecked(mv),
            None => break,
        }
    }
    // An in-progress position always has an empty cell in an undecided
    // subboard, so this is reached only for hand-built inconsistent input.
    pos.winner().unwrap_or(Player::A)
}
