//! Ten-MCTS: a time-bounded Monte Carlo Tree Search engine for the
//! 9-subboard (3x3 of 3x3) tic-tac-toe variant.
//!
//! Each move is a cell of a subboard, and the cell index decides the
//! subboard the opponent must answer in. Subboards are won by a 3-in-a-row;
//! the game is won by a 3-in-a-row of won subboards, or else by the larger
//! number of won subboards once all are decided (equal counts go to the
//! first player).
//!
//! ## Modules
//!
//! - [`constants`] - Board geometry, search defaults and wire values
//! - [`board`] - Players, cells and the bitmask subboard
//! - [`position`] - The global board: legal moves, move application, status
//! - [`playout`] - Uniform random rollouts
//! - [`mcts`] - The search tree and the time-bounded controller
//! - [`config`] - Runtime search settings
//! - [`protocol`] - JSON snapshot protocol for game clients
//! - [`selfplay`] - Engine-vs-engine matches
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use ten_mcts::mcts::tree_search;
//! use ten_mcts::position::{Move, new_game};
//!
//! // Create a new game and play the center of the center subboard
//! let mut pos = new_game();
//! pos.play(Move::new(4, 4)).unwrap();
//!
//! // Search for the best reply
//! let result = tree_search(&pos, Duration::from_millis(20)).unwrap();
//! println!("Best move: {} ({}%)", result.best_move, result.win_percentage);
//! ```

pub mod board;
pub mod config;
pub mod constants;
pub mod mcts;
pub mod playout;
pub mod position;
pub mod protocol;
pub mod selfplay;
