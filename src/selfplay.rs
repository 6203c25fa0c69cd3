//! Engine-vs-engine matches.

use crate::board::Player;
use crate::constants::MAX_GAME_LEN;
use crate::mcts::{SearchError, SearchResult, Searcher};
use crate::position::{Move, Position};

/// One move of a self-play match.
#[derive(Debug, Clone)]
pub struct MoveRecord {
    /// 1-based move number
    pub number: usize,
    pub player: Player,
    pub mv: Move,
    /// The mover's estimated winning chance
    pub win_percentage: u32,
    /// Root visits of the search that chose the move
    pub root_visits: u32,
    /// Position after the move
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub winner: Player,
    pub moves: usize,
    pub final_position: Position,
}

/// Play a full game with both sides searching with `searcher`.
///
/// `observe` is called after every move.
///
/// # Errors
/// Propagates search failures, which cannot happen for a game still in
/// progress.
pub fn run_match(
    searcher: &Searcher,
    mut observe: impl FnMut(&MoveRecord),
) -> Result<MatchOutcome, SearchError> {
    let mut pos = Position::new();
    let mut number = 0;

    while pos.winner().is_none() && number < MAX_GAME_LEN {
        let player = pos.to_move();
        let SearchResult {
            best_move,
            win_percentage,
            root_visits,
            ..
        } = searcher.search(&pos)?;
        pos.play_unchecked(best_move);
        number += 1;
        observe(&MoveRecord {
            number,
            player,
            mv: best_move,
            win_percentage,
            root_visits,
            position: pos,
        });
    }

    let winner = pos.winner().ok_or(SearchError::NoLegalMoves)?;
    Ok(MatchOutcome {
        winner,
        moves: number,
        final_position: pos,
    })
}
