//! Snapshot protocol for game clients.
//!
//! A client sends the board as it stood before the human's move together
//! with that move; the engine validates and applies the move, searches for a
//! reply, and answers with the AI move and the new game state.
//!
//! ## Wire format
//!
//! One JSON object per line in each direction. Request:
//!
//! ```text
//! {"boardBeforeHumanMove": {"cells": [[0, 1, -1, ...], ...],
//!                           "activeSubboard": -1,
//!                           "currentPlayer": 1},
//!  "humanMove": [4, 4]}
//! ```
//!
//! `cells` is indexed `[subboard][cell]` with `0` empty, `1` the first
//! player, `-1` the second player. The older field names `board`,
//! `currentBigSquareLegalPosition` and `currentPlayerIdentity` are accepted.
//!
//! Response:
//!
//! ```text
//! {"aiMove": [4, 0], "activeSubboard": 0, "status": 0, "aiWinningProbability": 57}
//! ```
//!
//! `status` is `0` while the game goes on, `1`/`-1` when that player has
//! won, and `2` when the human move was illegal. Requests that cannot be
//! decoded get `{"error": "..."}`.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::board::{Cell, Player};
use crate::constants::{
    CELLS, SUBBOARDS, WIRE_ANY_SUBBOARD, WIRE_EMPTY, WIRE_NO_MOVE, WIRE_PLAYER_A, WIRE_PLAYER_B,
    WIRE_STATUS_ILLEGAL,
};
use crate::mcts::{SearchError, Searcher};
use crate::position::{GameStatus, Move, MoveError, Position};

/// Board state as exchanged with clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    #[serde(alias = "board")]
    pub cells: Vec<Vec<i32>>,
    #[serde(alias = "currentBigSquareLegalPosition")]
    pub active_subboard: i32,
    #[serde(alias = "currentPlayerIdentity")]
    pub current_player: i32,
}

/// A human move together with the board it was played on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMove {
    pub board_before_human_move: BoardSnapshot,
    pub human_move: [i32; 2],
}

/// The engine's answer to a [`ClientMove`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResponse {
    pub ai_move: [i32; 2],
    pub active_subboard: i32,
    pub status: i32,
    pub ai_winning_probability: u32,
}

impl ServerResponse {
    /// Sentinel for a rejected human move.
    pub fn illegal_move() -> Self {
        Self {
            ai_move: WIRE_NO_MOVE,
            active_subboard: WIRE_ANY_SUBBOARD,
            status: WIRE_STATUS_ILLEGAL,
            ai_winning_probability: 0,
        }
    }

    /// The human move ended the game; no AI move follows.
    pub fn player_win(winner: Player) -> Self {
        Self {
            ai_move: WIRE_NO_MOVE,
            active_subboard: WIRE_ANY_SUBBOARD,
            status: encode_player(winner),
            ai_winning_probability: 0,
        }
    }
}

/// Malformed snapshot data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("expected a 9x9 cell grid")]
    Shape,
    #[error("bad cell value {value} at subboard {subboard}, cell {cell}")]
    Cell {
        subboard: usize,
        cell: usize,
        value: i32,
    },
    #[error("bad active subboard {0}")]
    ActiveSubboard(i32),
    #[error("bad current player {0}")]
    Player(i32),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Move(#[from] MoveError),
}

fn encode_player(player: Player) -> i32 {
    match player {
        Player::A => WIRE_PLAYER_A,
        Player::B => WIRE_PLAYER_B,
    }
}

fn decode_player(value: i32) -> Option<Player> {
    match value {
        WIRE_PLAYER_A => Some(Player::A),
        WIRE_PLAYER_B => Some(Player::B),
        _ => None,
    }
}

fn encode_cell(cell: Cell) -> i32 {
    cell.map_or(WIRE_EMPTY, encode_player)
}

/// `None` for a value outside {0, 1, -1}.
fn decode_cell(value: i32) -> Option<Cell> {
    if value == WIRE_EMPTY {
        Some(None)
    } else {
        decode_player(value).map(Some)
    }
}

pub fn encode_status(status: GameStatus) -> i32 {
    status.winner().map_or(0, encode_player)
}

fn encode_active(active: Option<usize>) -> i32 {
    active.map_or(WIRE_ANY_SUBBOARD, |s| s as i32)
}

/// Wire move to engine move. Negative or oversized values are rejected here;
/// values in `9..=255` are left for the legality check to reject.
fn decode_move([subboard, cell]: [i32; 2]) -> Option<Move> {
    Some(Move::new(u8::try_from(subboard).ok()?, u8::try_from(cell).ok()?))
}

fn encode_move(mv: Move) -> [i32; 2] {
    [i32::from(mv.subboard), i32::from(mv.cell)]
}

impl TryFrom<&BoardSnapshot> for Position {
    type Error = SnapshotError;

    fn try_from(snapshot: &BoardSnapshot) -> Result<Self, Self::Error> {
        if snapshot.cells.len() != SUBBOARDS || snapshot.cells.iter().any(|s| s.len() != CELLS) {
            return Err(SnapshotError::Shape);
        }
        let mut cells = [[None; CELLS]; SUBBOARDS];
        for (s, row) in snapshot.cells.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                cells[s][c] = decode_cell(value).ok_or(SnapshotError::Cell {
                    subboard: s,
                    cell: c,
                    value,
                })?;
            }
        }
        let active = match snapshot.active_subboard {
            WIRE_ANY_SUBBOARD => None,
            s @ 0..=8 => Some(s as usize),
            other => return Err(SnapshotError::ActiveSubboard(other)),
        };
        let to_move = decode_player(snapshot.current_player)
            .ok_or(SnapshotError::Player(snapshot.current_player))?;
        Ok(Position::from_cells(&cells, active, to_move))
    }
}

impl From<&Position> for BoardSnapshot {
    fn from(pos: &Position) -> Self {
        let cells = (0..SUBBOARDS)
            .map(|s| (0..CELLS).map(|c| encode_cell(pos.cell(s, c))).collect())
            .collect();
        Self {
            cells,
            active_subboard: encode_active(pos.active_subboard()),
            current_player: encode_player(pos.to_move()),
        }
    }
}

/// Apply the human move and answer with the AI move.
///
/// The snapshot's current player is the side that produced it, so the turn
/// passes to the human before the move is checked.
///
/// # Errors
/// A malformed snapshot. Illegal human moves are not errors; they produce
/// [`ServerResponse::illegal_move`].
pub fn respond(
    searcher: &Searcher,
    request: &ClientMove,
) -> Result<ServerResponse, ProtocolError> {
    let mut pos = Position::try_from(&request.board_before_human_move)?;
    pos.switch_player();

    let Some(human_move) = decode_move(request.human_move) else {
        warn!(human_move = ?request.human_move, "rejected illegal move");
        return Ok(ServerResponse::illegal_move());
    };
    if let Err(e) = pos.play(human_move) {
        warn!(human_move = %human_move, error = %e, "rejected illegal move");
        return Ok(ServerResponse::illegal_move());
    }

    if let Some(winner) = pos.winner() {
        info!(winner = %winner, "human move ended the game");
        return Ok(ServerResponse::player_win(winner));
    }

    let result = searcher.search(&pos)?;
    pos.play(result.best_move)?;
    info!(
        human_move = %human_move,
        ai_move = %result.best_move,
        win_percentage = result.win_percentage,
        rollouts = result.rollouts,
        "answered move"
    );
    Ok(ServerResponse {
        ai_move: encode_move(result.best_move),
        active_subboard: encode_active(pos.active_subboard()),
        status: encode_status(pos.status()),
        ai_winning_probability: result.win_percentage,
    })
}

/// Line-oriented JSON server.
pub struct ProtocolServer {
    searcher: Searcher,
}

impl ProtocolServer {
    pub fn new(searcher: Searcher) -> Self {
        Self { searcher }
    }

    /// Answer requests from `input` until it ends, one response line per
    /// request line. Blank lines and lines starting with `#` are skipped.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let reply = self.execute(line);
            writeln!(output, "{reply}")?;
            output.flush()?;
        }
        Ok(())
    }

    /// Handle one request line and return the response line.
    fn execute(&mut self, line: &str) -> String {
        let reply = serde_json::from_str::<ClientMove>(line)
            .map_err(ProtocolError::from)
            .and_then(|request| respond(&self.searcher, &request))
            .and_then(|response| serde_json::to_string(&response).map_err(ProtocolError::from));
        match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "failed to answer request");
                error_line(&e)
            }
        }
    }
}

fn error_line(error: &dyn Display) -> String {
    serde_json::json!({ "error": error.to_string() }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use serde_json::json;

    fn searcher() -> Searcher {
        Searcher::new(SearchConfig::for_testing()).unwrap()
    }

    fn empty_snapshot(active: i32, player: i32) -> BoardSnapshot {
        BoardSnapshot {
            cells: vec![vec![0; CELLS]; SUBBOARDS],
            active_subboard: active,
            current_player: player,
        }
    }

    #[test]
    fn test_decode_empty_snapshot() {
        let pos = Position::try_from(&empty_snapshot(-1, 1)).unwrap();
        assert_eq!(pos, Position::new());
    }

    #[test]
    fn test_snapshot_of_position_decodes_back() {
        let mut pos = Position::new();
        pos.play(Move::new(2, 7)).unwrap();
        pos.play(Move::new(7, 3)).unwrap();
        let snapshot = BoardSnapshot::from(&pos);
        assert_eq!(snapshot.cells[2][7], 1);
        assert_eq!(snapshot.cells[7][3], -1);
        assert_eq!(snapshot.active_subboard, 3);
        assert_eq!(snapshot.current_player, 1);
        assert_eq!(Position::try_from(&snapshot).unwrap(), pos);
    }

    #[test]
    fn test_malformed_snapshots() {
        let mut bad = empty_snapshot(-1, 1);
        bad.cells[3][5] = 2;
        assert_eq!(
            Position::try_from(&bad),
            Err(SnapshotError::Cell { subboard: 3, cell: 5, value: 2 })
        );

        let mut bad = empty_snapshot(-1, 1);
        bad.cells.pop();
        assert_eq!(Position::try_from(&bad), Err(SnapshotError::Shape));

        let mut bad = empty_snapshot(-1, 1);
        bad.cells[0].push(0);
        assert_eq!(Position::try_from(&bad), Err(SnapshotError::Shape));

        assert_eq!(
            Position::try_from(&empty_snapshot(9, 1)),
            Err(SnapshotError::ActiveSubboard(9))
        );
        assert_eq!(
            Position::try_from(&empty_snapshot(-1, 0)),
            Err(SnapshotError::Player(0))
        );
    }

    #[test]
    fn test_illegal_move_response() {
        let searcher = searcher();
        for human_move in [[1, 1], [-1, 0], [0, 9], [300, 0]] {
            let request = ClientMove {
                board_before_human_move: empty_snapshot(0, -1),
                human_move,
            };
            let response = respond(&searcher, &request).unwrap();
            assert_eq!(response, ServerResponse::illegal_move(), "{human_move:?}");
            assert_eq!(response.status, 2);
            assert_eq!(response.ai_move, [-1, -1]);
        }
    }

    #[test]
    fn test_player_win_skips_search() {
        // Subboards 0 and 4 already won by the first player; winning
        // subboard 8 completes the meta diagonal.
        let mut snapshot = empty_snapshot(8, -1);
        snapshot.cells[0][..3].copy_from_slice(&[1, 1, 1]);
        snapshot.cells[4][..3].copy_from_slice(&[1, 1, 1]);
        snapshot.cells[8][0] = 1;
        snapshot.cells[8][1] = 1;
        snapshot.cells[1][0] = -1;
        snapshot.cells[2][0] = -1;
        let request = ClientMove {
            board_before_human_move: snapshot,
            human_move: [8, 2],
        };
        let response = respond(&searcher(), &request).unwrap();
        assert_eq!(response, ServerResponse::player_win(Player::A));
        assert_eq!(response.status, 1);
    }

    #[test]
    fn test_full_response() {
        let request = ClientMove {
            board_before_human_move: empty_snapshot(-1, -1),
            human_move: [4, 4],
        };
        let response = respond(&searcher(), &request).unwrap();
        assert_eq!(response.status, 0);
        assert_eq!(response.ai_move[0], 4);
        assert_ne!(response.ai_move[1], 4);
        assert_eq!(response.active_subboard, response.ai_move[1]);
        assert!(response.ai_winning_probability <= 100);
    }

    #[test]
    fn test_accepts_legacy_field_names() {
        let line = json!({
            "boardBeforeHumanMove": {
                "board": vec![vec![0; 9]; 9],
                "currentBigSquareLegalPosition": -1,
                "currentPlayerIdentity": -1,
            },
            "humanMove": [0, 0],
        })
        .to_string();
        let request: ClientMove = serde_json::from_str(&line).unwrap();
        assert_eq!(request.board_before_human_move, empty_snapshot(-1, -1));
        assert_eq!(request.human_move, [0, 0]);
    }

    #[test]
    fn test_response_field_names() {
        let value = serde_json::to_value(ServerResponse::illegal_move()).unwrap();
        assert_eq!(
            value,
            json!({"aiMove": [-1, -1], "activeSubboard": -1, "status": 2, "aiWinningProbability": 0})
        );
    }

    #[test]
    fn test_execute_reports_bad_requests() {
        let mut server = ProtocolServer::new(searcher());
        let reply: serde_json::Value = serde_json::from_str(&server.execute("not json")).unwrap();
        assert!(reply["error"].as_str().unwrap().starts_with("malformed request"));

        let mut snapshot = empty_snapshot(-1, -1);
        snapshot.cells[0][0] = 5;
        let request = ClientMove {
            board_before_human_move: snapshot,
            human_move: [4, 4],
        };
        let line = serde_json::to_string(&request).unwrap();
        let reply: serde_json::Value = serde_json::from_str(&server.execute(&line)).unwrap();
        assert!(reply["error"].as_str().unwrap().starts_with("malformed snapshot"));
    }

    #[test]
    fn test_run_answers_each_line() {
        let request = ClientMove {
            board_before_human_move: empty_snapshot(0, -1),
            human_move: [5, 5],
        };
        let input = format!(
            "# comment\n{}\n\n{}\n",
            serde_json::to_string(&request).unwrap(),
            "{}"
        );
        let mut output = Vec::new();
        let mut server = ProtocolServer::new(searcher());
        server.run(input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ServerResponse = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, ServerResponse::illegal_move());
        assert!(lines[1].contains("error"));
    }
}
