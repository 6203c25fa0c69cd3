//! Constants for board geometry, search parameters, and the wire protocol.
//!
//! The global board is 9 subboards of 9 cells each. Subboards and cells are
//! both numbered row-major from 0 to 8:
//!
//! ```text
//! 0 1 2
//! 3 4 5
//! 6 7 8
//! ```

// =============================================================================
// Board Geometry
// =============================================================================

/// Number of subboards on the global board.
pub const SUBBOARDS: usize = 9;

/// Number of cells in one subboard.
pub const CELLS: usize = 9;

/// Occupancy mask with all 9 cells of a subboard set.
pub const FULL_MASK: u16 = 0x1FF;

/// The 8 winning lines of a 3x3 grid as occupancy masks.
/// Order: 3 rows, 3 columns, 2 diagonals.
pub const LINES: [u16; 8] = [
    0b000_000_111, // row 0
    0b000_111_000, // row 1
    0b111_000_000, // row 2
    0b001_001_001, // column 0
    0b010_010_010, // column 1
    0b100_100_100, // column 2
    0b100_010_001, // main diagonal
    0b001_010_100, // anti-diagonal
];

/// Upper bound on the length of a game (every cell filled once).
pub const MAX_GAME_LEN: usize = SUBBOARDS * CELLS;

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Exploration constant `C` of the UCB formula.
pub const EXPLORATION: f64 = 1.0;

/// Think time per decision used by the protocol server, in milliseconds.
pub const DEFAULT_THINK_MS: u64 = 1500;

/// Think time per move used by the self-play demo, in milliseconds.
pub const SELFPLAY_THINK_MS: u64 = 500;

// =============================================================================
// Wire Values
// =============================================================================

/// Wire value of an empty cell.
pub const WIRE_EMPTY: i32 = 0;

/// Wire value of the first player ("black").
pub const WIRE_PLAYER_A: i32 = 1;

/// Wire value of the second player ("white").
pub const WIRE_PLAYER_B: i32 = -1;

/// Wire value of "no active subboard" (free move).
pub const WIRE_ANY_SUBBOARD: i32 = -1;

/// Status value returned when the submitted move is illegal.
pub const WIRE_STATUS_ILLEGAL: i32 = 2;

/// Placeholder move returned when no AI move was made.
pub const WIRE_NO_MOVE: [i32; 2] = [-1, -1];
