//! Monte Carlo Tree Search (MCTS) under a wall-clock budget.
//!
//! Each iteration runs four steps:
//! - Selection: descend from the root by maximum UCB score, alternating the
//!   perspective (searching player vs. opponent) at every ply
//! - Expansion: create one child per legal move of the selected frontier,
//!   each with its own copy of the board, then release the frontier's board
//! - Rollout: one uniform random playout per new child, run in parallel
//! - Backpropagation: add each rollout outcome to the child and every
//!   ancestor up to the root
//!
//! Nodes live in an arena ([`SearchTree`]) and refer to their parent by
//! [`NodeId`], so the parent link never owns anything. All statistics are
//! stored from the searching player's point of view.

use std::time::{Duration, Instant};

use rayon::ThreadPool;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, trace};

use crate::board::Player;
use crate::config::SearchConfig;
use crate::constants::EXPLORATION;
use crate::playout::rollout;
use crate::position::{Move, Position};

/// Errors that abort a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search was started on a position that is already decided.
    #[error("no legal move found: the position is already decided")]
    NoLegalMoves,

    #[error("failed to build rollout thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Index of a node in the [`SearchTree`] arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS search tree.
#[derive(Debug)]
pub struct TreeNode {
    /// Board snapshot, held only while the node is an unexpanded frontier
    board: Option<Position>,
    parent: Option<NodeId>,
    /// Move that led here (`None` for the root)
    mv: Option<Move>,
    /// Set exactly once, at expansion
    children: Option<Vec<NodeId>>,
    /// Rollouts won by the searching player
    wins: u32,
    visits: u32,
}

impl TreeNode {
    fn root(board: Position) -> Self {
        Self {
            board: Some(board),
            parent: None,
            mv: None,
            children: None,
            wins: 0,
            visits: 0,
        }
    }

    fn child(parent: NodeId, mv: Move, board: Position) -> Self {
        Self {
            board: Some(board),
            parent: Some(parent),
            mv: Some(mv),
            children: None,
            wins: 0,
            visits: 0,
        }
    }

    #[inline]
    pub fn wins(&self) -> u32 {
        self.wins
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits
    }

    pub fn mv(&self) -> Option<Move> {
        self.mv
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids, empty until the node is expanded.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    pub fn board(&self) -> Option<&Position> {
        self.board.as_ref()
    }

    /// Fraction of rollouts through this node won by the searching player.
    /// Only meaningful once the node has been visited.
    #[inline]
    pub fn winning_probability(&self) -> f64 {
        self.wins as f64 / self.visits as f64
    }

    /// Winning probability as a whole percentage, rounded down.
    pub fn win_percentage(&self) -> u32 {
        if self.visits == 0 {
            return 0;
        }
        (self.winning_probability() * 100.0).floor() as u32
    }

    /// UCB score of this node as seen from its parent.
    ///
    /// With `favor_root_player` the exploitation term is the searching
    /// player's winning probability, otherwise its complement (the opponent
    /// is choosing at this ply).
    #[inline]
    pub fn upper_confidence_bound(
        &self,
        parent_visits: u32,
        favor_root_player: bool,
        exploration: f64,
    ) -> f64 {
        let p = self.winning_probability();
        let exploit = if favor_root_player { p } else { 1.0 - p };
        let ln_parent = (parent_visits as f64).ln();
        exploit + exploration * (2.0 * ln_parent / self.visits as f64).sqrt()
    }

    /// Drops the board snapshot. Called once the node's children hold their
    /// own copies.
    pub fn release_board(&mut self) -> Option<Position> {
        self.board.take()
    }
}

/// Arena-allocated search tree for one decision.
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<TreeNode>,
    /// The player the search is choosing a move for
    player: Player,
    exploration: f64,
}

impl SearchTree {
    pub fn new(pos: &Position) -> Self {
        Self::with_exploration(pos, EXPLORATION)
    }

    pub fn with_exploration(pos: &Position, exploration: f64) -> Self {
        Self {
            nodes: vec![TreeNode::root(*pos)],
            player: pos.to_move(),
            exploration,
        }
    }

    #[inline]
    pub fn root(&self) -> &TreeNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn player(&self) -> Player {
        self.player
    }

    /// Descend from the root to a frontier node by maximum UCB.
    ///
    /// Ties go to the first child in expansion order.
    fn select(&self) -> NodeId {
        let mut id = NodeId::ROOT;
        let mut favor_root_player = true;
        loop {
            let node = self.node(id);
            let children = node.children();
            let Some((&first, rest)) = children.split_first() else {
                return id;
            };

            let score = |child: NodeId| {
                self.node(child)
                    .upper_confidence_bound(node.visits, favor_root_player, self.exploration)
            };
            let mut best = first;
            let mut best_score = score(first);
            for &child in rest {
                let s = score(child);
                if s > best_score {
                    best = child;
                    best_score = s;
                }
            }

            id = best;
            favor_root_player = !favor_root_player;
        }
    }

    fn allocate(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create one child per legal move of `id` and release its board.
    ///
    /// Returns each new child with a private copy of its board for rollout.
    fn expand(
        &mut self,
        id: NodeId,
        board: &Position,
    ) -> Result<Vec<(NodeId, Position)>, SearchError> {
        let moves = board.legal_moves();
        if moves.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let mut batch = Vec::with_capacity(moves.len());
        for mv in moves {
            let mut child_board = *board;
            child_board.play_unchecked(mv);
            let child = self.allocate(TreeNode::child(id, mv, child_board));
            batch.push((child, child_board));
        }

        let node = &mut self.nodes[id.index()];
        node.children = Some(batch.iter().map(|&(child, _)| child).collect());
        node.release_board();
        trace!(node = id.0, children = batch.len(), "expanded frontier");
        Ok(batch)
    }

    /// Add one rollout outcome to `id` and all of its ancestors.
    ///
    /// Takes `&mut self`, so concurrent updates are impossible and every
    /// `(wins, visits)` pair changes together.
    pub fn record_outcome(&mut self, id: NodeId, win: bool) {
        let win = u32::from(win);
        let mut current = Some(id);
        while let Some(id) = current {
            let node = &mut self.nodes[id.index()];
            node.wins += win;
            node.visits += 1;
            current = node.parent;
        }
    }

    /// Run one selection / expansion / rollout / backpropagation cycle.
    ///
    /// Rollouts run on the current rayon pool. Returns the number of
    /// rollouts performed, which is also the increase of the root's visits.
    ///
    /// # Errors
    /// [`SearchError::NoLegalMoves`] when the root position is decided.
    pub fn iterate(&mut self, rng: &mut fastrand::Rng) -> Result<usize, SearchError> {
        let leaf = self.select();
        // Frontier nodes always hold a board; a missing one means there is
        // nothing to expand.
        let Some(board) = self.node(leaf).board else {
            return Err(SearchError::NoLegalMoves);
        };

        if let Some(winner) = board.winner() {
            if leaf == NodeId::ROOT {
                return Err(SearchError::NoLegalMoves);
            }
            // Decided frontier: its rollout is known without playing.
            self.record_outcome(leaf, winner == self.player);
            return Ok(1);
        }

        let batch = self.expand(leaf, &board)?;
        let seeded: Vec<(NodeId, Position, u64)> =
            batch.into_iter().map(|(id, pos)| (id, pos, rng.u64(..))).collect();

        let player = self.player;
        let outcomes: Vec<(NodeId, bool)> = seeded
            .into_par_iter()
            .map(|(id, mut pos, seed)| {
                let mut rng = fastrand::Rng::with_seed(seed);
                (id, rollout(&mut pos, &mut rng) == player)
            })
            .collect();

        let rollouts = outcomes.len();
        for (id, win) in outcomes {
            self.record_outcome(id, win);
        }
        Ok(rollouts)
    }

    /// Root child with the highest winning probability (first one on ties).
    pub fn best_child(&self) -> Option<&TreeNode> {
        let mut best: Option<&TreeNode> = None;
        for &id in self.root().children() {
            let child = self.node(id);
            if child.visits == 0 {
                continue;
            }
            match best {
                Some(b) if child.winning_probability() <= b.winning_probability() => {}
                _ => best = Some(child),
            }
        }
        best
    }

    /// Log the statistics of the root's children.
    pub fn dump_children(&self) {
        for &id in self.root().children() {
            let child = self.node(id);
            if let Some(mv) = child.mv {
                trace!(
                    "move {} v={} w={} wr={:.3}",
                    mv,
                    child.visits,
                    child.wins,
                    child.winning_probability()
                );
            }
        }
    }
}

/// Outcome of one search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Move,
    /// Searching player's winning chance after `best_move`, 0..=100
    pub win_percentage: u32,
    pub iterations: usize,
    /// Total rollouts, including re-scored decided frontiers
    pub rollouts: usize,
    pub root_visits: u32,
    pub tree_size: usize,
    pub elapsed: Duration,
}

/// Runs searches with a fixed configuration.
pub struct Searcher {
    config: SearchConfig,
    /// Dedicated rollout pool; `None` uses rayon's global pool
    pool: Option<ThreadPool>,
}

impl Searcher {
    /// # Errors
    /// [`SearchError::ThreadPool`] if a dedicated pool cannot be built.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let pool = if config.threads > 0 {
            Some(rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?)
        } else {
            None
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search `pos` for the configured think time and pick a move for the
    /// player to move.
    ///
    /// At least one iteration runs regardless of the budget. The tree is
    /// dropped before returning.
    ///
    /// # Errors
    /// [`SearchError::NoLegalMoves`] if `pos` is already decided.
    pub fn search(&self, pos: &Position) -> Result<SearchResult, SearchError> {
        match &self.pool {
            Some(pool) => pool.install(|| self.run(pos)),
            None => self.run(pos),
        }
    }

    fn run(&self, pos: &Position) -> Result<SearchResult, SearchError> {
        let start = Instant::now();
        let mut rng = match self.config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut tree = SearchTree::with_exploration(pos, self.config.exploration);

        let mut iterations = 0;
        let mut rollouts = 0;
        loop {
            rollouts += tree.iterate(&mut rng)?;
            iterations += 1;
            if start.elapsed() >= self.config.think_time {
                break;
            }
        }

        tree.dump_children();
        let best = tree.best_child().ok_or(SearchError::NoLegalMoves)?;
        let best_move = best.mv().ok_or(SearchError::NoLegalMoves)?;
        let result = SearchResult {
            best_move,
            win_percentage: best.win_percentage(),
            iterations,
            rollouts,
            root_visits: tree.root().visits(),
            tree_size: tree.len(),
            elapsed: start.elapsed(),
        };
        debug!(
            player = %tree.player(),
            best = %result.best_move,
            win_percentage = result.win_percentage,
            iterations,
            rollouts,
            nodes = result.tree_size,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "search finished"
        );
        Ok(result)
    }
}

/// Search `pos` for `think_time` with default settings.
///
/// # Errors
/// [`SearchError::NoLegalMoves`] if `pos` is already decided.
pub fn tree_search(pos: &Position, think_time: Duration) -> Result<SearchResult, SearchError> {
    Searcher::new(SearchConfig::default().with_think_time(think_time))?.search(pos)
}
