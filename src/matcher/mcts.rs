//! Monte Carlo tree search over include/exclude decisions.
//!
//! Candidates are visited in canonical order and each one is a binary
//! decision: include it (when the constraint allows) or skip it. The tree of
//! decisions is grown lazily, one node per iteration, and stored in an arena
//! addressed by index. Unexplored suffixes are estimated with a uniformly
//! random rollout.
//!
//! Branches are chosen by an upper confidence bound whose mean and variance
//! are rescaled into `[0, 1]` by the parent's observed score range. That
//! range keeps moving while the search runs, so the bound is not stationary.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::alignment::Alignment;
use crate::alignment_set::AlignmentSet;
use crate::constraint::{Constraint, ConstraintFactory};
use crate::error::{AlignResult, MatchError};
use crate::listener::{MatchListener, Stage};
use crate::matcher::{keep_if_better, seed_constraint, Matcher};

const PROGRESS_INTERVAL: usize = 10_000;

const INCLUDE: usize = 0;
const EXCLUDE: usize = 1;

/// One decision point in the arena.
#[derive(Debug, Clone)]
struct Node {
    children: [Option<usize>; 2],
    sum: f64,
    sum_sq: f64,
    lower: f64,
    upper: f64,
    visits: u64,
    /// False once the include branch was found to be illegal here.
    can_include: bool,
    fully_expanded: bool,
}

impl Node {
    fn new(score: f64) -> Self {
        Self {
            children: [None, None],
            sum: score,
            sum_sq: score * score,
            lower: score,
            upper: score,
            visits: 1,
            can_include: true,
            fully_expanded: false,
        }
    }

    fn update(&mut self, score: f64) {
        self.sum += score;
        self.sum_sq += score * score;
        self.visits += 1;
        self.upper = self.upper.max(score);
        self.lower = self.lower.min(score);
    }
}

/// Search tree arena. Index 0 is the root.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
    ce: f64,
}

impl Tree {
    fn new(root_score: f64, ce: f64) -> Self {
        Self {
            nodes: vec![Node::new(root_score)],
            ce,
        }
    }

    fn child(&self, node: usize, side: usize) -> Option<usize> {
        self.nodes[node].children[side]
    }

    fn attach(&mut self, parent: usize, side: usize, score: f64) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::new(score));
        self.nodes[parent].children[side] = Some(id);
        id
    }

    fn is_fully_expanded(&self, node: Option<usize>) -> bool {
        node.is_some_and(|n| self.nodes[n].fully_expanded)
    }

    /// Re-derives the fully-expanded mark of `node`, which sits `depth_to_go`
    /// decisions above the leaves.
    fn refresh_expanded(&mut self, node: usize, depth_to_go: usize) {
        let n = &self.nodes[node];
        let include = n.children[INCLUDE];
        let exclude = n.children[EXCLUDE];
        let expanded = n.fully_expanded
            || depth_to_go == 0
            || (self.is_fully_expanded(include) && self.is_fully_expanded(exclude))
            || (!n.can_include && self.is_fully_expanded(exclude));
        self.nodes[node].fully_expanded = expanded;
    }

    /// Whether to take the include branch at `node`.
    fn prefer_include(&self, node: usize) -> bool {
        let n = &self.nodes[node];
        if !n.can_include {
            return false;
        }
        let (Some(inc), Some(exc)) = (n.children[INCLUDE], n.children[EXCLUDE]) else {
            return n.children[INCLUDE].is_none();
        };
        if self.nodes[inc].fully_expanded {
            return false;
        }
        if self.nodes[exc].fully_expanded {
            return true;
        }
        self.bound(node, inc) > self.bound(node, exc)
    }

    /// Variance-aware upper confidence bound of `child` seen from `parent`.
    #[allow(clippy::cast_precision_loss)]
    fn bound(&self, parent: usize, child: usize) -> f64 {
        let p = &self.nodes[parent];
        let c = &self.nodes[child];
        let range = if p.upper > p.lower { p.upper - p.lower } else { 1.0 };
        let lb = p.lower;
        let v = c.visits as f64;

        let mean = c.sum / range / v - lb / range;
        let var = if c.visits <= 1 {
            f64::INFINITY
        } else {
            let scaled_sum = c.sum / range - v * lb / range;
            ((c.sum_sq - 2.0 * lb * c.sum + v * lb * lb) / range / range - scaled_sum * scaled_sum / v)
                / (v - 1.0)
        };
        let log_n = (p.visits as f64).ln();
        mean + (self.ce * log_n / v * 0.25_f64.min(var + (2.0 * log_n / v).sqrt())).sqrt()
    }
}

/// Tree search matcher.
///
/// Reproducible when a seed is set; otherwise each call draws a fresh seed
/// from the operating system.
#[derive(Debug, Clone)]
pub struct MonteCarloTreeSearch {
    constraint: Arc<dyn ConstraintFactory>,
    threshold: f64,
    ce: f64,
    max_iterations: usize,
    seed: Option<u64>,
    max_duration: Option<Duration>,
}

impl MonteCarloTreeSearch {
    /// A search with `ce = 2.0`, 100 000 iterations and no threshold.
    #[must_use]
    pub fn new(constraint: impl ConstraintFactory + 'static) -> Self {
        Self::from_factory(Arc::new(constraint))
    }

    /// As [`MonteCarloTreeSearch::new`], over a shared constraint factory.
    #[must_use]
    pub fn from_factory(constraint: Arc<dyn ConstraintFactory>) -> Self {
        Self {
            constraint,
            threshold: f64::NEG_INFINITY,
            ce: 2.0,
            max_iterations: 100_000,
            seed: None,
            max_duration: None,
        }
    }

    /// Sets the minimum candidate score.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the exploration constant.
    #[must_use]
    pub const fn with_ce(mut self, ce: f64) -> Self {
        self.ce = ce;
        self
    }

    /// Sets the iteration budget.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Fixes the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Stops the search once this much wall-clock time has passed. Checked
    /// between iterations.
    #[must_use]
    pub const fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Completes `state` by flipping a fair coin for each remaining candidate
/// and adding it when legal. Returns the final score.
fn rollout(state: &mut dyn Constraint, candidates: &[Alignment], rng: &mut ChaCha8Rng) -> f64 {
    for alignment in candidates {
        if rng.gen_bool(0.5) && state.can_add(alignment) {
            state.add(alignment);
        }
    }
    state.score()
}

impl Matcher for MonteCarloTreeSearch {
    fn id(&self) -> &'static str {
        "monte-carlo"
    }

    fn align_with(
        &self,
        mut matches: AlignmentSet,
        initial: &AlignmentSet,
        listener: &dyn MatchListener,
    ) -> AlignResult<AlignmentSet> {
        let base = seed_constraint(self.constraint.as_ref(), initial, &matches, listener);
        let fixed: HashSet<&Alignment> = initial.iter().collect();
        let threshold = self.threshold;
        matches.retain(|a| a.score >= threshold && !fixed.contains(a));
        matches.sort_alignments();
        let candidates = matches.alignments();
        let depth_max = candidates.len();

        let mut rng = self.rng();
        let mut best: Option<Box<dyn Constraint>> = None;
        keep_if_better(&mut best, base.as_ref());

        let mut first = base.copy();
        let root_score = rollout(first.as_mut(), candidates, &mut rng);
        keep_if_better(&mut best, first.as_ref());
        let mut tree = Tree::new(root_score, self.ce);
        tree.refresh_expanded(0, depth_max);

        let started = Instant::now();
        let mut iterations = 0usize;
        while iterations < self.max_iterations && !tree.nodes[0].fully_expanded {
            if self.max_duration.is_some_and(|budget| started.elapsed() >= budget) {
                tracing::debug!(iterations, "tree search stopped by time budget");
                break;
            }
            iterations += 1;
            if iterations % PROGRESS_INTERVAL == 0 {
                let best_score = best.as_ref().map_or(0.0, |b| b.score());
                listener.update_status(
                    Stage::Matching,
                    &format!("Generated {iterations}th candidate (max score={best_score:.2})"),
                );
            }

            let mut state = base.copy();
            let mut path = vec![0usize];
            let mut node = 0usize;
            let mut depth = 0usize;
            let mut leaf: Option<usize> = None;

            while depth < depth_max {
                let alignment = &candidates[depth];
                let side = if !state.can_add(alignment) {
                    tree.nodes[node].can_include = false;
                    EXCLUDE
                } else if tree.prefer_include(node) {
                    INCLUDE
                } else {
                    EXCLUDE
                };
                if side == INCLUDE {
                    state.add(alignment);
                }
                depth += 1;
                if let Some(next) = tree.child(node, side) {
                    node = next;
                    path.push(node);
                } else {
                    let score = rollout(state.as_mut(), &candidates[depth..], &mut rng);
                    leaf = Some(tree.attach(node, side, score));
                    break;
                }
            }

            let score = state.score();
            for &visited in &path {
                tree.nodes[visited].update(score);
            }
            keep_if_better(&mut best, state.as_ref());

            if let Some(leaf) = leaf {
                tree.refresh_expanded(leaf, depth_max - depth);
            }
            for (d, &visited) in path.iter().enumerate().rev() {
                tree.refresh_expanded(visited, depth_max - d);
            }
        }

        tracing::info!(
            iterations,
            nodes = tree.nodes.len(),
            exhausted = tree.nodes[0].fully_expanded,
            "tree search finished"
        );

        let Some(best) = best else {
            return Err(MatchError::unsolvable(
                self.id(),
                "Monte Carlo search did not find any complete solutions",
            )
            .into());
        };
        Ok(AlignmentSet::from_vec(best.alignments()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Bijective, Capacity, ThresholdConstraint};
    use crate::listener::NoopListener;
    use crate::matcher::test_support::{al, set};

    fn five() -> AlignmentSet {
        set(&[
            ("id1", "id1", 0.5),
            ("id1", "id2", 0.9),
            ("id2", "id2", 0.7),
            ("id3", "id3", 0.1),
            ("id2", "id3", 0.0),
        ])
    }

    #[test]
    fn unconstrained_search_takes_everything() {
        let out = MonteCarloTreeSearch::new(ThresholdConstraint::default())
            .with_seed(7)
            .align(five())
            .unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn bijective_search_finds_optimum() {
        let out = MonteCarloTreeSearch::new(Bijective::default())
            .with_seed(11)
            .with_max_iterations(100)
            .align(five())
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.contains(&al("id1", "id1", 0.5)));
        assert!(out.contains(&al("id2", "id2", 0.7)));
        assert!(out.contains(&al("id3", "id3", 0.1)));
    }

    #[test]
    fn same_seed_same_result() {
        let matcher = MonteCarloTreeSearch::new(Bijective::default())
            .with_seed(42)
            .with_max_iterations(20);
        let first = matcher.align(five()).unwrap();
        let second = matcher.align(five()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn initial_links_are_removed_from_candidates_and_kept() {
        let initial = set(&[("id1", "id2", 0.9)]);
        let out = MonteCarloTreeSearch::new(Bijective::default())
            .with_seed(3)
            .align_with(five(), &initial, &NoopListener)
            .unwrap();
        assert_eq!(out.iter().filter(|a| **a == al("id1", "id2", 0.9)).count(), 1);
        assert!(!out.contains(&al("id1", "id1", 0.5)));
    }

    #[test]
    fn exhausts_small_trees_early() {
        // Two candidates give at most four leaves; the root is fully
        // expanded long before the budget runs out.
        let matches = set(&[("a", "x", 0.9), ("b", "y", 0.4)]);
        let out = MonteCarloTreeSearch::new(Bijective::default())
            .with_seed(1)
            .with_max_iterations(1_000_000)
            .align(matches)
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn zero_duration_budget_still_returns_seed_solution() {
        let out = MonteCarloTreeSearch::new(ThresholdConstraint::default())
            .with_seed(5)
            .with_max_duration(Duration::ZERO)
            .align(five())
            .unwrap();
        // Only the root rollout ran; whatever it accepted is a valid answer.
        assert!(out.len() <= 5);
    }

    #[test]
    fn unsolvable_reports_error() {
        let constraint = Capacity {
            min_alignments: 4,
            ..Capacity::default()
        };
        let err = MonteCarloTreeSearch::new(constraint)
            .with_seed(9)
            .with_max_iterations(50)
            .align(five())
            .unwrap_err();
        assert!(err.is_unsolvable());
    }

    #[test]
    fn bound_handles_flat_range() {
        let mut tree = Tree::new(1.0, 2.0);
        let inc = tree.attach(0, INCLUDE, 1.0);
        let exc = tree.attach(0, EXCLUDE, 1.0);
        tree.nodes[0].update(1.0);
        tree.nodes[0].update(1.0);
        assert!(tree.bound(0, inc).is_finite());
        assert!(tree.bound(0, exc).is_finite());
    }
}
