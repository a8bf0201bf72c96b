//! Progress rollup computation
//!
//! Aggregates leaf percentages bottom-up to every non-leaf task and to the
//! whole project, for an arbitrary as-of date. Pure and side-effect free:
//! callers load the task tree and the latest known leaf percentages, this
//! module only computes. The same computation serves the live dashboard and
//! historical snapshots.
//!
//! A leaf with no recorded entry is "no data": it contributes 0 to every
//! mean and still counts in the denominator, but is reported as `None` so
//! callers can distinguish it from a recorded 0%.

use crate::fixed;
use crate::tree::{self, TreeNode};
use serde::Serialize;
use std::collections::HashMap;

/// How leaf percentages combine into a parent figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollupMode {
    /// Arithmetic mean over leaf descendants
    #[default]
    Unweighted,
    /// Weight-proportional mean; falls back to unweighted on zero total weight
    Weighted,
}

impl RollupMode {
    /// Parse mode from its settings value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unweighted" => Some(RollupMode::Unweighted),
            "weighted" => Some(RollupMode::Weighted),
            _ => None,
        }
    }

    /// Canonical settings value
    pub fn as_str(&self) -> &'static str {
        match self {
            RollupMode::Unweighted => "unweighted",
            RollupMode::Weighted => "weighted",
        }
    }
}

/// Latest known state of one leaf as of the target date
#[derive(Debug, Clone)]
pub struct LeafState {
    /// `None` = no entry on or before the target date
    pub percentage_h: Option<i64>,
    pub weight_h: i64,
}

/// Aggregate figure for one non-leaf task
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskRollup {
    pub percentage_h: i64,
    pub leaf_count: u32,
}

/// Full rollup for one project as of a date
#[derive(Debug, Clone, Serialize)]
pub struct RollupReport {
    /// Aggregates per non-leaf task guid
    pub parents: HashMap<String, TaskRollup>,
    /// Latest known percentage per leaf guid, `None` = no data
    pub leaves: HashMap<String, Option<i64>>,
    /// Whole-project figure over all leaves, independent of grouping
    pub project_percentage_h: i64,
    pub project_leaf_count: u32,
}

fn aggregate(states: &[&LeafState], mode: RollupMode) -> i64 {
    if states.is_empty() {
        return 0;
    }
    match mode {
        RollupMode::Unweighted => {
            let sum: i64 = states.iter().map(|s| s.percentage_h.unwrap_or(0)).sum();
            fixed::round_half_away(sum as f64 / states.len() as f64)
        }
        RollupMode::Weighted => {
            let total_weight: i64 = states.iter().map(|s| s.weight_h).sum();
            if total_weight == 0 {
                return aggregate(states, RollupMode::Unweighted);
            }
            let weighted_sum: i64 = states
                .iter()
                .map(|s| s.percentage_h.unwrap_or(0) * s.weight_h)
                .sum();
            fixed::round_half_away(weighted_sum as f64 / total_weight as f64)
        }
    }
}

fn state_of<'a>(states: &'a HashMap<String, LeafState>, guid: &str) -> &'a LeafState {
    static NO_DATA: LeafState = LeafState {
        percentage_h: None,
        weight_h: 0,
    };
    states.get(guid).unwrap_or(&NO_DATA)
}

/// Compute the rollup for a loaded task tree
///
/// `leaf_states` maps leaf guid to its latest known percentage and weight;
/// leaves absent from the map are treated as no-data. Non-leaf tasks with
/// zero leaf descendants (empty containers) report `0 / 0`.
pub fn compute_rollup<N: TreeNode>(
    nodes: &[N],
    leaf_states: &HashMap<String, LeafState>,
    mode: RollupMode,
) -> RollupReport {
    let leaf_guids: Vec<&str> = nodes
        .iter()
        .filter(|n| tree::is_leaf(*n, nodes))
        .map(|n| n.guid())
        .collect();

    let mut leaves = HashMap::new();
    for guid in &leaf_guids {
        leaves.insert(guid.to_string(), state_of(leaf_states, guid).percentage_h);
    }

    let mut parents = HashMap::new();
    for node in nodes {
        if tree::is_leaf(node, nodes) {
            continue;
        }
        let states: Vec<&LeafState> = tree::leaf_descendants(node, nodes)
            .iter()
            .map(|leaf| state_of(leaf_states, leaf.guid()))
            .collect();
        parents.insert(
            node.guid().to_string(),
            TaskRollup {
                percentage_h: aggregate(&states, mode),
                leaf_count: states.len() as u32,
            },
        );
    }

    let all_states: Vec<&LeafState> = leaf_guids
        .iter()
        .map(|guid| state_of(leaf_states, guid))
        .collect();

    RollupReport {
        parents,
        leaves,
        project_percentage_h: aggregate(&all_states, mode),
        project_leaf_count: all_states.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeNode;

    struct Node {
        guid: String,
        parent: Option<String>,
        left: i64,
        right: i64,
    }

    impl TreeNode for Node {
        fn guid(&self) -> &str {
            &self.guid
        }
        fn parent_guid(&self) -> Option<&str> {
            self.parent.as_deref()
        }
        fn left_bound(&self) -> i64 {
            self.left
        }
        fn right_bound(&self) -> i64 {
            self.right
        }
    }

    fn node(guid: &str, parent: Option<&str>, left: i64, right: i64) -> Node {
        Node {
            guid: guid.to_string(),
            parent: parent.map(str::to_string),
            left,
            right,
        }
    }

    fn state(percentage_h: Option<i64>, weight_h: i64) -> LeafState {
        LeafState {
            percentage_h,
            weight_h,
        }
    }

    #[test]
    fn test_parent_is_unweighted_mean() {
        // p { l1, l2 } with 40% and 80% → 60.00, leaf_count 2
        let nodes = vec![
            node("p", None, 1, 6),
            node("l1", Some("p"), 2, 3),
            node("l2", Some("p"), 4, 5),
        ];
        let mut states = HashMap::new();
        states.insert("l1".to_string(), state(Some(4_000), 5_000));
        states.insert("l2".to_string(), state(Some(8_000), 5_000));

        let report = compute_rollup(&nodes, &states, RollupMode::Unweighted);
        let p = &report.parents["p"];
        assert_eq!(p.percentage_h, 6_000);
        assert_eq!(p.leaf_count, 2);
        assert_eq!(report.project_percentage_h, 6_000);
        assert_eq!(report.project_leaf_count, 2);
    }

    #[test]
    fn test_no_data_counts_as_zero_but_reported_as_none() {
        let nodes = vec![
            node("p", None, 1, 6),
            node("l1", Some("p"), 2, 3),
            node("l2", Some("p"), 4, 5),
        ];
        let mut states = HashMap::new();
        states.insert("l1".to_string(), state(Some(9_000), 0));
        // l2 has no entry at all

        let report = compute_rollup(&nodes, &states, RollupMode::Unweighted);
        // (90 + 0) / 2 = 45.00
        assert_eq!(report.parents["p"].percentage_h, 4_500);
        assert_eq!(report.parents["p"].leaf_count, 2);
        assert_eq!(report.leaves["l1"], Some(9_000));
        assert_eq!(report.leaves["l2"], None);
    }

    #[test]
    fn test_empty_tree() {
        let report = compute_rollup::<Node>(&[], &HashMap::new(), RollupMode::Unweighted);
        assert!(report.parents.is_empty());
        assert!(report.leaves.is_empty());
        assert_eq!(report.project_leaf_count, 0);
        assert_eq!(report.project_percentage_h, 0);
    }

    #[test]
    fn test_container_with_no_leaf_descendants() {
        // "c" is referenced as a parent but its interval contains nothing;
        // this only happens with corrupted bounds, which must degrade to a
        // 0 / 0 report instead of failing
        let nodes = vec![
            node("c", None, 2, 3),
            node("d", Some("c"), 4, 5),
        ];
        let report = compute_rollup(&nodes, &HashMap::new(), RollupMode::Unweighted);
        assert_eq!(
            report.parents["c"],
            TaskRollup {
                percentage_h: 0,
                leaf_count: 0
            }
        );
    }

    #[test]
    fn test_childless_container_is_a_leaf() {
        // leaf status is decided by parent references, so a grouping node
        // nobody references behaves as a no-data leaf
        let nodes = vec![
            node("root", None, 1, 8),
            node("c", Some("root"), 2, 3),
            node("l", Some("root"), 4, 5),
            node("x", Some("root"), 6, 7),
        ];
        let mut states = HashMap::new();
        states.insert("l".to_string(), state(Some(2_000), 0));
        states.insert("x".to_string(), state(Some(4_000), 0));

        let report = compute_rollup(&nodes, &states, RollupMode::Unweighted);
        assert_eq!(report.leaves["c"], None);
        assert_eq!(report.parents["root"].leaf_count, 3);
        // (20 + 40 + 0) / 3 = 20.00
        assert_eq!(report.parents["root"].percentage_h, 2_000);
    }

    #[test]
    fn test_weighted_mode() {
        let nodes = vec![
            node("p", None, 1, 6),
            node("l1", Some("p"), 2, 3),
            node("l2", Some("p"), 4, 5),
        ];
        let mut states = HashMap::new();
        // 40% at weight 75, 80% at weight 25 → 50.00 weighted
        states.insert("l1".to_string(), state(Some(4_000), 7_500));
        states.insert("l2".to_string(), state(Some(8_000), 2_500));

        let report = compute_rollup(&nodes, &states, RollupMode::Weighted);
        assert_eq!(report.parents["p"].percentage_h, 5_000);

        // zero total weight falls back to the unweighted mean
        let mut zero = HashMap::new();
        zero.insert("l1".to_string(), state(Some(4_000), 0));
        zero.insert("l2".to_string(), state(Some(8_000), 0));
        let report = compute_rollup(&nodes, &zero, RollupMode::Weighted);
        assert_eq!(report.parents["p"].percentage_h, 6_000);
    }

    #[test]
    fn test_project_figure_ignores_grouping() {
        // root { a { l1 }, l2 } — project mean is over l1 and l2 directly
        let nodes = vec![
            node("root", None, 1, 8),
            node("a", Some("root"), 2, 5),
            node("l1", Some("a"), 3, 4),
            node("l2", Some("root"), 6, 7),
        ];
        let mut states = HashMap::new();
        states.insert("l1".to_string(), state(Some(10_000), 0));
        states.insert("l2".to_string(), state(Some(0), 0));

        let report = compute_rollup(&nodes, &states, RollupMode::Unweighted);
        assert_eq!(report.parents["a"].percentage_h, 10_000);
        assert_eq!(report.parents["root"].percentage_h, 5_000);
        assert_eq!(report.project_percentage_h, 5_000);
    }

    #[test]
    fn test_mode_settings_round_trip() {
        assert_eq!(RollupMode::from_str("weighted"), Some(RollupMode::Weighted));
        assert_eq!(
            RollupMode::from_str("UNWEIGHTED"),
            Some(RollupMode::Unweighted)
        );
        assert_eq!(RollupMode::from_str("nope"), None);
        for mode in [RollupMode::Unweighted, RollupMode::Weighted] {
            assert_eq!(RollupMode::from_str(mode.as_str()), Some(mode));
        }
    }
}
