use std::collections::{HashMap, HashSet};

use crate::snapshot::{Edge, Node};

/// Classification of what changed between two consecutive snapshots.
///
/// `updated_node_ids` only tracks tier transitions; a score change inside the
/// same tier is not an update. Removals are reported for logging only and
/// have no exit animation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphDiff {
    pub new_node_ids: HashSet<String>,
    pub updated_node_ids: HashSet<String>,
    pub new_edge_ids: HashSet<String>,
    pub removed_node_ids: HashSet<String>,
    pub removed_edge_ids: HashSet<String>,
}

impl GraphDiff {
    pub fn is_empty(&self) -> bool {
        self.new_node_ids.is_empty()
            && self.updated_node_ids.is_empty()
            && self.new_edge_ids.is_empty()
            && self.removed_node_ids.is_empty()
            && self.removed_edge_ids.is_empty()
    }
}

pub fn diff(
    prev_nodes: &[Node],
    next_nodes: &[Node],
    prev_edges: &[Edge],
    next_edges: &[Edge],
) -> GraphDiff {
    let prev_by_id = prev_nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<HashMap<_, _>>();
    let prev_edge_ids = prev_edges
        .iter()
        .map(|edge| edge.id.as_str())
        .collect::<HashSet<_>>();

    let mut result = GraphDiff::default();

    for node in next_nodes {
        match prev_by_id.get(node.id.as_str()) {
            None => {
                result.new_node_ids.insert(node.id.clone());
            }
            Some(prev) if prev.mastery_tier != node.mastery_tier => {
                result.updated_node_ids.insert(node.id.clone());
            }
            Some(_) => {}
        }
    }

    for edge in next_edges {
        if !prev_edge_ids.contains(edge.id.as_str()) {
            result.new_edge_ids.insert(edge.id.clone());
        }
    }

    let next_node_ids = next_nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect::<HashSet<_>>();
    let next_edge_ids = next_edges
        .iter()
        .map(|edge| edge.id.as_str())
        .collect::<HashSet<_>>();

    result.removed_node_ids = prev_by_id
        .keys()
        .filter(|id| !next_node_ids.contains(*id))
        .map(|id| (*id).to_owned())
        .collect();
    result.removed_edge_ids = prev_edge_ids
        .iter()
        .filter(|id| !next_edge_ids.contains(*id))
        .map(|id| (*id).to_owned())
        .collect();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MasteryTier;

    fn node(id: &str, tier: MasteryTier) -> Node {
        Node::new(id, id, 0.5, tier, "Math")
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge::new(id, source, target, 0.7)
    }

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn identical_snapshots_produce_empty_diff() {
        let nodes = [node("n1", MasteryTier::Learning)];
        let edges = [edge("e1", "n1", "n1")];
        let result = diff(&nodes, &nodes, &edges, &edges);
        assert!(result.new_node_ids.is_empty());
        assert!(result.updated_node_ids.is_empty());
        assert!(result.new_edge_ids.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn appearing_node_is_new_only() {
        let result = diff(&[], &[node("n1", MasteryTier::Learning)], &[], &[]);
        assert_eq!(result.new_node_ids, ids(&["n1"]));
        assert!(result.updated_node_ids.is_empty());
    }

    #[test]
    fn tier_change_is_update_not_new() {
        let prev = [node("n1", MasteryTier::Learning)];
        let next = [node("n1", MasteryTier::Mastered)];
        let result = diff(&prev, &next, &[], &[]);
        assert_eq!(result.updated_node_ids, ids(&["n1"]));
        assert!(result.new_node_ids.is_empty());
    }

    #[test]
    fn score_change_within_tier_is_not_update() {
        let prev = [node("n1", MasteryTier::Learning)];
        let mut changed = node("n1", MasteryTier::Learning);
        changed.mastery_score = 0.7;
        let result = diff(&prev, &[changed], &[], &[]);
        assert!(result.updated_node_ids.is_empty());
    }

    #[test]
    fn new_edge_detected_and_existing_edge_ignored() {
        let existing = edge("e1", "a", "b");
        let fresh = edge("e2", "b", "c");
        let result = diff(&[], &[], &[existing.clone()], &[existing, fresh]);
        assert_eq!(result.new_edge_ids, ids(&["e2"]));
    }

    #[test]
    fn removals_are_reported_separately() {
        let prev = [node("n1", MasteryTier::Learning), node("n2", MasteryTier::Learning)];
        let next = [node("n1", MasteryTier::Learning)];
        let prev_edges = [edge("e1", "n1", "n2")];
        let result = diff(&prev, &next, &prev_edges, &[]);
        assert_eq!(result.removed_node_ids, ids(&["n2"]));
        assert_eq!(result.removed_edge_ids, ids(&["e1"]));
        assert!(result.new_node_ids.is_empty());
    }

    #[test]
    fn outputs_only_contain_next_ids() {
        let prev = [node("a", MasteryTier::Learning), node("b", MasteryTier::Mastered)];
        let next = [node("b", MasteryTier::Learning), node("c", MasteryTier::Unexplored)];
        let next_edges = [edge("e9", "b", "c")];
        let result = diff(&prev, &next, &[edge("e1", "a", "b")], &next_edges);

        let next_ids = ids(&["b", "c"]);
        assert!(result.new_node_ids.is_subset(&next_ids));
        assert!(result.updated_node_ids.is_subset(&next_ids));
        assert!(result.new_edge_ids.is_subset(&ids(&["e9"])));
    }

    #[test]
    fn learning_session_scenario() {
        let snapshot_a_nodes = [
            node("n1", MasteryTier::Learning),
            node("n2", MasteryTier::Unexplored),
        ];
        let snapshot_b_nodes = [
            node("n1", MasteryTier::Mastered),
            node("n2", MasteryTier::Unexplored),
            node("n3", MasteryTier::Learning),
        ];
        let snapshot_b_edges = [edge("n1-n3", "n1", "n3")];

        let result = diff(&snapshot_a_nodes, &snapshot_b_nodes, &[], &snapshot_b_edges);
        assert_eq!(result.new_node_ids, ids(&["n3"]));
        assert_eq!(result.updated_node_ids, ids(&["n1"]));
        assert_eq!(result.new_edge_ids, ids(&["n1-n3"]));
    }
}
