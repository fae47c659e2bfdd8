use std::collections::HashMap;

use super::model::{Edge, MasteryTier, Node, SUBJECT_ROOT_PREFIX};

/// Keeps only edges between nodes of the same subject.
///
/// Edges touching a subject root always survive, since roots are what tie a
/// subject's concepts together. Edges with a missing endpoint are dropped.
pub fn filter_cross_subject_edges(nodes: &[Node], edges: &[Edge]) -> Vec<Edge> {
    let by_id = nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<HashMap<_, _>>();

    let is_root = |id: &str, node: &Node| id.starts_with(SUBJECT_ROOT_PREFIX) || node.is_root();

    edges
        .iter()
        .filter(|edge| {
            let (Some(source), Some(target)) =
                (by_id.get(edge.source.as_str()), by_id.get(edge.target.as_str()))
            else {
                return false;
            };

            is_root(&edge.source, source)
                || is_root(&edge.target, target)
                || source.subject == target.subject
        })
        .cloned()
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierStats {
    pub total: usize,
    pub mastered: usize,
    pub learning: usize,
    pub struggling: usize,
    pub unexplored: usize,
    pub subjects: usize,
}

impl TierStats {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut stats = Self::default();
        for node in nodes {
            if node.is_root() {
                stats.subjects += 1;
                continue;
            }

            stats.total += 1;
            match node.mastery_tier {
                MasteryTier::Mastered => stats.mastered += 1,
                MasteryTier::Learning => stats.learning += 1,
                MasteryTier::Struggling => stats.struggling += 1,
                MasteryTier::Unexplored => stats.unexplored += 1,
                MasteryTier::SubjectRoot | MasteryTier::Other(_) => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, subject: &str) -> Node {
        Node::new(id, id, 0.5, MasteryTier::Learning, subject)
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge::new(id, source, target, 0.7)
    }

    #[test]
    fn keeps_same_subject_edges() {
        let nodes = [node("a", "Math"), node("b", "Math")];
        let edges = [edge("e1", "a", "b")];
        assert_eq!(filter_cross_subject_edges(&nodes, &edges).len(), 1);
    }

    #[test]
    fn drops_cross_subject_edges() {
        let nodes = [node("a", "Math"), node("b", "CS")];
        let edges = [edge("e1", "a", "b")];
        assert!(filter_cross_subject_edges(&nodes, &edges).is_empty());
    }

    #[test]
    fn keeps_subject_root_edges_across_subjects() {
        let nodes = [node("a", "Math"), node("subject_root__CS", "CS")];
        let edges = [edge("e1", "subject_root__CS", "a")];
        assert_eq!(filter_cross_subject_edges(&nodes, &edges).len(), 1);
    }

    #[test]
    fn drops_dangling_edges() {
        let nodes = [node("a", "Math")];
        let edges = [edge("e1", "a", "ghost")];
        assert!(filter_cross_subject_edges(&nodes, &edges).is_empty());
    }

    #[test]
    fn stats_count_tiers_and_skip_roots() {
        let mut root = node("subject_root__Math", "Math");
        root.mastery_tier = MasteryTier::SubjectRoot;
        let mut mastered = node("m", "Math");
        mastered.mastery_tier = MasteryTier::Mastered;
        let nodes = [root, mastered, node("l", "Math")];

        let stats = TierStats::from_nodes(&nodes);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.mastered, 1);
        assert_eq!(stats.learning, 1);
        assert_eq!(stats.subjects, 1);
    }
}
