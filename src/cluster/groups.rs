//! Resolving every node's top-level group from a coarse tree file

use crate::cluster::GroupKey;
use crate::config::Config;
use crate::data::tables::{TreeEntry, Vertex};
use crate::graph::NodeId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Counters describing what the size filter and the name join removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub groups_total: usize,
    pub groups_too_small: usize,
    pub groups_too_large: usize,
    pub groups_kept: usize,
    pub names_unmatched: usize,
    pub duplicate_nodes: usize,
}

/// Surviving groups and the node → group mapping derived from them
#[derive(Debug, Clone, Default)]
pub struct GroupAssignment {
    keys: Vec<GroupKey>,
    members: Vec<Vec<NodeId>>,
    node_group: HashMap<NodeId, usize>,
    stats: GroupStats,
}

impl GroupAssignment {
    /// Index of the group `node` belongs to, if it survived filtering
    pub fn group_index(&self, node: NodeId) -> Option<usize> {
        self.node_group.get(&node).copied()
    }

    pub fn group_of(&self, node: NodeId) -> Option<&GroupKey> {
        self.group_index(node).map(|idx| &self.keys[idx])
    }

    pub fn members(&self, idx: usize) -> &[NodeId] {
        &self.members[idx]
    }

    /// Groups in key order with their members sorted by node id
    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &[NodeId])> + '_ {
        self.keys
            .iter()
            .zip(self.members.iter().map(Vec::as_slice))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.node_group.len()
    }

    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }
}

/// Assign each tree entry's node to its top-level group.
///
/// Groups are sized by their tree rows before the name join, so a group
/// is kept or dropped as a whole. Names missing from the vertex table are
/// dropped silently; a node listed more than once keeps its first group.
pub fn resolve_groups(tree: &[TreeEntry], vertices: &[Vertex], config: &Config) -> GroupAssignment {
    let mut counts: BTreeMap<GroupKey, usize> = BTreeMap::new();
    for entry in tree {
        *counts.entry(GroupKey::from_path(&entry.path)).or_insert(0) += 1;
    }

    let mut stats = GroupStats {
        groups_total: counts.len(),
        ..GroupStats::default()
    };

    log::debug!("excluding clusters smaller than {}...", config.min_size);
    if let Some(max) = config.max_size {
        log::debug!("excluding clusters larger than {}...", max);
    }

    let mut keep: HashMap<GroupKey, usize> = HashMap::new();
    let mut keys = Vec::new();
    for (key, count) in counts {
        if count < config.min_size {
            stats.groups_too_small += 1;
        } else if !config.keeps_group_of(count) {
            stats.groups_too_large += 1;
        } else {
            keep.insert(key.clone(), keys.len());
            keys.push(key);
        }
    }

    let mut name_to_id: HashMap<&str, NodeId> = HashMap::with_capacity(vertices.len());
    for vertex in vertices {
        name_to_id.entry(vertex.name.as_str()).or_insert(vertex.id);
    }

    let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); keys.len()];
    let mut node_group: HashMap<NodeId, usize> = HashMap::new();

    for entry in tree {
        let Some(&idx) = keep.get(&GroupKey::from_path(&entry.path)) else {
            continue;
        };
        let Some(&node) = name_to_id.get(entry.name.as_str()) else {
            stats.names_unmatched += 1;
            continue;
        };
        if node_group.contains_key(&node) {
            log::warn!("node {} ({}) listed more than once in tree; keeping first group", node, entry.name);
            stats.duplicate_nodes += 1;
            continue;
        }
        node_group.insert(node, idx);
        members[idx].push(node);
    }

    // Groups whose names all failed the join have nothing left to cluster
    let mut assignment = GroupAssignment {
        stats,
        ..GroupAssignment::default()
    };
    for (key, mut nodes) in keys.into_iter().zip(members) {
        if nodes.is_empty() {
            continue;
        }
        nodes.sort_unstable();
        let idx = assignment.keys.len();
        for &node in &nodes {
            assignment.node_group.insert(node, idx);
        }
        assignment.keys.push(key);
        assignment.members.push(nodes);
    }
    assignment.stats.groups_kept = assignment.keys.len();

    log::info!(
        "Kept {} of {} top-level clusters ({} nodes); {} too small, {} too large, {} names unmatched",
        assignment.stats.groups_kept,
        assignment.stats.groups_total,
        assignment.node_count(),
        assignment.stats.groups_too_small,
        assignment.stats.groups_too_large,
        assignment.stats.names_unmatched
    );

    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(path: &str, name: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            flow: 0.1,
            name: name.to_string(),
        }
    }

    fn vertex(id: NodeId, name: &str) -> Vertex {
        Vertex {
            id,
            name: name.to_string(),
        }
    }

    fn fixture() -> (Vec<TreeEntry>, Vec<Vertex>) {
        let tree = vec![
            entry("1:1", "a"),
            entry("1:2", "b"),
            entry("1:3:1", "c"),
            entry("2:1", "d"),
            entry("2:2", "e"),
            entry("3", "f"),
        ];
        let vertices = (1..=6)
            .zip(["a", "b", "c", "d", "e", "f"])
            .map(|(id, name)| vertex(id, name))
            .collect();
        (tree, vertices)
    }

    #[rstest]
    #[case(1, None, vec!["1", "2", "3"])]
    #[case(2, None, vec!["1", "2"])]
    #[case(3, None, vec!["1"])]
    #[case(1, Some(2), vec!["2", "3"])]
    #[case(2, Some(2), vec!["2"])]
    #[case(4, None, vec![])]
    fn test_size_filter(
        #[case] min_size: usize,
        #[case] max_size: Option<usize>,
        #[case] expected: Vec<&str>,
    ) {
        let (tree, vertices) = fixture();
        let config = Config::default().with_min_size(min_size).with_max_size(max_size);

        let assignment = resolve_groups(&tree, &vertices, &config);
        let keys: Vec<&str> = assignment.groups().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_members_and_lookup() {
        let (tree, vertices) = fixture();
        let config = Config::default().with_min_size(3);

        let assignment = resolve_groups(&tree, &vertices, &config);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.members(0), &[1, 2, 3]);
        assert_eq!(assignment.group_of(3).map(GroupKey::as_str), Some("1"));
        assert_eq!(assignment.group_of(4), None);
        assert_eq!(assignment.stats().groups_too_small, 2);
    }

    #[test]
    fn test_unmatched_names_are_dropped_after_sizing() {
        let (tree, mut vertices) = fixture();
        vertices.retain(|v| v.name != "c");
        let config = Config::default().with_min_size(3);

        let assignment = resolve_groups(&tree, &vertices, &config);
        // Group "1" is sized by its three tree rows, then loses "c" in the join
        assert_eq!(assignment.members(0), &[1, 2]);
        assert_eq!(assignment.stats().names_unmatched, 1);
    }

    #[test]
    fn test_group_without_matches_disappears() {
        let tree = vec![entry("5:1", "x"), entry("5:2", "y")];
        let assignment = resolve_groups(&tree, &[vertex(1, "z")], &Config::default().with_min_size(1));
        assert!(assignment.is_empty());
        assert_eq!(assignment.stats().groups_kept, 0);
    }

    #[test]
    fn test_node_never_in_two_groups() {
        let tree = vec![entry("1:1", "a"), entry("2:1", "a"), entry("2:2", "b")];
        let vertices = vec![vertex(1, "a"), vertex(2, "b")];
        let assignment = resolve_groups(&tree, &vertices, &Config::default().with_min_size(1));

        assert_eq!(assignment.group_of(1).map(GroupKey::as_str), Some("1"));
        assert_eq!(assignment.node_count(), 2);
        assert_eq!(assignment.stats().duplicate_nodes, 1);
    }
}
