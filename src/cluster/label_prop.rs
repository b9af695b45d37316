//! Default hierarchical clustering routine.
//!
//! Two levels: weakly connected components on top, label propagation
//! modules inside each component. Components and modules are ranked by
//! size (largest first), leaves by node id, all 1-based, so paths look
//! like `component:module:leaf`, or `component:leaf` when a component
//! holds a single module.

use crate::cluster::{HierPath, HierarchicalClusterer};
use crate::config::DEFAULT_SEED;
use crate::error::ClusterError;
use crate::graph::{Edge, NodeId};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

/// Seeded component + label propagation hierarchy
#[derive(Debug, Clone)]
pub struct LabelPropagationHierarchy {
    seed: u64,
    max_iter: usize,
}

impl LabelPropagationHierarchy {
    pub fn new(seed: u64) -> Self {
        Self { seed, max_iter: 100 }
    }

    /// Label of every node after propagation. Labels never cross components.
    fn propagate(&self, graph: &UnGraph<NodeId, ()>, rng: &mut StdRng) -> Vec<usize> {
        let n = graph.node_count();
        let mut labels: Vec<usize> = (0..n).collect();
        let mut order: Vec<usize> = (0..n).collect();

        for _ in 0..self.max_iter {
            let mut changed = false;
            order.shuffle(rng);

            for &node in &order {
                let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
                for neighbor in graph.neighbors(NodeIndex::new(node)) {
                    if neighbor.index() != node {
                        *counts.entry(labels[neighbor.index()]).or_insert(0) += 1;
                    }
                }

                let Some(&best) = counts.values().max() else {
                    continue;
                };
                let candidates: Vec<usize> = counts
                    .into_iter()
                    .filter(|&(_, count)| count == best)
                    .map(|(label, _)| label)
                    .collect();

                // Staying put on a tie lets propagation settle
                if candidates.contains(&labels[node]) {
                    continue;
                }
                labels[node] = candidates[rng.gen_range(0..candidates.len())];
                changed = true;
            }

            if !changed {
                break;
            }
        }

        labels
    }
}

impl Default for LabelPropagationHierarchy {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Group members, biggest first, ties broken by smallest node id
fn ranked<K: Ord>(members: BTreeMap<K, Vec<NodeId>>) -> Vec<Vec<NodeId>> {
    let mut groups: Vec<Vec<NodeId>> = members
        .into_values()
        .map(|mut nodes| {
            nodes.sort_unstable();
            nodes
        })
        .collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));
    groups
}

fn rank(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

impl HierarchicalClusterer for LabelPropagationHierarchy {
    fn cluster(
        &self,
        nodes: &[NodeId],
        links: &[Edge],
    ) -> Result<Vec<(NodeId, HierPath)>, ClusterError> {
        if nodes.is_empty() {
            return Err(ClusterError::EmptyNetwork);
        }
        if links.is_empty() {
            return Err(ClusterError::NoLinks);
        }

        let mut graph = UnGraph::<NodeId, ()>::with_capacity(nodes.len(), links.len());
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(nodes.len());
        for &node in nodes {
            index.entry(node).or_insert_with(|| graph.add_node(node));
        }

        let mut components = UnionFind::<usize>::new(graph.node_count());
        for link in links {
            let source = *index
                .get(&link.source)
                .ok_or(ClusterError::UnknownNode(link.source))?;
            let target = *index
                .get(&link.target)
                .ok_or(ClusterError::UnknownNode(link.target))?;
            graph.add_edge(source, target, ());
            components.union(source.index(), target.index());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let labels = self.propagate(&graph, &mut rng);

        let mut by_component: BTreeMap<usize, BTreeMap<usize, Vec<NodeId>>> = BTreeMap::new();
        for (idx, component) in components.into_labeling().into_iter().enumerate() {
            by_component
                .entry(component)
                .or_default()
                .entry(labels[idx])
                .or_default()
                .push(graph[NodeIndex::new(idx)]);
        }

        let mut components: Vec<Vec<Vec<NodeId>>> = by_component
            .into_values()
            .map(ranked)
            .collect();
        components.sort_by(|a, b| {
            let size = |modules: &Vec<Vec<NodeId>>| modules.iter().map(Vec::len).sum::<usize>();
            let first = |modules: &Vec<Vec<NodeId>>| modules.iter().filter_map(|m| m.first()).min().copied();
            size(b).cmp(&size(a)).then_with(|| first(a).cmp(&first(b)))
        });

        let mut result = Vec::with_capacity(graph.node_count());
        for (c, modules) in components.iter().enumerate() {
            if let [module] = modules.as_slice() {
                for (leaf, &node) in module.iter().enumerate() {
                    result.push((node, HierPath::new(vec![rank(c), rank(leaf)])));
                }
                continue;
            }
            for (m, module) in modules.iter().enumerate() {
                for (leaf, &node) in module.iter().enumerate() {
                    result.push((node, HierPath::new(vec![rank(c), rank(m), rank(leaf)])));
                }
            }
        }

        Ok(result)
    }
}
