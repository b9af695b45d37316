//! Restricting the global edge list to links inside each group

use crate::cluster::{GroupAssignment, GroupKey};
use crate::graph::{Edge, NodeId};
use rayon::prelude::*;
use std::collections::HashSet;

/// Induced subgraph of one top-level group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    pub group: GroupKey,

    /// Every surviving member, sorted and unique, including nodes with no links
    pub nodes: Vec<NodeId>,

    /// Links whose endpoints are both members
    pub links: Vec<Edge>,
}

impl Subgraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Members that touch no link of the subgraph
    pub fn isolated_nodes(&self) -> Vec<NodeId> {
        let linked: HashSet<NodeId> = self
            .links
            .iter()
            .flat_map(|edge| [edge.source, edge.target])
            .collect();
        self.nodes
            .iter()
            .copied()
            .filter(|node| !linked.contains(node))
            .collect()
    }
}

/// Group index of `edge` if both endpoints sit in the same surviving group
fn shared_group(edge: &Edge, assignment: &GroupAssignment) -> Option<usize> {
    let source = assignment.group_index(edge.source)?;
    let target = assignment.group_index(edge.target)?;
    (source == target).then_some(source)
}

/// Build one subgraph per surviving group.
///
/// Edges crossing groups or touching a dropped node are discarded. Every
/// group member is kept as a node even when none of its links survive.
pub fn build_subgraphs(edges: &[Edge], assignment: &GroupAssignment) -> Vec<Subgraph> {
    log::info!(
        "Filtering {} edges down to links within {} top-level clusters",
        edges.len(),
        assignment.len()
    );

    let tagged: Vec<(usize, Edge)> = edges
        .par_iter()
        .filter_map(|edge| shared_group(edge, assignment).map(|idx| (idx, *edge)))
        .collect();

    let mut links: Vec<Vec<Edge>> = vec![Vec::new(); assignment.len()];
    for (idx, edge) in tagged {
        links[idx].push(edge);
    }

    let subgraphs: Vec<Subgraph> = assignment
        .groups()
        .zip(links)
        .map(|((key, members), links)| Subgraph {
            group: key.clone(),
            nodes: members.to_vec(),
            links,
        })
        .collect();

    let kept: usize = subgraphs.iter().map(Subgraph::link_count).sum();
    log::info!("Kept {} of {} edges inside clusters", kept, edges.len());

    subgraphs
}
