//! Running the clustering routine on every group in parallel

use crate::cluster::{ClusterLabel, ClusterRow, FailureReason, GroupKey, HierPath, HierarchicalClusterer};
use crate::error::ClusterError;
use crate::graph::{NodeId, Subgraph};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

/// Labels produced for one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteredGroup {
    pub group: GroupKey,

    /// Exactly one row per member of the group's subgraph
    pub rows: Vec<ClusterRow>,

    /// Set when the routine rejected the group as a whole
    pub failure: Option<ClusterError>,
}

/// Totals over all clustered groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    pub groups: usize,
    pub failed_groups: usize,
    pub rows: usize,
    pub failed_rows: usize,
}

impl ClusterStats {
    pub fn from_groups(groups: &[ClusteredGroup]) -> Self {
        groups.iter().fold(Self::default(), |mut stats, group| {
            stats.groups += 1;
            stats.failed_groups += usize::from(group.failure.is_some());
            stats.rows += group.rows.len();
            stats.failed_rows += group.rows.iter().filter(|row| row.label.is_failed()).count();
            stats
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn failed_rows(subgraph: &Subgraph, reason: &FailureReason) -> Vec<ClusterRow> {
    subgraph
        .nodes
        .iter()
        .map(|&node_id| ClusterRow {
            group: subgraph.group.clone(),
            node_id,
            label: ClusterLabel::Failed(reason.clone()),
        })
        .collect()
}

/// Cluster a single group.
///
/// Never fails: a routine error or panic turns into one failure row per
/// member, and members the routine leaves out are marked individually.
pub fn cluster_subgraph<C>(subgraph: &Subgraph, clusterer: &C) -> ClusteredGroup
where
    C: HierarchicalClusterer + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        clusterer.cluster(&subgraph.nodes, &subgraph.links)
    }))
    .unwrap_or_else(|payload| Err(ClusterError::Panicked(panic_message(payload.as_ref()))));

    let leaves = match outcome {
        Ok(leaves) => leaves,
        Err(err) => {
            log::warn!(
                "clustering failed for cluster {} ({} nodes, {} links): {}",
                subgraph.group,
                subgraph.node_count(),
                subgraph.link_count(),
                err
            );
            return ClusteredGroup {
                group: subgraph.group.clone(),
                rows: failed_rows(subgraph, &FailureReason::Routine(err.clone())),
                failure: Some(err),
            };
        }
    };

    let members: HashSet<NodeId> = subgraph.nodes.iter().copied().collect();
    let mut paths: HashMap<NodeId, HierPath> = HashMap::with_capacity(leaves.len());
    for (node, path) in leaves {
        if !members.contains(&node) {
            log::warn!("cluster {}: dropping leaf for unknown node {}", subgraph.group, node);
            continue;
        }
        paths.entry(node).or_insert(path);
    }

    let rows: Vec<ClusterRow> = subgraph
        .nodes
        .iter()
        .map(|&node_id| ClusterRow {
            group: subgraph.group.clone(),
            node_id,
            label: paths
                .remove(&node_id)
                .map_or(ClusterLabel::Failed(FailureReason::MissingFromResult), ClusterLabel::Path),
        })
        .collect();

    let missing = rows.iter().filter(|row| row.label.is_failed()).count();
    if missing > 0 {
        log::warn!("cluster {}: {} nodes missing from clustering result", subgraph.group, missing);
    }

    ClusteredGroup {
        group: subgraph.group.clone(),
        rows,
        failure: None,
    }
}

/// Cluster every subgraph independently on the rayon pool
pub fn cluster_groups<C>(subgraphs: &[Subgraph], clusterer: &C) -> Vec<ClusteredGroup>
where
    C: HierarchicalClusterer + ?Sized,
{
    log::info!("running hierarchical clustering on {} top-level clusters", subgraphs.len());

    let groups: Vec<ClusteredGroup> = subgraphs
        .par_iter()
        .map(|subgraph| cluster_subgraph(subgraph, clusterer))
        .collect();

    let stats = ClusterStats::from_groups(&groups);
    log::info!(
        "Clustered {} groups ({} failed), {} rows",
        stats.groups,
        stats.failed_groups,
        stats.rows
    );

    groups
}
