//! End-to-end run: split, resolve groups, filter edges, cluster, write

use crate::cluster::{cluster_groups, resolve_groups, ClusterStats, GroupStats, HierarchicalClusterer};
use crate::config::Config;
use crate::data::{pajek, tables};
use crate::error::Result;
use crate::graph::build_subgraphs;
use crate::storage;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// What a run did, also written to the output directory as JSON
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub min_size: usize,
    pub max_size: Option<usize>,
    pub seed: u64,
    pub vertices: usize,
    pub edges: usize,
    pub intra_group_edges: usize,
    pub isolated_nodes: usize,
    pub grouping: GroupStats,
    pub clustering: ClusterStats,
    pub shards: Vec<PathBuf>,
}

/// Run the whole pipeline with `clusterer` as the per-group routine.
///
/// Fails before touching anything if the output directory already exists.
pub fn run<C>(config: &Config, clusterer: &C) -> Result<RunSummary>
where
    C: HierarchicalClusterer + ?Sized,
{
    storage::ensure_output_absent(&config.output_dir)?;

    let start = Instant::now();
    let split = pajek::split_pajek(&config.network_file)?;
    log::debug!("split step done. took {:.2?}", start.elapsed());

    let vertices = tables::load_vertices(&split.vertices)?;
    let tree = tables::load_tree(&config.tree_file)?;
    let edges = tables::load_edges(&split.edges)?;

    let assignment = resolve_groups(&tree, &vertices, config);
    let subgraphs = build_subgraphs(&edges, &assignment);
    let edge_count = edges.len();
    drop(edges);

    let start = Instant::now();
    let groups = cluster_groups(&subgraphs, clusterer);
    log::debug!("clustering done. took {:.2?}", start.elapsed());

    let shards = storage::write_results(&groups, &config.output_dir, config.shards)?;

    let summary = RunSummary {
        min_size: config.min_size,
        max_size: config.max_size,
        seed: config.seed,
        vertices: vertices.len(),
        edges: edge_count,
        intra_group_edges: subgraphs.iter().map(|s| s.link_count()).sum(),
        isolated_nodes: subgraphs.iter().map(|s| s.isolated_nodes().len()).sum(),
        grouping: assignment.stats().clone(),
        clustering: ClusterStats::from_groups(&groups),
        shards,
    };
    storage::finalize_output(&config.output_dir, &summary)?;

    Ok(summary)
}
