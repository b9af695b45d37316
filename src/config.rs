//! Configuration management for the sub-clustering run

use std::path::PathBuf;

/// Default seed handed to the clustering routine so reruns are reproducible
pub const DEFAULT_SEED: u64 = 999;

/// Settings for one run of the pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Pajek file for the full network
    pub network_file: PathBuf,

    /// Tree file holding the coarse hierarchical clustering
    pub tree_file: PathBuf,

    /// Output directory (must not exist yet)
    pub output_dir: PathBuf,

    /// Groups smaller than this are skipped
    pub min_size: usize,

    /// Groups larger than this are skipped (unbounded when `None`)
    pub max_size: Option<usize>,

    /// Number of gzip shard files to write
    pub shards: usize,

    /// Seed for the clustering routine
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_file: PathBuf::new(),
            tree_file: PathBuf::new(),
            output_dir: PathBuf::new(),
            min_size: 10,
            max_size: None,
            shards: 1,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    /// Create a new configuration with default thresholds
    pub fn new(
        network_file: impl Into<PathBuf>,
        tree_file: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            network_file: network_file.into(),
            tree_file: tree_file.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_max_size(mut self, max_size: Option<usize>) -> Self {
        self.max_size = max_size;
        self
    }

    /// At least one shard is always written
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether a group of `size` members passes the size thresholds
    pub fn keeps_group_of(&self, size: usize) -> bool {
        size >= self.min_size && self.max_size.map_or(true, |max| size <= max)
    }
}
