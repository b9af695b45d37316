//! Hierarchical sub-clustering of the top-level groups of a network
//!
//! Every top-level group of a coarse clustering is cut out of the network as
//! an induced subgraph and clustered again on its own, in parallel. Groups the
//! clustering routine cannot handle are kept in the output, marked as failed.

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod storage;

pub use error::{ClusterError, Error, Result};
pub use pipeline::{run, RunSummary};
