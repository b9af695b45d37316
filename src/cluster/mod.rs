//! Hierarchical sub-clustering of top-level groups

pub mod driver;
pub mod groups;
pub mod label_prop;

use crate::error::ClusterError;
use crate::graph::{Edge, NodeId};
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

pub use driver::{cluster_groups, ClusterStats};
pub use groups::{resolve_groups, GroupAssignment, GroupStats};
pub use label_prop::LabelPropagationHierarchy;

/// Separator between the components of a hierarchical path
pub const PATH_SEPARATOR: char = ':';

/// Output value written for every node of a group whose clustering failed
pub const FAILED_SENTINEL: &str = "INFOMAP_FAILED";

/// Top-level cluster key (`cl_top`): the first component of a coarse path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(String);

impl GroupKey {
    /// Key of a hierarchical path: everything before the first separator,
    /// or the whole path if it has none.
    pub fn from_path(path: &str) -> Self {
        let top = path.split(PATH_SEPARATOR).next().unwrap_or(path);
        Self(top.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a leaf in a module hierarchy, root first, 1-based
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierPath(Vec<u32>);

impl HierPath {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for HierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(":"))
    }
}

impl FromStr for HierPath {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(PATH_SEPARATOR)
            .map(str::parse)
            .collect::<Result<Vec<u32>, _>>()
            .map(Self)
    }
}

/// Why a node ended up without a computed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The routine rejected the whole group
    Routine(ClusterError),
    /// The routine succeeded but returned no leaf for this node
    MissingFromResult,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routine(err) => write!(f, "{err}"),
            Self::MissingFromResult => f.write_str("node missing from clustering result"),
        }
    }
}

/// Refined label of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterLabel {
    Path(HierPath),
    Failed(FailureReason),
}

impl ClusterLabel {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Renders failures as [`FAILED_SENTINEL`], the value consumers look for
impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => fmt::Display::fmt(path, f),
            Self::Failed(_) => f.write_str(FAILED_SENTINEL),
        }
    }
}

/// One output row: lineage back to the top-level group plus the refined label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRow {
    pub group: GroupKey,
    pub node_id: NodeId,
    pub label: ClusterLabel,
}

/// A hierarchical community-detection routine.
///
/// Given the nodes of one network and its directed links, returns one
/// `(node, path)` pair per leaf. Implementations must be deterministic
/// for identical input and must not share mutable state between calls,
/// since groups are clustered concurrently.
pub trait HierarchicalClusterer: Send + Sync {
    fn cluster(
        &self,
        nodes: &[NodeId],
        links: &[Edge],
    ) -> Result<Vec<(NodeId, HierPath)>, ClusterError>;
}

impl<F> HierarchicalClusterer for F
where
    F: Fn(&[NodeId], &[Edge]) -> Result<Vec<(NodeId, HierPath)>, ClusterError> + Send + Sync,
{
    fn cluster(
        &self,
        nodes: &[NodeId],
        links: &[Edge],
    ) -> Result<Vec<(NodeId, HierPath)>, ClusterError> {
        self(nodes, links)
    }
}
