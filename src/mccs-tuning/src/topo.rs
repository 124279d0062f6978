use serde::{Deserialize, Serialize};

use crate::tuning::TaskAlgorithm;

/// Link type of a topology path, ordered from closest to farthest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Local,
    NvLink,
    Pci,
    Sys,
    Net,
}

/// Connectivity graph computed by topology search for one algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopoGraph {
    pub num_channels: u32,
    // GB/s per channel
    pub speed_intra: f32,
    pub speed_inter: f32,
    pub type_intra: LinkType,
    pub type_inter: LinkType,
    // every rank uses the same channel layout
    #[serde(default)]
    pub same_channels: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlgoGraphs {
    pub tree: TopoGraph,
    pub ring: TopoGraph,
    pub collnet: TopoGraph,
}

impl AlgoGraphs {
    #[inline]
    pub fn get(&self, algo: TaskAlgorithm) -> &TopoGraph {
        match algo {
            TaskAlgorithm::Tree => &self.tree,
            TaskAlgorithm::Ring => &self.ring,
            TaskAlgorithm::CollNet => &self.collnet,
        }
    }
}
