use serde::{Deserialize, Serialize};

/// Global shape of the communicator the tables are built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommShape {
    pub rank: usize,
    pub num_ranks: usize,
    pub num_nodes: usize,
}

impl CommShape {
    pub fn new(rank: usize, num_ranks: usize, num_nodes: usize) -> Self {
        CommShape {
            rank,
            num_ranks,
            num_nodes,
        }
    }

    #[inline]
    pub fn ranks_per_node(&self) -> usize {
        self.num_ranks / self.num_nodes.max(1)
    }
}

/// Compute capability range (e.g. 70 for Volta) across all ranks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeCapRange {
    pub min: u32,
    pub max: u32,
}
