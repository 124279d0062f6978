pub mod estimate;
pub mod list;
pub mod model;
pub mod report;
pub mod schema;
pub mod tables;
pub mod threads;

use std::collections::TryReserveError;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

pub use estimate::{estimate_time, CollInfo};
pub use model::build_thresholds;
pub use report::{log_tuning_summary, TuningReport};
pub use schema::{get_task_schema, select_algorithm, TaskSchema};

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("Failed to allocate list working copy: {0}")]
    Alloc(#[from] TryReserveError),
    #[error("No algorithm/protocol available for {func:?} of {bytes} bytes")]
    NoAlgorithm { func: TaskFuncType, bytes: usize },
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskFuncType {
    Broadcast = 0,
    Reduce = 1,
    AllGather = 2,
    ReduceScatter = 3,
    AllReduce = 4,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskAlgorithm {
    Tree = 0,
    Ring = 1,
    CollNet = 2,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskProtocol {
    #[strum(serialize = "LL")]
    Ll = 0,
    #[strum(serialize = "LL128")]
    Ll128 = 1,
    Simple = 2,
}

pub const NUM_FUNCTIONS: usize = TaskFuncType::COUNT;
pub const NUM_ALGORITHMS: usize = TaskAlgorithm::COUNT;
pub const NUM_PROTOCOLS: usize = TaskProtocol::COUNT;

pub const ALGORITHM_NAMES: [&str; NUM_ALGORITHMS] = ["Tree", "Ring", "CollNet"];
pub const PROTOCOL_NAMES: [&str; NUM_PROTOCOLS] = ["LL", "LL128", "Simple"];

pub const WARP_SIZE: u32 = 32;
pub const MAX_NTHREADS: u32 = 512;
pub const LL128_MAX_NTHREADS: u32 = 640;
// Ring/Simple thread count when the ring does not saturate PCI
pub const REDUCED_NTHREADS: u32 = 256;
// PCI Gen3 x16, GB/s
pub const PCI_WIDTH: f32 = 12.0;

// per-thread amount of work before we increase nThreads and nChannels
pub const LL_THREAD_THRESHOLD: u64 = 8;
pub const LL128_THREAD_THRESHOLD: u64 = 8;
pub const SIMPLE_THREAD_THRESHOLD: u64 = 64;

/// Algorithms implemented for each collective, indexed `[func][algo]`.
/// Tree and CollNet only have AllReduce kernels.
pub const COLL_ALGO_SUPPORT: [[bool; NUM_ALGORITHMS]; NUM_FUNCTIONS] = [
    // Tree, Ring, CollNet
    [false, true, false], // Broadcast
    [false, true, false], // Reduce
    [false, true, false], // AllGather
    [false, true, false], // ReduceScatter
    [true, true, true],   // AllReduce
];

impl TaskFuncType {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of ring steps a collective takes over `num_ranks` ranks.
    pub fn num_steps(self, num_ranks: usize) -> usize {
        match self {
            TaskFuncType::AllReduce => 2 * num_ranks.saturating_sub(1),
            TaskFuncType::ReduceScatter | TaskFuncType::AllGather => num_ranks.saturating_sub(1),
            TaskFuncType::Broadcast | TaskFuncType::Reduce => num_ranks,
        }
    }

    #[inline]
    pub fn supports(self, algo: TaskAlgorithm) -> bool {
        COLL_ALGO_SUPPORT[self.index()][algo.index()]
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl TaskAlgorithm {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl TaskProtocol {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

pub type FuncTable<T> = [[[T; NUM_PROTOCOLS]; NUM_ALGORITHMS]; NUM_FUNCTIONS];
pub type AlgoTable<T> = [[T; NUM_PROTOCOLS]; NUM_ALGORITHMS];

/// Per-communicator tuning tables.
///
/// Built once by [`build_thresholds`] before the communicator accepts
/// collectives and read without synchronization afterwards. A bandwidth of
/// zero marks a combination that must not be selected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerformanceTables {
    // GB/s
    pub bandwidths: FuncTable<f32>,
    // us
    pub latencies: FuncTable<f32>,
    pub max_threads: AlgoTable<u32>,
    // bytes
    pub thread_thresholds: AlgoTable<u64>,
}

impl PerformanceTables {
    #[inline]
    pub fn bandwidth(&self, func: TaskFuncType, algo: TaskAlgorithm, proto: TaskProtocol) -> f32 {
        self.bandwidths[func.index()][algo.index()][proto.index()]
    }

    #[inline]
    pub fn latency(&self, func: TaskFuncType, algo: TaskAlgorithm, proto: TaskProtocol) -> f32 {
        self.latencies[func.index()][algo.index()][proto.index()]
    }

    #[inline]
    pub fn max_threads(&self, algo: TaskAlgorithm, proto: TaskProtocol) -> u32 {
        self.max_threads[algo.index()][proto.index()]
    }

    #[inline]
    pub fn thread_threshold(&self, algo: TaskAlgorithm, proto: TaskProtocol) -> u64 {
        self.thread_thresholds[algo.index()][proto.index()]
    }
}

/// Integer log2, rounding down; zero maps to zero.
#[inline]
pub(crate) fn log2i(n: usize) -> u32 {
    n.checked_ilog2().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_match_list_vocabulary() {
        let algos: Vec<&str> = TaskAlgorithm::iter().map(TaskAlgorithm::name).collect();
        assert_eq!(algos, ALGORITHM_NAMES);
        let protos: Vec<&str> = TaskProtocol::iter().map(TaskProtocol::name).collect();
        assert_eq!(protos, PROTOCOL_NAMES);
    }

    #[test]
    fn ring_supports_every_collective() {
        for func in TaskFuncType::iter() {
            assert!(func.supports(TaskAlgorithm::Ring));
            let others = func.supports(TaskAlgorithm::Tree) || func.supports(TaskAlgorithm::CollNet);
            assert_eq!(others, func == TaskFuncType::AllReduce);
        }
    }

    #[test]
    fn step_counts() {
        assert_eq!(TaskFuncType::AllReduce.num_steps(8), 14);
        assert_eq!(TaskFuncType::AllGather.num_steps(8), 7);
        assert_eq!(TaskFuncType::ReduceScatter.num_steps(8), 7);
        assert_eq!(TaskFuncType::Broadcast.num_steps(8), 8);
        assert_eq!(TaskFuncType::Reduce.num_steps(8), 8);
    }

    #[test]
    fn parse_names_case_insensitive() {
        assert_eq!("allreduce".parse::<TaskFuncType>().ok(), Some(TaskFuncType::AllReduce));
        assert_eq!("ll128".parse::<TaskProtocol>().ok(), Some(TaskProtocol::Ll128));
        assert_eq!("collnet".parse::<TaskAlgorithm>().ok(), Some(TaskAlgorithm::CollNet));
    }

    #[test]
    fn log2i_rounds_down() {
        assert_eq!(log2i(0), 0);
        assert_eq!(log2i(1), 0);
        assert_eq!(log2i(2), 1);
        assert_eq!(log2i(3), 1);
        assert_eq!(log2i(16384), 14);
        assert_eq!(log2i(16383), 13);
    }
}
